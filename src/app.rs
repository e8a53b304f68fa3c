use crate::path::FolderPath;
use crate::service::device::Listing;
use std::time::{Duration, Instant};

const WARNING_TTL: Duration = Duration::from_secs(4);

/// One row of the rendered folder view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    /// Folders start with the delete affordance disabled until an emptiness
    /// probe confirms the folder has no children. Files are always deletable.
    pub delete_enabled: bool,
}

/// Modal state layered over the folder view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialog {
    ConfirmDeleteFile { name: String },
    ConfirmDeleteFolder { name: String },
    ConfirmReboot,
    FolderNamePrompt { input: String },
    UploadPathPrompt { input: String },
    RebootNotice,
}

#[derive(Clone, Debug)]
pub struct Warning {
    pub message: String,
    pub timer: Instant,
}

/// View state for the file manager: the session folder, the entries on
/// screen, and whatever modal interaction is in flight.
#[derive(Clone)]
pub struct App {
    pub folder: FolderPath,
    pub entries: Vec<Entry>,
    pub selected_index: Option<usize>,
    pub total_space: u64,
    pub used_space: u64,
    pub dialog: Option<Dialog>,
    pub warning: Option<Warning>,
    /// Bumped on every refresh; completions stamped with an older value
    /// are stale and must be discarded.
    pub generation: u64,
    pub should_quit: bool,
}

impl App {
    pub fn new() -> Self {
        Self {
            folder: FolderPath::root(),
            entries: Vec::new(),
            selected_index: None,
            total_space: 0,
            used_space: 0,
            dialog: None,
            warning: None,
            generation: 0,
            should_quit: false,
        }
    }

    /// Starts a new render generation and returns its token.
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Replaces the view with a fresh listing. Folders sort alphabetically
    /// as one block ahead of the files, which sort alphabetically as their
    /// own block; the two are never interleaved.
    pub fn apply_listing(&mut self, generation: u64, listing: &Listing) -> bool {
        if generation != self.generation {
            tracing::debug!(
                "discarding stale listing (generation {generation} != {})",
                self.generation
            );
            return false;
        }

        let mut folders: Vec<Entry> = Vec::new();
        let mut files: Vec<Entry> = Vec::new();
        for file in &listing.files {
            let entry = Entry {
                name: file.name.clone(),
                is_dir: file.is_dir,
                size: file.size,
                delete_enabled: !file.is_dir,
            };
            if file.is_dir {
                folders.push(entry);
            } else {
                files.push(entry);
            }
        }
        folders.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        files.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

        self.entries = folders;
        self.entries.extend(files);
        self.total_space = listing.total_space;
        self.used_space = listing.used_space;

        if self.entries.is_empty() {
            self.selected_index = None;
        } else {
            match self.selected_index {
                Some(i) if i < self.entries.len() => {}
                _ => self.selected_index = Some(0),
            }
        }
        true
    }

    /// Result of a folder emptiness probe for the current render.
    pub fn apply_probe(&mut self, generation: u64, name: &str, is_empty: bool) {
        if generation != self.generation {
            tracing::debug!("discarding stale probe for {name}");
            return;
        }
        self.set_delete_enabled(name, is_empty);
    }

    pub fn set_delete_enabled(&mut self, name: &str, enabled: bool) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| entry.is_dir && entry.name == name)
        {
            entry.delete_enabled = enabled;
        }
    }

    pub fn selected_entry(&self) -> Option<&Entry> {
        self.selected_index.and_then(|i| self.entries.get(i))
    }

    pub fn navigate_next_entry(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        self.selected_index = match self.selected_index {
            Some(i) if i < self.entries.len() - 1 => Some(i + 1),
            None => Some(0),
            _ => self.selected_index,
        };
    }

    pub fn navigate_previous_entry(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        self.selected_index = match self.selected_index {
            Some(i) if i > 0 => Some(i - 1),
            None => Some(self.entries.len() - 1),
            _ => self.selected_index,
        };
    }

    pub fn set_warning(&mut self, message: String) {
        self.warning = Some(Warning {
            message,
            timer: Instant::now(),
        });
    }

    pub fn clear_warning(&mut self) {
        self.warning = None;
    }

    pub fn expire_warning(&mut self) {
        if let Some(warning) = &self.warning {
            if warning.timer.elapsed() >= WARNING_TTL {
                self.warning = None;
            }
        }
    }

    pub fn warning_message(&self) -> &str {
        self.warning.as_ref().map_or("", |w| &w.message)
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
