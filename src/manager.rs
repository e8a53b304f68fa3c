use crate::app::{App, Dialog};
use crate::path::FolderPath;
use crate::push::PushMessage;
use crate::service::device::{DeviceApi, DeviceError, Listing, UploadFile};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Grace period before the first refresh after a reboot, so the device has
/// time to come back up.
pub const REBOOT_RELOAD_DELAY: Duration = Duration::from_secs(5);

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Completions of the asynchronous device requests. Listing and probe
/// completions carry the generation current when the request was issued.
#[derive(Debug)]
pub enum AppEvent {
    ListingLoaded {
        generation: u64,
        folder: FolderPath,
        result: Result<Listing, DeviceError>,
    },
    FolderProbed {
        generation: u64,
        name: String,
        is_empty: bool,
    },
    DeleteCheck {
        generation: u64,
        name: String,
        result: Result<Listing, DeviceError>,
    },
    UploadFinished {
        count: usize,
        result: Result<(), DeviceError>,
    },
    FolderCreated {
        name: String,
        result: Result<(), DeviceError>,
    },
    FileDeleted {
        name: String,
        result: Result<(), DeviceError>,
    },
    FolderDeleted {
        name: String,
        result: Result<(), DeviceError>,
    },
    DownloadSaved {
        name: String,
        result: Result<PathBuf, DeviceError>,
    },
    RebootAcknowledged {
        result: Result<(), DeviceError>,
    },
    RebootWaitElapsed,
}

/// Drives the view state against the device API: key gestures and push
/// messages come in, HTTP requests go out, completions come back as
/// [`AppEvent`]s.
pub struct FileManager {
    pub app: App,
    client: Arc<dyn DeviceApi>,
    events: mpsc::Sender<AppEvent>,
    download_dir: PathBuf,
}

impl FileManager {
    pub fn new(
        client: Arc<dyn DeviceApi>,
        download_dir: PathBuf,
    ) -> (Self, mpsc::Receiver<AppEvent>) {
        let (events, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (
            Self {
                app: App::new(),
                client,
                events,
                download_dir,
            },
            receiver,
        )
    }

    /// Fetches the current folder under a fresh generation. Responses from
    /// any previous refresh become stale the moment this is called.
    pub fn refresh_listing(&mut self) {
        let generation = self.app.next_generation();
        let folder = self.app.folder.clone();
        let client = Arc::clone(&self.client);
        let events = self.events.clone();
        tokio::spawn(async move {
            tracing::debug!("loading file list for {folder}");
            let result = client.list(folder.as_str()).await;
            let _ = events
                .send(AppEvent::ListingLoaded {
                    generation,
                    folder,
                    result,
                })
                .await;
        });
    }

    pub fn navigate_into(&mut self, name: &str) {
        self.app.folder.push(name);
        self.app.selected_index = None;
        self.refresh_listing();
    }

    pub fn navigate_up(&mut self) {
        if self.app.folder.is_root() {
            return;
        }
        self.app.folder.pop();
        self.app.selected_index = None;
        self.refresh_listing();
    }

    /// Uploads a batch of local files as a single request. Nothing is sent
    /// if the batch is empty or any file cannot be read.
    pub fn upload(&mut self, paths: Vec<PathBuf>) {
        if paths.is_empty() {
            return;
        }
        let client = Arc::clone(&self.client);
        let events = self.events.clone();
        tokio::spawn(async move {
            let mut files = Vec::with_capacity(paths.len());
            for path in &paths {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                match tokio::fs::read(path).await {
                    Ok(bytes) => files.push(UploadFile { name, bytes }),
                    Err(e) => {
                        tracing::error!("cannot read {}: {e}", path.display());
                        let _ = events
                            .send(AppEvent::UploadFinished {
                                count: 0,
                                result: Err(e.into()),
                            })
                            .await;
                        return;
                    }
                }
            }
            let count = files.len();
            tracing::info!("uploading {count} file(s)");
            let result = client.upload(files).await;
            let _ = events.send(AppEvent::UploadFinished { count, result }).await;
        });
    }

    /// Submits the folder-name prompt. Empty input aborts silently, matching
    /// a cancelled dialog.
    pub fn create_folder(&mut self, name: &str) {
        let name = name.trim().to_string();
        if name.is_empty() {
            return;
        }
        let client = Arc::clone(&self.client);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = client.create_folder(&name).await;
            let _ = events.send(AppEvent::FolderCreated { name, result }).await;
        });
    }

    /// Asks for confirmation before deleting a file.
    pub fn request_delete_file(&mut self, name: &str) {
        self.app.dialog = Some(Dialog::ConfirmDeleteFile {
            name: name.to_string(),
        });
    }

    fn delete_file_confirmed(&mut self, name: String) {
        let path = self.app.folder.join_file(&name);
        let client = Arc::clone(&self.client);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = client.delete_file(&path).await;
            let _ = events.send(AppEvent::FileDeleted { name, result }).await;
        });
    }

    /// Starts the delete-folder flow with a fresh emptiness check; the
    /// confirmation dialog only opens if the check comes back empty. The
    /// check is stamped with the current generation so a completion that
    /// lands after a navigation is discarded instead of opening a dialog
    /// over the wrong folder.
    pub fn request_delete_folder(&mut self, name: &str) {
        let generation = self.app.generation;
        let child = self.app.folder.child(name);
        let name = name.to_string();
        let client = Arc::clone(&self.client);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = client.list(child.as_str()).await;
            let _ = events
                .send(AppEvent::DeleteCheck {
                    generation,
                    name,
                    result,
                })
                .await;
        });
    }

    fn delete_folder_confirmed(&mut self, name: String) {
        let client = Arc::clone(&self.client);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = client.delete_folder(&name).await;
            let _ = events.send(AppEvent::FolderDeleted { name, result }).await;
        });
    }

    pub fn download(&mut self, name: &str) {
        let path = self.app.folder.join_file(name);
        let target = self.download_dir.join(name);
        let name = name.to_string();
        let client = Arc::clone(&self.client);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = match client.download(&path).await {
                Ok(bytes) => match tokio::fs::write(&target, bytes).await {
                    Ok(()) => Ok(target),
                    Err(e) => Err(e.into()),
                },
                Err(e) => Err(e),
            };
            let _ = events.send(AppEvent::DownloadSaved { name, result }).await;
        });
    }

    pub fn request_reboot(&mut self) {
        self.app.dialog = Some(Dialog::ConfirmReboot);
    }

    fn reboot_confirmed(&mut self) {
        let client = Arc::clone(&self.client);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = client.reboot().await;
            let _ = events.send(AppEvent::RebootAcknowledged { result }).await;
        });
    }

    /// Applies one request completion to the view state.
    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::ListingLoaded {
                generation,
                folder,
                result,
            } => match result {
                Ok(listing) => {
                    if self.app.apply_listing(generation, &listing) {
                        self.spawn_probes(generation, &listing);
                    }
                }
                Err(e) => {
                    // The previous view stays on screen.
                    tracing::error!("failed to load file list for {folder}: {e}");
                }
            },
            AppEvent::FolderProbed {
                generation,
                name,
                is_empty,
            } => {
                self.app.apply_probe(generation, &name, is_empty);
            }
            AppEvent::DeleteCheck {
                generation,
                name,
                result,
            } => {
                if generation != self.app.generation {
                    tracing::debug!("discarding stale delete check for {name}");
                    return;
                }
                match result {
                    Ok(listing) if listing.is_empty() => {
                        self.app.dialog = Some(Dialog::ConfirmDeleteFolder { name });
                    }
                    Ok(_) => {
                        tracing::error!("cannot delete folder {name}: folder is not empty");
                        self.app.set_delete_enabled(&name, false);
                        self.app
                            .set_warning(format!("Folder \"{name}\" is not empty"));
                    }
                    Err(e) => {
                        tracing::error!("failed to check folder {name}: {e}");
                    }
                }
            }
            AppEvent::UploadFinished { count, result } => match result {
                Ok(()) => {
                    tracing::info!("upload of {count} file(s) completed");
                    self.refresh_listing();
                }
                Err(e) => tracing::error!("upload failed: {e}"),
            },
            AppEvent::FolderCreated { name, result } => match result {
                Ok(()) => {
                    tracing::info!("folder {name} created");
                    self.refresh_listing();
                }
                Err(e) => tracing::error!("failed to create folder {name}: {e}"),
            },
            AppEvent::FileDeleted { name, result } => match result {
                Ok(()) => {
                    tracing::info!("file {name} deleted");
                    self.refresh_listing();
                }
                Err(e) => tracing::error!("failed to delete file {name}: {e}"),
            },
            AppEvent::FolderDeleted { name, result } => match result {
                Ok(()) => {
                    tracing::info!("folder {name} deleted");
                    self.refresh_listing();
                }
                Err(e) => tracing::error!("failed to delete folder {name}: {e}"),
            },
            AppEvent::DownloadSaved { name, result } => match result {
                Ok(target) => tracing::info!("downloaded {name} to {}", target.display()),
                Err(e) => tracing::error!("failed to download {name}: {e}"),
            },
            AppEvent::RebootAcknowledged { result } => match result {
                Ok(()) => {
                    tracing::info!("reboot command sent");
                    self.app.dialog = Some(Dialog::RebootNotice);
                    let events = self.events.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(REBOOT_RELOAD_DELAY).await;
                        let _ = events.send(AppEvent::RebootWaitElapsed).await;
                    });
                }
                Err(e) => {
                    tracing::error!("failed to reboot: {e}");
                    self.app.dialog = None;
                }
            },
            AppEvent::RebootWaitElapsed => {
                // Page-reload analog: back to root with a clean view.
                self.app.dialog = None;
                self.app.folder = FolderPath::root();
                self.app.selected_index = None;
                self.refresh_listing();
            }
        }
    }

    /// One emptiness probe per folder entry, all stamped with the render
    /// generation of the listing that produced them.
    fn spawn_probes(&self, generation: u64, listing: &Listing) {
        for file in listing.files.iter().filter(|f| f.is_dir) {
            let child = self.app.folder.child(&file.name);
            let name = file.name.clone();
            let client = Arc::clone(&self.client);
            let events = self.events.clone();
            tokio::spawn(async move {
                let is_empty = match client.list(child.as_str()).await {
                    Ok(listing) => listing.is_empty(),
                    Err(e) => {
                        tracing::error!("failed to check folder {name}: {e}");
                        false
                    }
                };
                let _ = events
                    .send(AppEvent::FolderProbed {
                        generation,
                        name,
                        is_empty,
                    })
                    .await;
            });
        }
    }

    /// Dispatches a push-channel command to the matching local action.
    pub fn handle_push(&mut self, message: PushMessage) {
        match message {
            PushMessage::TriggerUpload => {
                tracing::info!("push: opening upload prompt");
                self.app.dialog = Some(Dialog::UploadPathPrompt {
                    input: String::new(),
                });
            }
            PushMessage::CreateFolder => {
                tracing::info!("push: opening folder prompt");
                self.app.dialog = Some(Dialog::FolderNamePrompt {
                    input: String::new(),
                });
            }
            PushMessage::Reboot => {
                tracing::info!("push: reboot requested");
                self.request_reboot();
            }
            PushMessage::TriggerFileList => {
                tracing::info!("push: refreshing file list");
                self.refresh_listing();
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        self.app.clear_warning();
        if self.app.dialog.is_some() {
            self.handle_dialog_key(key);
        } else {
            self.handle_browse_key(key);
        }
    }

    fn handle_browse_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.app.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.app.navigate_previous_entry(),
            KeyCode::Down | KeyCode::Char('j') => self.app.navigate_next_entry(),
            KeyCode::Backspace | KeyCode::Left | KeyCode::Char('h') => self.navigate_up(),
            KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
                if let Some(entry) = self.app.selected_entry().cloned() {
                    if entry.is_dir {
                        self.navigate_into(&entry.name);
                    } else {
                        self.download(&entry.name);
                    }
                }
            }
            KeyCode::Char('d') => {
                if let Some(entry) = self.app.selected_entry().cloned() {
                    if !entry.is_dir {
                        self.download(&entry.name);
                    }
                }
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                if let Some(entry) = self.app.selected_entry().cloned() {
                    if entry.is_dir {
                        if entry.delete_enabled {
                            self.request_delete_folder(&entry.name);
                        } else {
                            self.app
                                .set_warning(format!("Folder \"{}\" is not empty", entry.name));
                        }
                    } else {
                        self.request_delete_file(&entry.name);
                    }
                }
            }
            KeyCode::Char('n') => {
                self.app.dialog = Some(Dialog::FolderNamePrompt {
                    input: String::new(),
                });
            }
            KeyCode::Char('u') => {
                self.app.dialog = Some(Dialog::UploadPathPrompt {
                    input: String::new(),
                });
            }
            KeyCode::Char('r') => self.refresh_listing(),
            KeyCode::Char('R') => self.request_reboot(),
            _ => {}
        }
    }

    fn handle_dialog_key(&mut self, key: KeyEvent) {
        let Some(dialog) = self.app.dialog.clone() else {
            return;
        };
        match dialog {
            Dialog::ConfirmDeleteFile { name } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.app.dialog = None;
                    self.delete_file_confirmed(name);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.app.dialog = None;
                }
                _ => {}
            },
            Dialog::ConfirmDeleteFolder { name } => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.app.dialog = None;
                    self.delete_folder_confirmed(name);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.app.dialog = None;
                }
                _ => {}
            },
            Dialog::ConfirmReboot => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.app.dialog = None;
                    self.reboot_confirmed();
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.app.dialog = None;
                }
                _ => {}
            },
            Dialog::FolderNamePrompt { mut input } => match key.code {
                KeyCode::Enter => {
                    self.app.dialog = None;
                    self.create_folder(&input);
                }
                KeyCode::Esc => self.app.dialog = None,
                KeyCode::Backspace => {
                    input.pop();
                    self.app.dialog = Some(Dialog::FolderNamePrompt { input });
                }
                KeyCode::Char(c) => {
                    input.push(c);
                    self.app.dialog = Some(Dialog::FolderNamePrompt { input });
                }
                _ => {}
            },
            Dialog::UploadPathPrompt { mut input } => match key.code {
                KeyCode::Enter => {
                    self.app.dialog = None;
                    // Paths may contain spaces, so batches are ';' separated.
                    let paths: Vec<PathBuf> = input
                        .split(';')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(PathBuf::from)
                        .collect();
                    self.upload(paths);
                }
                KeyCode::Esc => self.app.dialog = None,
                KeyCode::Backspace => {
                    input.pop();
                    self.app.dialog = Some(Dialog::UploadPathPrompt { input });
                }
                KeyCode::Char(c) => {
                    input.push(c);
                    self.app.dialog = Some(Dialog::UploadPathPrompt { input });
                }
                _ => {}
            },
            // Blocking while the device restarts.
            Dialog::RebootNotice => {}
        }
    }
}
