use std::fmt;

/// Absolute folder path on the device filesystem.
///
/// Root is `/`; every other folder ends with `/`. All constructors and
/// navigation operations normalize, so a value of this type never contains
/// empty segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FolderPath(String);

impl FolderPath {
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Builds a canonical path from arbitrary input, collapsing duplicate
    /// separators and forcing the leading and trailing `/`.
    pub fn normalize(raw: &str) -> Self {
        let segments: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            Self::root()
        } else {
            Self(format!("/{}/", segments.join("/")))
        }
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Appends one folder segment (navigate-into). Separators inside the
    /// name are stripped rather than trusted.
    pub fn push(&mut self, name: &str) {
        let cleaned: String = name.chars().filter(|c| *c != '/').collect();
        if cleaned.is_empty() {
            return;
        }
        self.0 = format!("{}{}/", self.0, cleaned);
    }

    /// Drops the last segment (navigate-up). A no-op at root.
    pub fn pop(&mut self) {
        if self.is_root() {
            return;
        }
        let trimmed = self.0.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(0) | None => self.0 = "/".to_string(),
            Some(idx) => self.0.truncate(idx + 1),
        }
    }

    /// Display name of the folder itself: `Root` at root, otherwise the
    /// last segment.
    pub fn label(&self) -> &str {
        if self.is_root() {
            "Root"
        } else {
            self.0.trim_end_matches('/').rsplit('/').next().unwrap_or("Root")
        }
    }

    /// Full path of a file inside this folder, without a trailing slash.
    pub fn join_file(&self, name: &str) -> String {
        format!("{}{}", self.0, name)
    }

    /// Path of a child folder, in canonical (trailing slash) form.
    pub fn child(&self, name: &str) -> Self {
        let mut child = self.clone();
        child.push(name);
        child
    }
}

impl Default for FolderPath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
