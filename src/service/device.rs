use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// One entry of a folder listing as reported by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    #[serde(default)]
    pub is_dir: bool,
    #[serde(default)]
    pub size: u64,
}

/// Response of `GET /fsm/filelist` for a single folder (not recursive).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(default)]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub total_space: u64,
    #[serde(default)]
    pub used_space: u64,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// A local file staged for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("device returned status {0}")]
    Status(StatusCode),

    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The device's file-manager HTTP endpoints.
///
/// Behind a trait so the manager can be driven against a recording fake;
/// `HttpDevice` is the real implementation.
#[async_trait]
pub trait DeviceApi: Send + Sync {
    async fn list(&self, folder: &str) -> Result<Listing, DeviceError>;

    /// Uploads a batch of files as one multipart request. The device infers
    /// the destination folder from its own upload context.
    async fn upload(&self, files: Vec<UploadFile>) -> Result<(), DeviceError>;

    async fn create_folder(&self, name: &str) -> Result<(), DeviceError>;

    /// Deletes a folder by bare name; the device resolves it against the
    /// folder of the most recent listing.
    async fn delete_folder(&self, name: &str) -> Result<(), DeviceError>;

    /// Deletes a file by full path.
    async fn delete_file(&self, path: &str) -> Result<(), DeviceError>;

    async fn download(&self, path: &str) -> Result<Vec<u8>, DeviceError>;

    async fn reboot(&self) -> Result<(), DeviceError>;
}

/// HTTP client for the device's `/fsm/*` API.
#[derive(Debug, Clone)]
pub struct HttpDevice {
    http: reqwest::Client,
    base: reqwest::Url,
}

impl HttpDevice {
    pub fn new(base: reqwest::Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base,
        }
    }

    fn endpoint(&self, path: &str) -> Result<reqwest::Url, DeviceError> {
        self.base
            .join(path)
            .map_err(|e| DeviceError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))
    }

    fn check_status(response: &reqwest::Response) -> Result<(), DeviceError> {
        if response.status() != StatusCode::OK {
            return Err(DeviceError::Status(response.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceApi for HttpDevice {
    async fn list(&self, folder: &str) -> Result<Listing, DeviceError> {
        let response = self
            .http
            .get(self.endpoint("/fsm/filelist")?)
            .query(&[("folder", folder)])
            .send()
            .await?;
        Self::check_status(&response)?;
        // Decode by hand so a garbled body is distinguishable from a
        // transport failure.
        let body = response.text().await?;
        let listing = serde_json::from_str(&body)?;
        Ok(listing)
    }

    async fn upload(&self, files: Vec<UploadFile>) -> Result<(), DeviceError> {
        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let part = reqwest::multipart::Part::bytes(file.bytes).file_name(file.name);
            form = form.part("file", part);
        }
        let response = self
            .http
            .post(self.endpoint("/fsm/upload")?)
            .multipart(form)
            .send()
            .await?;
        Self::check_status(&response)
    }

    async fn create_folder(&self, name: &str) -> Result<(), DeviceError> {
        let response = self
            .http
            .post(self.endpoint("/fsm/createFolder")?)
            .form(&[("name", name)])
            .send()
            .await?;
        Self::check_status(&response)
    }

    async fn delete_folder(&self, name: &str) -> Result<(), DeviceError> {
        let response = self
            .http
            .post(self.endpoint("/fsm/deleteFolder")?)
            .form(&[("folder", name)])
            .send()
            .await?;
        Self::check_status(&response)
    }

    async fn delete_file(&self, path: &str) -> Result<(), DeviceError> {
        let response = self
            .http
            .post(self.endpoint("/fsm/delete")?)
            .form(&[("file", path)])
            .send()
            .await?;
        Self::check_status(&response)
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, DeviceError> {
        let response = self
            .http
            .get(self.endpoint("/fsm/download")?)
            .query(&[("file", path)])
            .send()
            .await?;
        Self::check_status(&response)?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn reboot(&self) -> Result<(), DeviceError> {
        let response = self.http.post(self.endpoint("/fsm/reboot")?).send().await?;
        Self::check_status(&response)
    }
}
