//! Media storage on local disk
//!
//! Uploaded images are written under the configured media directory with a
//! generated ULID file name and served back from `/static/images`.

use std::path::{Path, PathBuf};

use crate::data::EntityId;
use crate::error::AppError;

/// URL path prefix uploaded images are served under
pub const MEDIA_URL_PREFIX: &str = "/static/images";

/// Room for multipart boundaries and part headers around an uploaded file
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Media storage service
pub struct MediaStorage {
    /// Directory files are written to
    root: PathBuf,
    /// Largest accepted file, in bytes
    max_upload_bytes: usize,
}

impl MediaStorage {
    /// Create the storage, making sure the media directory exists
    ///
    /// # Errors
    /// Returns error if the directory cannot be created
    pub async fn new(config: &crate::config::StorageConfig) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(&config.media_dir).await?;

        Ok(Self {
            root: config.media_dir.clone(),
            max_upload_bytes: config.max_upload_bytes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Largest request body the server accepts
    pub fn request_body_limit(&self) -> usize {
        self.max_upload_bytes + MULTIPART_OVERHEAD_BYTES
    }

    /// Write an uploaded file
    ///
    /// # Returns
    /// The generated file name
    pub async fn save(&self, data: &[u8]) -> Result<String, AppError> {
        if data.len() > self.max_upload_bytes {
            return Err(AppError::PayloadTooLarge(self.max_upload_bytes));
        }

        let file_name = EntityId::new().0;
        tokio::fs::write(self.root.join(&file_name), data).await?;

        tracing::debug!(file_name = %file_name, bytes = data.len(), "Image stored");
        Ok(file_name)
    }

    /// Public URL for a stored file, given the scheme and host the client used
    pub fn public_url(&self, protocol: &str, host: &str, file_name: &str) -> String {
        format!("{}://{}{}/{}", protocol, host, MEDIA_URL_PREFIX, file_name)
    }
}
