//! Local filesystem blob store.
//!
//! Writes uploads to `{root}/{folder}/{owner_key}/{tag}`. Uploading again
//! under the same key replaces the file; the returned URL carries a content
//! hash so clients do not keep showing the old image.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::config::BlobSettings;
use crate::domain::BlobStore;
use crate::shared::error::AppError;

/// Hex characters of the content hash appended to URLs
const VERSION_LEN: usize = 16;

/// A single path segment: no separators, no traversal, not empty.
fn check_segment(name: &str, value: &str) -> Result<(), AppError> {
    let is_plain = !value.is_empty()
        && !value.contains('/')
        && !value.contains('\\')
        && !value.contains("..")
        && matches!(Path::new(value).components().next(), Some(Component::Normal(_)));

    if is_plain {
        Ok(())
    } else {
        Err(AppError::bad_request(format!("Invalid blob {} '{}'", name, value)))
    }
}

/// Blob store writing to a local directory served under a public URL.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
    max_upload_bytes: usize,
}

impl LocalBlobStore {
    /// Create the root directory if needed.
    pub async fn new(settings: &BlobSettings) -> Result<Self, AppError> {
        let root = PathBuf::from(&settings.root);
        fs::create_dir_all(&root).await?;

        info!(path = %root.display(), "Blob store initialized");

        Ok(Self {
            root,
            public_base_url: settings.public_base_url.trim_end_matches('/').to_string(),
            max_upload_bytes: settings.max_upload_bytes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, owner_key: &str, folder: &str, tag: &str) -> Result<PathBuf, AppError> {
        check_segment("folder", folder)?;
        check_segment("owner key", owner_key)?;
        check_segment("tag", tag)?;
        Ok(self.root.join(folder).join(owner_key).join(tag))
    }

    fn version(bytes: &[u8]) -> String {
        let digest = Sha256::digest(bytes);
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        hex[..VERSION_LEN].to_string()
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(
        &self,
        owner_key: &str,
        folder: &str,
        tag: &str,
        bytes: Vec<u8>,
    ) -> Result<String, AppError> {
        if bytes.is_empty() {
            return Err(AppError::bad_request("Upload is empty"));
        }
        if bytes.len() > self.max_upload_bytes {
            return Err(AppError::bad_request(format!(
                "Upload of {} bytes exceeds the {} byte limit",
                bytes.len(),
                self.max_upload_bytes
            )));
        }

        let path = self.blob_path(owner_key, folder, tag)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let version = Self::version(&bytes);
        fs::write(&path, &bytes).await?;

        debug!(path = %path.display(), "Stored blob");
        Ok(format!(
            "{}/{}/{}/{}?v={}",
            self.public_base_url, folder, owner_key, tag, version
        ))
    }
}
