use std::path::{Path, PathBuf};

use helpdesk_common::error::{HelpdeskError, HelpdeskResult};
use uuid::Uuid;

/// Attachment blobs on local disk, one file per attachment id.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, storage_key: &str) -> HelpdeskResult<PathBuf> {
        let key = Uuid::parse_str(storage_key)
            .map_err(|_| HelpdeskError::Internal(format!("bad storage key: {storage_key}")))?;
        Ok(self.root.join(key.to_string()))
    }

    /// Write the blob; returns the storage key recorded in the metadata row.
    pub async fn save(&self, id: Uuid, bytes: &[u8]) -> HelpdeskResult<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| HelpdeskError::Internal(format!("attachments dir: {e}")))?;
        let key = id.to_string();
        tokio::fs::write(self.root.join(&key), bytes)
            .await
            .map_err(|e| HelpdeskError::Internal(format!("failed to store attachment: {e}")))?;
        Ok(key)
    }

    pub async fn read(&self, storage_key: &str) -> HelpdeskResult<Vec<u8>> {
        let path = self.blob_path(storage_key)?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                HelpdeskError::NotFound(format!("attachment blob {storage_key}"))
            }
            _ => HelpdeskError::Internal(e.to_string()),
        })
    }

    /// Remove the blob. A blob that is already gone is not an error.
    pub async fn remove(&self, storage_key: &str) -> HelpdeskResult<()> {
        let path = self.blob_path(storage_key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HelpdeskError::Internal(e.to_string())),
        }
    }
}

/// Final path component of an uploaded filename, with control characters
/// dropped. Falls back to `attachment` when nothing usable remains.
pub fn sanitize_filename(raw: &str) -> String {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "attachment".to_owned()
    } else {
        cleaned.to_owned()
    }
}
