use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use pt_core::ports::ShareInboxPort;
use pt_core::SharedPin;
use tokio::fs;
use tracing::{debug, warn};

/// Single-record hand-off file shared with the share extension.
///
/// The extension writes one JSON `SharedPin`; the app takes it and deletes
/// the file. A newer share overwrites an unread one.
pub struct FileShareInbox {
    path: PathBuf,
}

impl FileShareInbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes a record the way the share extension does.
    pub async fn save(&self, shared: &SharedPin) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("create share inbox dir failed: {}", dir.display()))?;
        }

        let content = serde_json::to_vec_pretty(shared).context("serialize shared pin")?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .await
            .with_context(|| format!("write temp share inbox failed: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path).await.with_context(|| {
            format!(
                "rename temp share inbox to target failed: {} -> {}",
                tmp_path.display(),
                self.path.display()
            )
        })?;
        debug!(path = %self.path.display(), "shared pin written to inbox");
        Ok(())
    }
}

#[async_trait]
impl ShareInboxPort for FileShareInbox {
    async fn read_and_clear(&self) -> Result<Option<SharedPin>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("read share inbox failed: {}", self.path.display()))
            }
        };

        // Cleared before decoding so a bad record is not retried forever.
        fs::remove_file(&self.path)
            .await
            .with_context(|| format!("clear share inbox failed: {}", self.path.display()))?;

        match serde_json::from_slice::<SharedPin>(&bytes) {
            Ok(shared) => Ok(Some(shared)),
            Err(err) => {
                warn!(error = %err, "discarding unreadable share inbox record");
                Ok(None)
            }
        }
    }
}
