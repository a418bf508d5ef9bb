use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Flat text log of lines that failed permanently, one per row, in the
/// order the failures happened.
pub struct FailureLogRepository {
    path: PathBuf,
    file: Mutex<File>,
}

impl FailureLogRepository {
    /// Truncate (or create) the log for a new run and open it for appending
    pub async fn create(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&path, b"").await?;
        let file = OpenOptions::new().append(true).open(&path).await?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record with a single write
    pub async fn append(&self, text: &str) -> std::io::Result<()> {
        let mut record = text.replace(['\r', '\n'], " ");
        record.push('\n');

        let mut file = self.file.lock().await;
        file.write_all(record.as_bytes()).await?;
        file.flush().await
    }
}
