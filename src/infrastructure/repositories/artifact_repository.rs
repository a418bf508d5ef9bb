use super::tts_repository::AudioStream;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("audio stream for {key} ended without any data")]
    Empty { key: String },
}

/// An audio file that was written completely
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub key: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Directory of downloaded clips, one file per cache key.
///
/// Only non-empty files count as present, so a zero-byte leftover from an
/// interrupted process gets fetched again instead of sticking forever.
pub struct ArtifactRepository {
    root: PathBuf,
}

impl ArtifactRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    pub async fn ensure_dir(&self) -> Result<(), ArtifactError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| ArtifactError::Io {
                path: self.root.clone(),
                source,
            })
    }

    pub async fn exists(&self, key: &str) -> bool {
        match tokio::fs::metadata(self.path_for(key)).await {
            Ok(meta) => meta.is_file() && meta.len() > 0,
            Err(_) => false,
        }
    }

    /// Stream `audio` into the artifact for `key`.
    ///
    /// On any error, including an empty body, the partial file is removed
    /// before the error is returned.
    pub async fn write(&self, key: &str, audio: AudioStream) -> Result<Artifact, ArtifactError> {
        let path = self.path_for(key);

        match Self::write_stream(&path, audio).await {
            Ok(0) => {
                self.remove(key).await;
                Err(ArtifactError::Empty {
                    key: key.to_string(),
                })
            }
            Ok(size) => {
                tracing::debug!(key = %key, size, "Artifact written");
                Ok(Artifact {
                    key: key.to_string(),
                    path,
                    size,
                })
            }
            Err(source) => {
                self.remove(key).await;
                Err(ArtifactError::Io { path, source })
            }
        }
    }

    async fn write_stream(path: &Path, mut audio: AudioStream) -> std::io::Result<u64> {
        let mut file = tokio::fs::File::create(path).await?;
        let mut written = 0u64;

        while let Some(chunk) = audio.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }

    /// Delete the artifact for `key`; a missing file is not an error
    pub async fn remove(&self, key: &str) {
        let path = self.path_for(key);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to remove artifact"
                );
            }
        }
    }
}
