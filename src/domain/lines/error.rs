use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LineSourceError {
    #[error("line source not found: {}", path.display())]
    Missing { path: PathBuf },
    #[error("failed to read line source {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LineSourceError {
    pub(crate) fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            LineSourceError::Missing { path }
        } else {
            LineSourceError::Read { path, source }
        }
    }
}
