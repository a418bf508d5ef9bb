use crate::domain::lines::LineSourceError;
use crate::infrastructure::repositories::ArtifactError;

/// Errors that abort a prefetch run before or outside per-line processing.
///
/// Per-line fetch failures never surface here: the orchestrator records them
/// in the failure log and keeps going.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Line source error: {0}")]
    LineSource(#[from] LineSourceError),

    #[error("Artifact store error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Failure log error: {0}")]
    FailureLog(#[source] std::io::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl AppError {
    /// Process exit code for this error (sysexits-style values)
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 78,
            Self::LineSource(_) => 66,
            Self::Artifact(_) | Self::FailureLog(_) => 73,
            Self::HttpClient(_) => 1,
        }
    }
}

/// Custom result type for the application
pub type AppResult<T> = Result<T, AppError>;
