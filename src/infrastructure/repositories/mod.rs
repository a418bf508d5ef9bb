pub mod artifact_repository;
pub mod failure_log_repository;
pub mod http_tts_repository;
pub mod tts_repository;

pub use artifact_repository::{Artifact, ArtifactError, ArtifactRepository};
pub use failure_log_repository::FailureLogRepository;
pub use http_tts_repository::HttpTtsRepository;
pub use tts_repository::{AudioStream, FetchOutcome, TtsRepository};
