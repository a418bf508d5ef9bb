use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::fmt;

/// Audio body of a successful fetch, streamed chunk by chunk
pub type AudioStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

/// Classified result of one request to the TTS endpoint
pub enum FetchOutcome {
    /// HTTP 200, body still to be consumed
    Success(AudioStream),
    /// HTTP 429
    RateLimited,
    /// HTTP 5xx
    ServerError(u16),
    /// Any other non-200 status
    ClientError(u16),
    /// No status was obtained (connect error, timeout, ...)
    NetworkFailure(String),
}

impl FetchOutcome {
    /// Classify a non-200 status. Returns `None` for 200, whose body the
    /// caller turns into [`FetchOutcome::Success`].
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200 => None,
            429 => Some(FetchOutcome::RateLimited),
            500..=599 => Some(FetchOutcome::ServerError(status)),
            other => Some(FetchOutcome::ClientError(other)),
        }
    }
}

impl fmt::Debug for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchOutcome::Success(_) => f.write_str("Success(<audio stream>)"),
            FetchOutcome::RateLimited => f.write_str("RateLimited"),
            FetchOutcome::ServerError(code) => write!(f, "ServerError({})", code),
            FetchOutcome::ClientError(code) => write!(f, "ClientError({})", code),
            FetchOutcome::NetworkFailure(msg) => write!(f, "NetworkFailure({})", msg),
        }
    }
}

/// Remote text-to-speech endpoint.
///
/// Implementations perform exactly one request per call and never retry;
/// retry policy belongs to the prefetch service.
#[async_trait]
pub trait TtsRepository: Send + Sync {
    async fn fetch(&self, text: &str) -> FetchOutcome;
}
