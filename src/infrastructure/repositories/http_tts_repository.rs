use super::tts_repository::{FetchOutcome, TtsRepository};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;

/// TTS endpoint reached with `GET {base_url}?voice={voice}&text={text}`
pub struct HttpTtsRepository {
    base_url: String,
    voice_id: String,
    request_timeout: Duration,
    http_client: reqwest::Client,
}

impl HttpTtsRepository {
    /// The timeout covers the whole request, body streaming included
    pub fn new(
        base_url: String,
        voice_id: String,
        request_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            base_url,
            voice_id,
            request_timeout,
            http_client,
        })
    }

    pub fn request_url(&self, text: &str) -> String {
        format!(
            "{}?voice={}&text={}",
            self.base_url,
            urlencoding::encode(&self.voice_id),
            urlencoding::encode(text)
        )
    }

    fn describe_error(&self, error: &reqwest::Error) -> String {
        if error.is_timeout() {
            format!("request timed out after {:?}", self.request_timeout)
        } else if error.is_connect() {
            format!("connection failed: {}", error)
        } else {
            format!("request failed: {}", error)
        }
    }
}

#[async_trait]
impl TtsRepository for HttpTtsRepository {
    async fn fetch(&self, text: &str) -> FetchOutcome {
        let url = self.request_url(text);

        tracing::debug!(
            voice = %self.voice_id,
            text_length = text.len(),
            "Requesting TTS audio"
        );

        let response = match self.http_client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                let message = self.describe_error(&e);
                tracing::debug!(error = %e, "TTS request failed before a status was received");
                return FetchOutcome::NetworkFailure(message);
            }
        };

        let status = response.status().as_u16();
        if let Some(outcome) = FetchOutcome::from_status(status) {
            tracing::debug!(status, "TTS endpoint returned non-success status");
            return outcome;
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| {
                chunk.map_err(|e| {
                    let kind = if e.is_timeout() {
                        std::io::ErrorKind::TimedOut
                    } else {
                        std::io::ErrorKind::Other
                    };
                    std::io::Error::new(kind, format!("audio stream aborted: {}", e))
                })
            })
            .boxed();

        FetchOutcome::Success(stream)
    }
}
