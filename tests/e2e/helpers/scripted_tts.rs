use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use lesson_audio_prefetch::infrastructure::repositories::{FetchOutcome, TtsRepository};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What the scripted endpoint answers for one request
#[derive(Debug, Clone)]
pub enum Reply {
    Audio(Vec<u8>),
    RateLimited,
    ServerError(u16),
    ClientError(u16),
    NetworkFailure(&'static str),
    /// 200 whose body breaks after the first chunk
    BrokenStream,
}

impl Reply {
    fn into_outcome(self) -> FetchOutcome {
        match self {
            Reply::Audio(data) => {
                FetchOutcome::Success(stream::iter(vec![Ok(Bytes::from(data))]).boxed())
            }
            Reply::RateLimited => FetchOutcome::RateLimited,
            Reply::ServerError(code) => FetchOutcome::ServerError(code),
            Reply::ClientError(code) => FetchOutcome::ClientError(code),
            Reply::NetworkFailure(msg) => FetchOutcome::NetworkFailure(msg.to_string()),
            Reply::BrokenStream => FetchOutcome::Success(
                stream::iter(vec![
                    Ok(Bytes::from_static(b"partial audio")),
                    Err(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        "connection reset mid-body",
                    )),
                ])
                .boxed(),
            ),
        }
    }
}

#[allow(dead_code)]
pub fn mock_audio_bytes() -> Vec<u8> {
    // Minimal MP3 frame header plus padding
    vec![0xFF, 0xFB, 0x90, 0x00, 0x00, 0x00, 0x00, 0x00]
}

/// In-memory TTS repository answering from per-text scripts.
///
/// Records every request and the deepest number of concurrent requests.
pub struct ScriptedTts {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    fallback: Reply,
    delay: Duration,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedTts {
    /// Answer every request with `reply` unless a script says otherwise
    pub fn always(reply: Reply) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback: reply,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn succeeding() -> Self {
        Self::always(Reply::Audio(mock_audio_bytes()))
    }

    /// Queue replies for `text`; once used up, the fallback applies
    pub fn script(self, text: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .insert(text.to_string(), replies.into_iter().collect());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, text: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == text).count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TtsRepository for ScriptedTts {
    async fn fetch(&self, text: &str) -> FetchOutcome {
        self.calls.lock().push(text.to_string());
        let depth = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(depth, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let reply = {
            let mut scripts = self.scripts.lock();
            scripts
                .get_mut(text)
                .and_then(|queue| queue.pop_front())
                .unwrap_or_else(|| self.fallback.clone())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply.into_outcome()
    }
}
