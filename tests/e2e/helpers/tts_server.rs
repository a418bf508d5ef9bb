use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Requests received by the stand-in TTS endpoint
#[derive(Default)]
pub struct ServerState {
    pub requests: Mutex<Vec<(String, String)>>,
}

#[allow(dead_code)]
impl ServerState {
    pub fn request_count(&self, text: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|(_, t)| t.as_str() == text)
            .count()
    }
}

/// Answers by text:
/// - `rate limited` -> 429, `server error` -> 503, `missing` -> 404
/// - `slow` -> 200 after two seconds
/// - `flaky` -> 429 on the first request, audio afterwards
/// - anything else -> 200 with body `AUDIO:{voice}:{text}`
async fn synthesize(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let text = params.get("text").cloned().unwrap_or_default();
    let voice = params.get("voice").cloned().unwrap_or_default();
    state.requests.lock().push((voice.clone(), text.clone()));

    let audio = || {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "audio/mpeg")],
            format!("AUDIO:{}:{}", voice, text).into_bytes(),
        )
            .into_response()
    };

    match text.as_str() {
        "rate limited" => StatusCode::TOO_MANY_REQUESTS.into_response(),
        "server error" => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        "missing" => StatusCode::NOT_FOUND.into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            audio()
        }
        "flaky" if state.request_count("flaky") == 1 => {
            StatusCode::TOO_MANY_REQUESTS.into_response()
        }
        _ => audio(),
    }
}

/// Serve the stand-in endpoint on an ephemeral port; returns its base URL
pub async fn start_tts_server() -> (String, Arc<ServerState>) {
    let state = Arc::new(ServerState::default());
    let app = Router::new()
        .route("/api/tts", get(synthesize))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/api/tts", addr), state)
}
