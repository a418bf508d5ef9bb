use crate::e2e::helpers;

use helpers::tts_server::start_tts_server;
use helpers::{fast_settings, TestContext};
use lesson_audio_prefetch::domain::lines::Line;
use lesson_audio_prefetch::infrastructure::repositories::{FetchOutcome, HttpTtsRepository, TtsRepository};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn repository(base_url: &str, timeout: Duration) -> HttpTtsRepository {
    HttpTtsRepository::new(base_url.to_string(), "test-voice".to_string(), timeout)
        .expect("Failed to build HTTP client")
}

#[tokio::test]
async fn it_should_stream_audio_for_successful_request() {
    let ctx = TestContext::new().await.unwrap();
    let (base_url, state) = start_tts_server().await;
    let repo = repository(&base_url, Duration::from_secs(5));

    let outcome = repo.fetch("こんにちは & Hello?").await;
    let audio = match outcome {
        FetchOutcome::Success(audio) => audio,
        other => panic!("expected success, got {:?}", other),
    };

    let artifact = ctx.artifact_repo.write("greeting.mp3", audio).await.unwrap();

    assert_eq!(
        ctx.read_artifact("greeting.mp3"),
        "AUDIO:test-voice:こんにちは & Hello?".as_bytes().to_vec()
    );
    assert_eq!(artifact.size, ctx.read_artifact("greeting.mp3").len() as u64);
    assert_eq!(
        state.requests.lock().clone(),
        vec![("test-voice".to_string(), "こんにちは & Hello?".to_string())]
    );
}

#[tokio::test]
async fn it_should_classify_error_statuses() {
    let (base_url, _state) = start_tts_server().await;
    let repo = repository(&base_url, Duration::from_secs(5));

    assert!(matches!(
        repo.fetch("rate limited").await,
        FetchOutcome::RateLimited
    ));
    assert!(matches!(
        repo.fetch("server error").await,
        FetchOutcome::ServerError(503)
    ));
    assert!(matches!(
        repo.fetch("missing").await,
        FetchOutcome::ClientError(404)
    ));
}

#[tokio::test]
async fn it_should_report_network_failure_when_endpoint_is_unreachable() {
    // Bind then drop a listener to get a port nobody is serving
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let repo = repository(&format!("http://{}/api/tts", addr), Duration::from_secs(5));

    match repo.fetch("Hello.").await {
        FetchOutcome::NetworkFailure(message) => assert!(!message.is_empty()),
        other => panic!("expected network failure, got {:?}", other),
    }
}

#[tokio::test]
async fn it_should_abort_requests_that_exceed_the_timeout() {
    let (base_url, _state) = start_tts_server().await;
    let repo = repository(&base_url, Duration::from_millis(200));

    match repo.fetch("slow").await {
        FetchOutcome::NetworkFailure(message) => {
            assert!(message.contains("timed out"), "unexpected message: {}", message)
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn it_should_prefetch_lesson_lines_against_http_endpoint() {
    let ctx = TestContext::new().await.unwrap();
    let (base_url, state) = start_tts_server().await;
    let repo = Arc::new(repository(&base_url, Duration::from_secs(5)));

    let service = ctx.service(repo, fast_settings(2));
    let report = service
        .run(vec![
            Line::new("flaky"),
            Line::new("Hello world."),
            Line::new("missing"),
        ])
        .await;

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.rate_limited_responses, 1);
    assert_eq!(state.request_count("flaky"), 2);
    assert_eq!(
        ctx.artifact_names(),
        vec!["flaky.mp3".to_string(), "hello_world.mp3".to_string()]
    );
    assert_eq!(ctx.failure_entries(), vec!["missing".to_string()]);
}
