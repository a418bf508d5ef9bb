use lesson_audio_prefetch::domain::lines::{LineSource, MultiLineSource};
use lesson_audio_prefetch::domain::prefetch::{PrefetchReport, PrefetchService};
use lesson_audio_prefetch::error::{AppError, AppResult};
use lesson_audio_prefetch::infrastructure::config::{Config, LogFormat};
use lesson_audio_prefetch::infrastructure::repositories::{
    ArtifactRepository, FailureLogRepository, HttpTtsRepository,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    // Initialize logging
    init_logging(&config);

    match run(config).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Prefetch aborted before any download started");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(config: Config) -> AppResult<PrefetchReport> {
    tracing::info!(
        base_url = %config.tts_base_url,
        voice = %config.tts_voice_id,
        output_dir = %config.output_dir.display(),
        "Starting lesson audio prefetch"
    );

    // Lines are loaded up front: a missing source aborts before any fetch
    let line_source = MultiLineSource::from_paths(&config.line_sources);
    let lines = line_source.load().await?;

    let artifact_repo = Arc::new(ArtifactRepository::new(config.output_dir.clone()));
    artifact_repo.ensure_dir().await?;

    let failure_log = Arc::new(
        FailureLogRepository::create(config.failure_log_path.clone())
            .await
            .map_err(AppError::FailureLog)?,
    );

    let tts_repo = Arc::new(HttpTtsRepository::new(
        config.tts_base_url.clone(),
        config.tts_voice_id.clone(),
        config.request_timeout,
    )?);

    let service = PrefetchService::new(
        tts_repo,
        artifact_repo,
        failure_log.clone(),
        config.prefetch_settings(),
    );

    let report = service.run(lines).await;

    tracing::info!(
        saved = report.succeeded,
        failed = report.failed,
        already_cached = report.cached,
        duplicates = report.duplicates,
        rate_limited_responses = report.rate_limited_responses,
        server_error_responses = report.server_error_responses,
        elapsed_secs = %format!("{:.1}", report.elapsed.as_secs_f64()),
        failure_log = %failure_log.path().display(),
        "Prefetch finished"
    );

    Ok(report)
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "lesson_audio_prefetch=info".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "lesson_audio_prefetch=info".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
