use crate::domain::prefetch::{BackoffStrategy, PrefetchSettings, RetryPolicy};
use crate::error::AppError;
use serde::de::value::StrDeserializer;
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // TTS endpoint
    pub tts_base_url: String,
    pub tts_voice_id: String,
    pub request_timeout: Duration,
    // Filesystem
    pub output_dir: PathBuf,
    pub failure_log_path: PathBuf,
    pub line_sources: Vec<PathBuf>,
    // Scheduling
    pub concurrency: usize,
    pub pacing_every: usize,
    pub batch_pacing_delay: Duration,
    // Retry
    pub rate_limit_backoff: Duration,
    pub rate_limit_strategy: BackoffStrategy,
    pub server_error_backoff: Duration,
    pub max_server_error_retries: Option<u32>,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let concurrency: usize = parse_or("CONCURRENCY", lookup("CONCURRENCY"), 3)?;
        if concurrency == 0 {
            return Err(AppError::Config(
                "CONCURRENCY must be at least 1".to_string(),
            ));
        }

        let line_sources: Vec<PathBuf> = required("LINE_SOURCES", lookup("LINE_SOURCES"))?
            .split(',')
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .collect();
        if line_sources.is_empty() {
            return Err(AppError::Config(
                "LINE_SOURCES must name at least one file".to_string(),
            ));
        }

        let config = Config {
            tts_base_url: required("TTS_BASE_URL", lookup("TTS_BASE_URL"))?,
            tts_voice_id: lookup("TTS_VOICE_ID")
                .unwrap_or_else(|| "ja-JP-NanamiNeural".to_string()),
            request_timeout: secs_or("REQUEST_TIMEOUT_SECS", lookup("REQUEST_TIMEOUT_SECS"), 30)?,
            output_dir: lookup("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("audio")),
            failure_log_path: lookup("FAILURE_LOG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("failed_lines.txt")),
            line_sources,
            concurrency,
            pacing_every: parse_or("PACING_EVERY", lookup("PACING_EVERY"), 5 * concurrency)?,
            batch_pacing_delay: secs_or(
                "BATCH_PACING_DELAY_SECS",
                lookup("BATCH_PACING_DELAY_SECS"),
                10,
            )?,
            rate_limit_backoff: secs_or(
                "RATE_LIMIT_BACKOFF_SECS",
                lookup("RATE_LIMIT_BACKOFF_SECS"),
                300,
            )?,
            rate_limit_strategy: enum_or(
                "RATE_LIMIT_STRATEGY",
                lookup("RATE_LIMIT_STRATEGY"),
                BackoffStrategy::Fixed,
            )?,
            server_error_backoff: secs_or(
                "SERVER_ERROR_BACKOFF_SECS",
                lookup("SERVER_ERROR_BACKOFF_SECS"),
                120,
            )?,
            max_server_error_retries: match lookup("MAX_SERVER_ERROR_RETRIES") {
                Some(value) if !value.trim().is_empty() => {
                    Some(parse_value("MAX_SERVER_ERROR_RETRIES", &value)?)
                }
                _ => None,
            },
            log_format: enum_or("LOG_FORMAT", lookup("LOG_FORMAT"), LogFormat::Pretty)?,
        };

        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            rate_limit_backoff: self.rate_limit_backoff,
            rate_limit_strategy: self.rate_limit_strategy,
            server_error_backoff: self.server_error_backoff,
            max_server_error_retries: self.max_server_error_retries,
        }
    }

    pub fn prefetch_settings(&self) -> PrefetchSettings {
        PrefetchSettings {
            concurrency: self.concurrency,
            pacing_every: self.pacing_every,
            batch_pacing_delay: self.batch_pacing_delay,
            retry: self.retry_policy(),
        }
    }
}

fn required(key: &str, value: Option<String>) -> Result<String, AppError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("{} is not set", key)))
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| AppError::Config(format!("{}='{}' is invalid: {}", key, value, e)))
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(value) => parse_value(key, &value),
        None => Ok(default),
    }
}

/// Parse a lowercase-named enum through its `Deserialize` impl
fn enum_or<T>(key: &str, value: Option<String>, default: T) -> Result<T, AppError>
where
    T: DeserializeOwned,
{
    let value = match value {
        Some(value) if !value.trim().is_empty() => value.trim().to_lowercase(),
        _ => return Ok(default),
    };
    let deserializer: StrDeserializer<'_, serde::de::value::Error> =
        value.as_str().into_deserializer();
    T::deserialize(deserializer)
        .map_err(|e| AppError::Config(format!("{}='{}' is invalid: {}", key, value, e)))
}

fn secs_or(key: &str, value: Option<String>, default_secs: u64) -> Result<Duration, AppError> {
    let secs: f64 = parse_or(key, value, default_secs as f64)?;
    Duration::try_from_secs_f64(secs)
        .map_err(|e| AppError::Config(format!("{} must be a non-negative duration: {}", key, e)))
}
