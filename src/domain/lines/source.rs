use super::error::LineSourceError;
use super::html::HtmlLineSource;
use super::model::Line;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Produces the ordered list of lines a prefetch run works through.
///
/// Loading happens once, before any fetch is dispatched, so a missing or
/// unreadable source aborts the run without touching the network.
#[async_trait]
pub trait LineSource: Send + Sync {
    /// Human-readable origin, used in logs
    fn describe(&self) -> String;

    async fn load(&self) -> Result<Vec<Line>, LineSourceError>;
}

/// Hardcoded list of lines
pub struct StaticLineSource {
    lines: Vec<String>,
}

impl StaticLineSource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl LineSource for StaticLineSource {
    fn describe(&self) -> String {
        format!("static list ({} lines)", self.lines.len())
    }

    async fn load(&self) -> Result<Vec<Line>, LineSourceError> {
        Ok(self.lines.iter().map(|raw| Line::new(raw.as_str())).collect())
    }
}

/// Plain text file, one line of speech per row.
/// Blank rows and rows starting with `#` are ignored.
pub struct TextFileLineSource {
    path: PathBuf,
}

impl TextFileLineSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(contents: &str) -> Vec<Line> {
        contents
            .lines()
            .map(str::trim)
            .filter(|row| !row.is_empty() && !row.starts_with('#'))
            .map(Line::new)
            .collect()
    }
}

#[async_trait]
impl LineSource for TextFileLineSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> Result<Vec<Line>, LineSourceError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| LineSourceError::from_io(self.path.clone(), e))?;
        Ok(Self::parse(&contents))
    }
}

/// Concatenates several sources, preserving their order
pub struct MultiLineSource {
    sources: Vec<Box<dyn LineSource>>,
}

impl MultiLineSource {
    pub fn new(sources: Vec<Box<dyn LineSource>>) -> Self {
        Self { sources }
    }

    /// Build a source per path: HTML extraction for `.html`/`.htm` lesson
    /// files, the plain text reader for anything else.
    pub fn from_paths(paths: &[PathBuf]) -> Self {
        let sources = paths
            .iter()
            .map(|path| -> Box<dyn LineSource> {
                if is_html(path) {
                    Box::new(HtmlLineSource::new(path.clone()))
                } else {
                    Box::new(TextFileLineSource::new(path.clone()))
                }
            })
            .collect();
        Self { sources }
    }
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
        .unwrap_or(false)
}

#[async_trait]
impl LineSource for MultiLineSource {
    fn describe(&self) -> String {
        self.sources
            .iter()
            .map(|source| source.describe())
            .collect::<Vec<_>>()
            .join(", ")
    }

    async fn load(&self) -> Result<Vec<Line>, LineSourceError> {
        let mut lines = Vec::new();
        for source in &self.sources {
            let loaded = source.load().await?;
            tracing::info!(
                source = %source.describe(),
                line_count = loaded.len(),
                "Line source loaded"
            );
            lines.extend(loaded);
        }
        Ok(lines)
    }
}
