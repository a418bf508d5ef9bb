use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// One unit of source text to synthesize.
///
/// `raw` is kept exactly as the source produced it; `text` is the trimmed,
/// whitespace-collapsed form that gets sent to the TTS endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub raw: String,
    pub text: String,
}

impl Line {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let text = normalize_text(&raw);
        Self { raw, text }
    }

    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

impl From<&str> for Line {
    fn from(raw: &str) -> Self {
        Line::new(raw)
    }
}

/// Trim and collapse runs of whitespace (including newlines) to one space
pub fn normalize_text(raw: &str) -> String {
    WHITESPACE_PATTERN.replace_all(raw.trim(), " ").into_owned()
}
