use super::error::LineSourceError;
use super::model::{normalize_text, Line};
use super::source::LineSource;
use async_trait::async_trait;
use html2text::from_read;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

/// `<span data-tts="...">` / `<span data-tts='...'>` markers on playable elements
static DATA_TTS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"data-tts\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("data-tts pattern is valid")
});

/// `speak('...')` / `speak("...")` calls in inline lesson scripts
static SPEAK_CALL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bspeak\(\s*(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)")\s*\)"#)
        .expect("speak() pattern is valid")
});

/// Extracts speakable lines from an HTML lesson document.
///
/// Lines come out in document order, whichever pattern matched them.
pub struct HtmlLineSource {
    path: PathBuf,
}

impl HtmlLineSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn extract(document: &str) -> Vec<Line> {
        let mut found: Vec<(usize, String)> = Vec::new();

        for caps in DATA_TTS_PATTERN.captures_iter(document) {
            if let Some(value) = caps.get(1).or_else(|| caps.get(2)) {
                found.push((value.start(), clean_fragment(value.as_str())));
            }
        }

        for caps in SPEAK_CALL_PATTERN.captures_iter(document) {
            if let Some(value) = caps.get(1).or_else(|| caps.get(2)) {
                let unescaped = unescape_js_string(value.as_str());
                found.push((value.start(), clean_fragment(&unescaped)));
            }
        }

        found.sort_by_key(|(offset, _)| *offset);
        found
            .into_iter()
            .filter(|(_, text)| !text.is_empty())
            .map(|(_, text)| Line::new(text))
            .collect()
    }
}

#[async_trait]
impl LineSource for HtmlLineSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> Result<Vec<Line>, LineSourceError> {
        let document = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| LineSourceError::from_io(self.path.clone(), e))?;
        let lines = Self::extract(&document);
        tracing::debug!(
            path = %self.path.display(),
            line_count = lines.len(),
            "Extracted lines from HTML lesson"
        );
        Ok(lines)
    }
}

/// Render markup/entities to plain text and collapse whitespace
fn clean_fragment(fragment: &str) -> String {
    if fragment.contains('<') || fragment.contains('&') {
        let plain_text = from_read(fragment.as_bytes(), usize::MAX);
        normalize_text(&plain_text)
    } else {
        normalize_text(fragment)
    }
}

/// Decode JavaScript string escapes. Malformed `\x`/`\u` escapes are kept
/// verbatim; newline and tab escapes become a space.
fn unescape_js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let escape = &rest[pos + 1..];
        if escape.is_empty() {
            return out;
        }
        match decode_escape(escape) {
            Some((c, consumed)) => {
                out.push(c);
                rest = &escape[consumed..];
            }
            None => {
                out.push('\\');
                rest = escape;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Decode the escape following a backslash, returning the character and the
/// number of bytes it spans
fn decode_escape(escape: &str) -> Option<(char, usize)> {
    let kind = escape.chars().next()?;
    match kind {
        'n' | 't' | 'r' => Some((' ', 1)),
        'x' => {
            let code = hex_value(escape.get(1..3)?)?;
            Some((char::from_u32(code)?, 3))
        }
        'u' if escape[1..].starts_with('{') => {
            let close = escape.find('}')?;
            let digits = &escape[2..close];
            if digits.is_empty() || digits.len() > 6 {
                return None;
            }
            Some((char::from_u32(hex_value(digits)?)?, close + 1))
        }
        'u' => {
            let unit = hex_value(escape.get(1..5)?)?;
            if !(0xD800..0xDC00).contains(&unit) {
                return Some((char::from_u32(unit)?, 5));
            }
            // High surrogate: only valid when a low surrogate escape follows
            if escape.get(5..7)? != "\\u" {
                return None;
            }
            let low = hex_value(escape.get(7..11)?)?;
            if !(0xDC00..0xE000).contains(&low) {
                return None;
            }
            let code = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
            Some((char::from_u32(code)?, 11))
        }
        other => Some((other, other.len_utf8())),
    }
}

fn hex_value(digits: &str) -> Option<u32> {
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}
