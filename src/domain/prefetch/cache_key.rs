use once_cell::sync::Lazy;
use regex::Regex;

/// Extension appended to every cache key
pub const AUDIO_EXTENSION: &str = ".mp3";

/// Maximum number of characters kept from the sanitized text
pub const MAX_KEY_CHARS: usize = 100;

static WHITESPACE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Everything outside ASCII word characters, hiragana, katakana, CJK
/// ideographs and fullwidth digits.
static DISALLOWED_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^A-Za-z0-9_\x{3041}-\x{309F}\x{30A1}-\x{30FC}\x{4E00}-\x{9FAF}\x{FF10}-\x{FF19}]")
        .expect("disallowed-character pattern is valid")
});

/// Derive the artifact filename for a line of text.
///
/// Deterministic and infallible. Distinct texts that sanitize and truncate
/// to the same prefix share a key, and therefore share an artifact.
pub fn cache_key(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let underscored = WHITESPACE_PATTERN.replace_all(&lowered, "_");
    let sanitized = DISALLOWED_PATTERN.replace_all(&underscored, "");

    let mut key: String = sanitized.chars().take(MAX_KEY_CHARS).collect();
    key.push_str(AUDIO_EXTENSION);
    key
}
