//! Normalization of raw model output that is supposed to contain one JSON
//! object. The upstream model can emit malformed or truncated text (token
//! limits, rate limiting mid-generation); callers always get a tagged
//! result they can turn into a well-shaped payload instead of an error.

use serde_json::Value as JsonValue;

/// Maximum number of characters of raw model output quoted back to the
/// caller inside fallback messages.
pub const RAW_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedJson {
    /// Strict parse succeeded and the expected shape is present.
    Parsed(JsonValue),
    /// Valid JSON, but not the shape the caller asked for.
    WrongShape { preview: String },
    /// Not valid JSON at all.
    Unparsable { preview: String },
}

/// Trim, strictly parse, and shape-check one JSON object.
pub fn normalize<F>(raw: &str, shape_ok: F) -> NormalizedJson where F: Fn(&JsonValue) -> bool {
    let trimmed = raw.trim();
    match serde_json::from_str::<JsonValue>(trimmed) {
        Ok(value) if shape_ok(&value) => NormalizedJson::Parsed(value),
        Ok(_) => NormalizedJson::WrongShape { preview: preview(trimmed) },
        Err(_) => NormalizedJson::Unparsable { preview: preview(trimmed) },
    }
}

/// Bounded, char-boundary-safe preview of raw model output. Plain
/// truncation; callers that quote the preview add their own ellipsis.
pub fn preview(raw: &str) -> String {
    raw.chars().take(RAW_PREVIEW_CHARS).collect()
}
