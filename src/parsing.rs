//! Pulls structured payloads out of free-form model output.

use serde::de::DeserializeOwned;

/// Returns the slice from the first `open` to the last `close`, inclusive.
///
/// Models often wrap JSON in prose or code fences; the outermost bracket
/// pair is taken as the payload. `None` when either bracket is missing or
/// they are out of order.
pub fn extract_bracketed_json(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end < start {
        return None;
    }
    Some(&text[start..end + close.len_utf8()])
}

/// Extracts the outermost `open`..`close` payload and deserializes it strictly.
pub fn parse_bracketed<T: DeserializeOwned>(
    text: &str,
    open: char,
    close: char,
) -> anyhow::Result<T> {
    let payload = extract_bracketed_json(text, open, close).ok_or_else(|| {
        anyhow::anyhow!("No {}...{} payload found in model response", open, close)
    })?;
    Ok(serde_json::from_str(payload)?)
}
