use std::borrow::Cow;

use axum::http::{HeaderMap, header};

pub fn get_header(headers: &HeaderMap, key: impl header::AsHeaderName) -> Option<String> {
    if let Some(header) = headers.get(key) {
        if let Ok(header) = header.to_str() {
            return Some(header.to_string());
        }
    }
    None
}

pub fn get_ua(headers: &HeaderMap) -> String {
    match get_header(headers, header::USER_AGENT) {
        Some(ua) => ua,
        None => "-".to_string(),
    }
}

/// Cuts `text` to at most `max` characters, marking the cut with `...`.
pub fn abbreviate(text: &str, max: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max) {
        Some((idx, _)) => Cow::Owned(format!("{}...", &text[..idx])),
        None => Cow::Borrowed(text),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn ua_defaults_to_dash() {
        let mut headers = HeaderMap::new();
        assert_eq!(get_ua(&headers), "-");
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8.0"));
        assert_eq!(get_ua(&headers), "curl/8.0");
    }

    #[test]
    fn abbreviate_respects_char_boundaries() {
        assert_eq!(abbreviate("short", 10), "short");
        assert_eq!(abbreviate("abcdef", 3), "abc...");
        assert_eq!(abbreviate("äöüß", 2), "äö...");
    }
}
