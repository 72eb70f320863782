//! `Content-Type` header parsing

use once_cell::sync::Lazy;
use regex::Regex;

// RFC 2616 media type: token "/" token
static MEDIA_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([!#$%&'*+.^_`|~0-9A-Za-z-]+/[!#$%&'*+.^_`|~0-9A-Za-z-]+)")
        .expect("Invalid media type regex")
});

static CHARSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)charset\s*=\s*["']?([^;"'\s]+)"#)
        .expect("Invalid charset regex")
});

/// Media type and charset of a response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentType {
    /// Lowercased `type/subtype`
    pub mime: Option<String>,
    pub charset: Option<String>,
}

/// Parse a `Content-Type` header value
#[must_use]
pub fn parse_content_type(header: Option<&str>) -> ContentType {
    let Some(header) = header else {
        return ContentType::default();
    };
    ContentType {
        mime: MEDIA_TYPE
            .captures(header)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_ascii_lowercase()),
        charset: CHARSET
            .captures(header)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string()),
    }
}
