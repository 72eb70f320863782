//! Identifier generation and header-safe string encoding.

use base64::Engine;
use rand::Rng;
use rand::distr::Alphanumeric;

use super::constants::GENERATED_ID_LENGTH;

/// Random alphanumeric identifier for items and attachments that arrive without one
#[must_use]
pub fn random_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_ID_LENGTH)
        .map(char::from)
        .collect()
}

/// Encode a header value as an RFC 2047 encoded-word when it is not plain ASCII.
///
/// HTTP header values must be ASCII, but attachment titles routinely are not.
/// ASCII input is returned unchanged; anything else becomes
/// `=?UTF-8?B?<base64>?=`.
#[must_use]
pub fn encode_rfc2047(value: &str) -> String {
    if value.is_ascii() && !value.contains("=?") {
        return value.to_string();
    }
    let encoded = base64::engine::general_purpose::STANDARD.encode(value.as_bytes());
    format!("=?UTF-8?B?{encoded}?=")
}
