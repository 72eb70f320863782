//! Core types for save operations
//!
//! Holds the error taxonomy shared by both destinations, the outcome of a
//! destination attempt and the `SaveDestination` capability itself.

use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

use super::session::Session;
use crate::item_model::Item;

/// Error type for save operations
#[derive(Debug, Clone, Error)]
pub enum SaveError {
    /// Destination could not be contacted at all
    #[error("Destination unreachable: {0}")]
    Unreachable(String),

    /// Destination was reached but refused the request
    #[error("Destination rejected request ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
        value: Option<Value>,
    },

    #[error("Attachment MIME type {actual} does not match specified type {expected}")]
    AttachmentMismatch { actual: String, expected: String },

    /// Every bypass strategy failed for a blocked download
    #[error("Download of {url} blocked: {cause}")]
    BotBlocked { url: String, cause: Box<SaveError> },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Save error: {0}")]
    Other(String),
}

impl SaveError {
    /// Whether the destination could not be contacted, the only condition
    /// under which the coordinator tries the next destination
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }

    /// Whether the failure happened before any response was received
    #[must_use]
    pub fn is_network(&self) -> bool {
        match self {
            Self::Unreachable(_) | Self::Network(_) | Self::Timeout(_) => true,
            Self::BotBlocked { cause, .. } => cause.is_network(),
            _ => false,
        }
    }

    /// HTTP status carried by the error, if any
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } | Self::Http { status, .. } => Some(*status),
            Self::Unreachable(_) => Some(0),
            _ => None,
        }
    }

    pub(crate) fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
            value: None,
        }
    }
}

impl From<reqwest::Error> for SaveError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
                url: err.url().map(ToString::to_string).unwrap_or_default(),
            }
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SaveError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

impl From<anyhow::Error> for SaveError {
    fn from(err: anyhow::Error) -> Self {
        // {:#} keeps the context chain
        Self::Other(format!("{err:#}"))
    }
}

/// Convenience alias for Result with `SaveError`
pub type SaveResult<T> = Result<T, SaveError>;

/// Result of a successful destination attempt
#[derive(Debug, Clone, Default)]
pub struct SaveOutcome {
    /// Items as saved, returned to the caller of `save_items`
    pub items: Vec<Item>,
    /// Items handed to the items-done callback
    pub done: Vec<Item>,
}

/// A place items can be saved to
///
/// The coordinator is the only code that knows which concrete destination it
/// holds; everything downstream works against this trait.
pub trait SaveDestination: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Save `items` for `session`
    ///
    /// Must fail with [`SaveError::Unreachable`] when, and only when, the
    /// destination could not be contacted.
    fn try_save<'a>(
        &'a self,
        items: Vec<Item>,
        session: &'a Session,
    ) -> BoxFuture<'a, SaveResult<SaveOutcome>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unreachable_triggers_fallback() {
        assert!(SaveError::Unreachable("refused".into()).is_unreachable());
        assert!(!SaveError::rejected(403, "Not authorized").is_unreachable());
        assert!(!SaveError::Timeout("poll".into()).is_unreachable());
        assert!(
            !SaveError::Http {
                status: 500,
                url: "http://127.0.0.1/".into()
            }
            .is_unreachable()
        );
    }

    #[test]
    fn mismatch_message_names_both_types() {
        let err = SaveError::AttachmentMismatch {
            actual: "text/html".into(),
            expected: "application/pdf".into(),
        };
        assert_eq!(
            err.to_string(),
            "Attachment MIME type text/html does not match specified type application/pdf"
        );
    }

    #[test]
    fn bot_blocked_keeps_cause() {
        let err = SaveError::BotBlocked {
            url: "https://www.sciencedirect.com/x.pdf".into(),
            cause: Box::new(SaveError::Network("reset".into())),
        };
        assert!(err.is_network());
        assert!(err.to_string().contains("reset"));
    }

    #[test]
    fn anyhow_chain_is_preserved() {
        let err = anyhow::anyhow!("inner").context("outer");
        let save: SaveError = err.into();
        assert_eq!(save.to_string(), "Save error: outer: inner");
    }
}
