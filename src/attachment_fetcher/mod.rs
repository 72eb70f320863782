//! Attachment download with content-type verification
//!
//! Direct fetches that look blocked (a mismatched content type, a 403 or a
//! network failure) are handed to the bot-bypass chain when the host is on
//! its allow-list and the caller's context supports it.

pub mod content_type;
pub mod fetcher;

pub use content_type::{ContentType, parse_content_type};
pub use fetcher::{AttachmentFetcher, FetchMethod, FetchedAttachment};
