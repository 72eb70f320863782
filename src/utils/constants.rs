//! Shared configuration constants for citesave
//!
//! Default values and wire-level constants used throughout the codebase,
//! kept here to ensure consistency and avoid magic numbers.

/// Default loopback endpoint of the desktop client's connector server
pub const DEFAULT_CONNECTOR_URL: &str = "http://127.0.0.1:23119/";

/// Default base URL of the hosted REST API
pub const DEFAULT_API_URL: &str = "https://api.zotero.org/";

/// Connector protocol version announced on every RPC call
pub const CONNECTOR_API_VERSION: u32 = 2;

/// Header carrying [`CONNECTOR_API_VERSION`]
pub const CONNECTOR_API_VERSION_HEADER: &str = "X-Zotero-Connector-API-Version";

/// Header carrying this library's version on connector calls
pub const CONNECTOR_CLIENT_VERSION_HEADER: &str = "X-Zotero-Version";

/// Header carrying JSON attachment metadata alongside a raw attachment body
pub const ATTACHMENT_METADATA_HEADER: &str = "X-Metadata";

/// Hosted API version header
pub const API_VERSION_HEADER: &str = "Zotero-API-Version";

/// Hosted API version spoken by the cloud client
pub const API_VERSION: u32 = 3;

/// Default timeout for ordinary connector RPC calls (seconds)
pub const DEFAULT_CONNECTOR_TIMEOUT_SECS: u64 = 15;

/// Timeout for attachment transfers, both downloads and streamed uploads (seconds)
pub const DEFAULT_ATTACHMENT_TIMEOUT_SECS: u64 = 60;

/// Interval between `sessionProgress` polls (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Maximum number of `sessionProgress` polls per session
///
/// Together with [`DEFAULT_POLL_INTERVAL_MS`] this puts a 60 second ceiling
/// on progress polling.
pub const DEFAULT_MAX_POLLS: u32 = 60;

/// Upper bound on waiting for the hidden-frame bypass to observe the real file (seconds)
pub const DEFAULT_HIDDEN_FRAME_TIMEOUT_SECS: u64 = 5;

/// Domains known to put JS challenges in front of file downloads
pub const DEFAULT_BOT_BYPASS_DOMAINS: &[&str] = &["sciencedirect.com"];

/// Size of the visible challenge window (width, height)
pub const DEFAULT_WINDOW_PROMPT_SIZE: (u32, u32) = (900, 700);

/// MIME types that count as a primary (full text) attachment
pub const PRIMARY_ATTACHMENT_TYPES: &[&str] = &["application/pdf", "application/epub+zip"];

/// Fallback content type when a response carries no usable `Content-Type`
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Charset assumed when decoding an HTML snapshot that declared none
pub const DEFAULT_SNAPSHOT_CHARSET: &str = "iso-8859-1";

/// Title given to the synthetic attachment added when saving from a PDF page
pub const FULL_TEXT_PDF_TITLE: &str = "Full Text PDF";

/// Placeholder title while an Open Access lookup is outstanding
pub const OA_SEARCHING_TITLE: &str = "Searching for Open Access files…";

/// Placeholder title after an Open Access lookup came back empty
pub const OA_NOT_FOUND_TITLE: &str = "No Open Access PDFs found";

/// Failure reason reported for outstanding attachments when polling loses the client
pub const LOST_CONNECTION_MESSAGE: &str = "Lost connection to the desktop client";

/// Base filename used when an item has no creators, date or title
pub const DEFAULT_ATTACHMENT_BASENAME: &str = "Attachment";

/// Maximum number of title characters that go into an attachment filename
pub const FILENAME_TITLE_CHARS: usize = 50;

/// Length of generated item and attachment identifiers
pub const GENERATED_ID_LENGTH: usize = 8;

/// Chrome user agent string sent with attachment downloads
///
/// Some publishers serve a challenge page instead of the file to unfamiliar
/// clients, so downloads present themselves as a current desktop browser.
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
