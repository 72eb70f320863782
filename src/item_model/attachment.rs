//! File attachments and their kinds

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::save_engine::{SaveError, SaveResult};
use crate::utils::{PRIMARY_ATTACHMENT_TYPES, random_id};

/// How an attachment is stored by the destination
///
/// Derived from the translator's loosely-typed fields once, then matched
/// exhaustively by every save step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    /// Only the URL is stored, no bytes are ever fetched
    Linked,
    /// A downloaded copy of a binary file (PDF, EPUB, ...)
    Imported,
    /// A captured copy of an HTML page
    Snapshot,
}

/// Wire value of an attachment's `linkMode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    LinkedUrl,
    ImportedUrl,
}

impl From<AttachmentKind> for LinkMode {
    fn from(kind: AttachmentKind) -> Self {
        match kind {
            AttachmentKind::Linked => Self::LinkedUrl,
            AttachmentKind::Imported | AttachmentKind::Snapshot => Self::ImportedUrl,
        }
    }
}

/// Progress as reported by the desktop client: a percentage or `false` for failure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressValue {
    Percent(f64),
    Flag(bool),
}

/// A file associated with an item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// `Some(false)` asks for a link instead of a stored copy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_mode: Option<LinkMode>,
    /// Last progress reported by the desktop client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressValue>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_primary: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_open_access: bool,
    /// Set when the snapshot bytes travel through the single-file side channel
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub single_file: bool,
    /// Charset of the payload, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    /// Key of the attachment resource on the hosted API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    data: Option<Vec<u8>>,
}

impl Attachment {
    pub fn new(url: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            mime_type: Some(mime_type.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Mark the attachment as link-only
    #[must_use]
    pub fn linked(mut self) -> Self {
        self.snapshot = Some(false);
        self
    }

    /// Lowercased MIME type, if known
    #[must_use]
    pub fn mime(&self) -> Option<String> {
        self.mime_type
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_ascii_lowercase)
    }

    /// Whether the MIME type denotes an HTML page
    #[must_use]
    pub fn is_html(&self) -> bool {
        matches!(
            self.mime().as_deref(),
            Some("text/html" | "application/xhtml+xml")
        )
    }

    /// Whether the MIME type denotes a primary full-text file
    #[must_use]
    pub fn is_primary_type(&self) -> bool {
        self.mime()
            .is_some_and(|m| PRIMARY_ATTACHMENT_TYPES.contains(&m.as_str()))
    }

    #[must_use]
    pub fn kind(&self) -> AttachmentKind {
        if self.snapshot == Some(false) || self.link_mode == Some(LinkMode::LinkedUrl) {
            AttachmentKind::Linked
        } else if self.is_html() {
            AttachmentKind::Snapshot
        } else {
            AttachmentKind::Imported
        }
    }

    /// Assign a random identifier if missing, returning it
    pub fn ensure_id(&mut self) -> &str {
        self.id.get_or_insert_with(random_id)
    }

    /// Identifier for logging and callback bookkeeping
    #[must_use]
    pub fn label(&self) -> &str {
        self.id
            .as_deref()
            .or(self.url.as_deref())
            .or(self.title.as_deref())
            .unwrap_or("<unnamed attachment>")
    }

    #[must_use]
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Store the attachment's bytes
    ///
    /// # Errors
    ///
    /// Linked attachments never carry a payload.
    pub fn set_data(&mut self, bytes: Vec<u8>) -> SaveResult<()> {
        if self.kind() == AttachmentKind::Linked {
            return Err(SaveError::InvalidAttachment(format!(
                "linked attachment {} cannot carry a payload",
                self.label()
            )));
        }
        self.data = Some(bytes);
        Ok(())
    }

    pub fn take_data(&mut self) -> Option<Vec<u8>> {
        self.data.take()
    }

    /// Turn the attachment into a link, dropping any payload
    pub fn convert_to_link(&mut self) {
        self.link_mode = Some(LinkMode::LinkedUrl);
        self.data = None;
    }
}
