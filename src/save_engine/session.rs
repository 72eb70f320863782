//! Per-save session state

use std::sync::Arc;

use serde::Deserialize;

use crate::save_progress::{AttachmentCallbackRegistry, AttachmentProgressSink, ProgressGate};

/// Destination capabilities, resolved once per session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DestinationCapabilities {
    /// The destination accepts attachment bytes pushed by this crate
    /// instead of fetching them itself
    pub supports_attachment_upload: bool,
    pub automatic_snapshots: bool,
    pub download_associated_files: bool,
    /// The destination's selected collection accepts files
    #[serde(skip)]
    pub files_editable: bool,
}

impl Default for DestinationCapabilities {
    fn default() -> Self {
        Self {
            supports_attachment_upload: false,
            automatic_snapshots: true,
            download_associated_files: true,
            files_editable: true,
        }
    }
}

/// One save operation
///
/// Correlates progress reports for a caller-supplied session id. The progress
/// gate and the callback registry live here so no state outlives the save.
pub struct Session {
    id: String,
    progress: Arc<ProgressGate>,
    callbacks: Arc<AttachmentCallbackRegistry>,
}

impl Session {
    pub fn new(id: impl Into<String>, sink: Arc<dyn AttachmentProgressSink>) -> Self {
        Self {
            id: id.into(),
            progress: Arc::new(ProgressGate::new(sink)),
            callbacks: Arc::new(AttachmentCallbackRegistry::default()),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Ordered, deduplicated progress reporting for this session
    #[must_use]
    pub fn progress(&self) -> &Arc<ProgressGate> {
        &self.progress
    }

    #[must_use]
    pub fn callbacks(&self) -> &Arc<AttachmentCallbackRegistry> {
        &self.callbacks
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("pending_callbacks", &self.callbacks.len())
            .finish()
    }
}
