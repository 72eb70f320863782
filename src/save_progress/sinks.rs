//! Sink traits invoked by the savers

use crate::item_model::{Attachment, Item};

/// Progress of a single attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentProgress {
    /// Percentage in `0..=100`; 100 means saved
    Percent(u8),
    /// Saving failed with the given reason
    Failed(String),
}

impl AttachmentProgress {
    pub const DONE: Self = Self::Percent(100);

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Percent(100) | Self::Failed(_))
    }

    pub(crate) fn failed(reason: impl ToString) -> Self {
        Self::Failed(reason.to_string())
    }
}

/// Receives attachment progress reports
///
/// Implementations can forward to a channel, a UI or a log. Closures of the
/// right shape implement the trait directly.
pub trait AttachmentProgressSink: Send + Sync {
    fn on_progress(&self, attachment: &Attachment, progress: &AttachmentProgress);
}

impl<F> AttachmentProgressSink for F
where
    F: Fn(&Attachment, &AttachmentProgress) + Send + Sync,
{
    fn on_progress(&self, attachment: &Attachment, progress: &AttachmentProgress) {
        self(attachment, progress);
    }
}

/// Receives the saved items once a session completed
pub trait ItemsDoneSink: Send + Sync {
    fn on_items_done(&self, items: &[Item]);
}

impl<F> ItemsDoneSink for F
where
    F: Fn(&[Item]) + Send + Sync,
{
    fn on_items_done(&self, items: &[Item]) {
        self(items);
    }
}

/// Sink that ignores everything
#[derive(Debug, Clone, Copy)]
pub struct NoOpProgress;

impl AttachmentProgressSink for NoOpProgress {
    #[inline(always)]
    fn on_progress(&self, _attachment: &Attachment, _progress: &AttachmentProgress) {}
}

impl ItemsDoneSink for NoOpProgress {
    #[inline(always)]
    fn on_items_done(&self, _items: &[Item]) {}
}
