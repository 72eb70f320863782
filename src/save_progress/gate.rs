//! Per-attachment ordering of progress reports

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::sinks::{AttachmentProgress, AttachmentProgressSink};
use crate::item_model::Attachment;

#[derive(Debug, Clone, Copy, Default)]
struct Reported {
    last: Option<u8>,
    terminal: bool,
}

/// Forwards progress to a sink while enforcing, per attachment, that
/// percentages never decrease and at most one terminal report is delivered
///
/// Reports that would break the sequence are dropped. Repeats of the current
/// percentage are delivered. Attachments are keyed by identifier, so ids must
/// be assigned before the first report.
pub struct ProgressGate {
    sink: Arc<dyn AttachmentProgressSink>,
    reported: Mutex<HashMap<String, Reported>>,
}

impl ProgressGate {
    pub fn new(sink: Arc<dyn AttachmentProgressSink>) -> Self {
        Self {
            sink,
            reported: Mutex::new(HashMap::new()),
        }
    }

    /// Report `progress` for `attachment`, returning whether it was delivered
    pub fn report(&self, attachment: &Attachment, progress: AttachmentProgress) -> bool {
        let progress = match progress {
            AttachmentProgress::Percent(p) => AttachmentProgress::Percent(p.min(100)),
            failed => failed,
        };

        {
            let mut reported = self.reported.lock();
            let entry = reported.entry(attachment.label().to_string()).or_default();
            if entry.terminal {
                debug!(
                    "Dropping {progress:?} for {}: already terminal",
                    attachment.label()
                );
                return false;
            }
            match &progress {
                AttachmentProgress::Percent(p) => {
                    if entry.last.is_some_and(|last| *p < last) {
                        return false;
                    }
                    entry.last = Some(*p);
                    entry.terminal = *p == 100;
                }
                AttachmentProgress::Failed(_) => entry.terminal = true,
            }
        }

        // Sink runs outside the lock so it may report again
        self.sink.on_progress(attachment, &progress);
        true
    }

    pub fn done(&self, attachment: &Attachment) -> bool {
        self.report(attachment, AttachmentProgress::DONE)
    }

    pub fn fail(&self, attachment: &Attachment, reason: impl ToString) -> bool {
        self.report(attachment, AttachmentProgress::failed(reason))
    }

    /// Whether a terminal report was already delivered for `attachment`
    #[must_use]
    pub fn is_terminal(&self, attachment: &Attachment) -> bool {
        self.reported
            .lock()
            .get(attachment.label())
            .is_some_and(|r| r.terminal)
    }
}
