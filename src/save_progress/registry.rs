//! Per-session relay of asynchronous attachment progress

use std::sync::Arc;

use dashmap::DashMap;

use super::sinks::AttachmentProgress;

/// Callback receiving relayed progress for one attachment
pub type AttachmentCallback = Arc<dyn Fn(AttachmentProgress) + Send + Sync>;

/// Map of outstanding attachment callbacks, keyed by attachment id or by the
/// hash of the attachment URL
///
/// Relayed percentages describe the second half of an attachment's save (the
/// upload), so they are mapped onto `50..=100`. An entry is removed once it
/// receives a terminal report.
#[derive(Default)]
pub struct AttachmentCallbackRegistry {
    callbacks: DashMap<String, AttachmentCallback>,
}

impl AttachmentCallbackRegistry {
    pub fn register(&self, key: impl Into<String>, callback: AttachmentCallback) {
        self.callbacks.insert(key.into(), callback);
    }

    /// Relay `progress` to the callback registered under `key`
    ///
    /// Returns false when no callback is registered.
    pub fn dispatch(&self, key: &str, progress: AttachmentProgress) -> bool {
        let mapped = match progress {
            AttachmentProgress::Percent(p) => AttachmentProgress::Percent(50 + p.min(100) / 2),
            failed => failed,
        };
        let terminal = mapped.is_terminal();

        // Clone out of the map so the callback runs without a shard lock held
        let Some(callback) = self.callbacks.get(key).map(|c| Arc::clone(c.value())) else {
            return false;
        };
        if terminal {
            self.callbacks.remove(key);
        }
        callback(mapped);
        true
    }

    pub fn remove(&self, key: &str) {
        self.callbacks.remove(key);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}
