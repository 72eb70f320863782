//! Shared fixtures for the citesave integration tests

use std::sync::Arc;

use citesave::{Attachment, AttachmentProgress, AttachmentProgressSink, Item, ItemsDoneSink, SaveConfig};
use parking_lot::Mutex;

/// Records every progress report as `(attachment label, progress)`
#[derive(Default)]
pub struct RecordingSink {
    pub reports: Mutex<Vec<(String, AttachmentProgress)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[allow(dead_code)]
    pub fn for_attachment(&self, label: &str) -> Vec<AttachmentProgress> {
        self.reports
            .lock()
            .iter()
            .filter(|(l, _)| l == label)
            .map(|(_, p)| p.clone())
            .collect()
    }

    #[allow(dead_code)]
    pub fn all(&self) -> Vec<(String, AttachmentProgress)> {
        self.reports.lock().clone()
    }
}

impl AttachmentProgressSink for RecordingSink {
    fn on_progress(&self, attachment: &Attachment, progress: &AttachmentProgress) {
        self.reports
            .lock()
            .push((attachment.label().to_string(), progress.clone()));
    }
}

/// Records each items-done call
#[derive(Default)]
pub struct DoneRecorder {
    pub calls: Mutex<Vec<Vec<Item>>>,
}

impl DoneRecorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl ItemsDoneSink for DoneRecorder {
    fn on_items_done(&self, items: &[Item]) {
        self.calls.lock().push(items.to_vec());
    }
}

/// Fast-polling configuration against local mock servers, bypass disabled
#[allow(dead_code)]
pub fn test_config(connector_url: &str, api_url: &str) -> SaveConfig {
    SaveConfig::builder()
        .connector_url(connector_url)
        .api_url(api_url)
        .poll_interval_ms(10)
        .max_polls(5)
        .attachment_timeout_secs(5)
        .connector_timeout_secs(5)
        .bot_bypass_enabled(false)
        .build()
        .expect("test config is valid")
}

/// Loopback address nothing listens on
#[allow(dead_code)]
pub const CLOSED_PORT_URL: &str = "http://127.0.0.1:9/";

#[allow(dead_code)]
pub fn journal_article(pdf_url: &str) -> Item {
    Item::new("journalArticle")
        .with_title("T")
        .with_attachment(Attachment::new(pdf_url, "application/pdf"))
}

/// Route crate logs to the test output; `RUST_LOG` selects the level
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("citesave=debug")),
        )
        .with_test_writer()
        .try_init();
}
