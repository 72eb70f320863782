//! Single entry point choosing between the two destinations

use std::sync::Arc;

use tracing::{info, warn};

use super::save_types::{SaveDestination, SaveError, SaveResult};
use super::session::Session;
use crate::attachment_fetcher::AttachmentFetcher;
use crate::cloud_saver::CloudServerSaver;
use crate::config::SaveConfig;
use crate::item_model::{Attachment, Item};
use crate::local_saver::LocalClientSaver;
use crate::save_context::SaveContext;
use crate::save_progress::{AttachmentProgressSink, ItemsDoneSink};

/// Saves items to the desktop application, or to the hosted API when the
/// application cannot be contacted
///
/// The local destination is always attempted to completion first; the hosted
/// API is tried only after it failed with [`SaveError::Unreachable`].
pub struct SaveCoordinator {
    local: Arc<dyn SaveDestination>,
    cloud: Arc<dyn SaveDestination>,
    standalone: Option<Arc<LocalClientSaver>>,
}

impl SaveCoordinator {
    /// Build both destinations for the page described by `context`
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: SaveConfig, context: SaveContext) -> SaveResult<Self> {
        let config = Arc::new(config);
        let fetcher = Arc::new(AttachmentFetcher::new(&config)?);
        let local = Arc::new(LocalClientSaver::new(
            Arc::clone(&config),
            context.clone(),
            Arc::clone(&fetcher),
        )?);
        let cloud = Arc::new(CloudServerSaver::new(config, context, fetcher)?);
        Ok(Self {
            local: Arc::clone(&local) as Arc<dyn SaveDestination>,
            cloud,
            standalone: Some(local),
        })
    }

    /// Coordinator over arbitrary destinations
    ///
    /// Standalone attachments need the desktop application and are refused.
    pub fn with_destinations(local: Arc<dyn SaveDestination>, cloud: Arc<dyn SaveDestination>) -> Self {
        Self {
            local,
            cloud,
            standalone: None,
        }
    }

    /// Save `items` under `session_id`
    ///
    /// Attachment progress goes to `on_progress`; `on_items_done` is called
    /// exactly once on success. Returns the items as saved.
    ///
    /// # Errors
    ///
    /// Any error other than an unreachable desktop application, or the
    /// hosted API's error after falling back.
    pub async fn save_items(
        &self,
        items: Vec<Item>,
        session_id: impl Into<String>,
        on_progress: Arc<dyn AttachmentProgressSink>,
        on_items_done: Arc<dyn ItemsDoneSink>,
    ) -> SaveResult<Vec<Item>> {
        let session = Session::new(session_id, on_progress);
        info!("Session {}: saving {} items", session.id(), items.len());

        let outcome = match self.local.try_save(items.clone(), &session).await {
            Err(e) if e.is_unreachable() => {
                info!(
                    "Session {}: {} unreachable ({e}), falling back to {}",
                    session.id(),
                    self.local.name(),
                    self.cloud.name()
                );
                self.cloud.try_save(items, &session).await
            }
            other => other,
        };

        let outcome = outcome.inspect_err(|e| {
            warn!("Session {} failed: {e}", session.id());
        })?;
        on_items_done.on_items_done(&outcome.done);
        Ok(outcome.items)
    }

    /// Save an attachment that belongs to no item in the desktop application
    ///
    /// # Errors
    ///
    /// Fails when the application is unreachable or refuses uploads, or when
    /// the attachment cannot be fetched.
    pub async fn save_standalone_attachment(
        &self,
        attachment: Attachment,
        session_id: impl Into<String>,
        on_progress: Arc<dyn AttachmentProgressSink>,
    ) -> SaveResult<Attachment> {
        let Some(local) = &self.standalone else {
            return Err(SaveError::rejected(
                400,
                "Standalone attachments require the desktop application",
            ));
        };
        let session = Session::new(session_id, on_progress);
        local.save_standalone_attachment(attachment, &session).await
    }
}
