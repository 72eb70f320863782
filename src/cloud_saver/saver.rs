//! `SaveDestination` backed by the hosted REST API

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use super::attachments::{passes_preferences, save_item_attachments};
use super::filename::base_name;
use crate::attachment_fetcher::AttachmentFetcher;
use crate::cloud_api::{CloudApiClient, item_to_api_json};
use crate::config::SaveConfig;
use crate::item_model::Item;
use crate::save_context::SaveContext;
use crate::save_engine::{SaveDestination, SaveOutcome, SaveResult, Session};
use crate::save_progress::AttachmentProgress;

/// Saves items to the user's hosted account
pub struct CloudServerSaver {
    config: Arc<SaveConfig>,
    context: SaveContext,
    api: CloudApiClient,
    fetcher: Arc<AttachmentFetcher>,
}

impl CloudServerSaver {
    /// # Errors
    ///
    /// Returns an error if the API client cannot be built.
    pub fn new(
        config: Arc<SaveConfig>,
        context: SaveContext,
        fetcher: Arc<AttachmentFetcher>,
    ) -> SaveResult<Self> {
        Ok(Self {
            api: CloudApiClient::new(&config)?,
            config,
            context,
            fetcher,
        })
    }

    pub(crate) fn api(&self) -> &CloudApiClient {
        &self.api
    }

    pub(crate) fn fetcher(&self) -> &AttachmentFetcher {
        &self.fetcher
    }

    pub(crate) fn context(&self) -> &SaveContext {
        &self.context
    }

    /// Create `items` in one request, then save their attachments
    ///
    /// # Errors
    ///
    /// `Rejected` when the account is not authorized or refused the items.
    /// Attachment failures are reported through the session only.
    pub async fn save_items(&self, mut items: Vec<Item>, session: &Session) -> SaveResult<SaveOutcome> {
        info!("Saving {} items to the hosted API", items.len());
        for item in &mut items {
            if let Some(url) = item.url.take() {
                item.url = Some(self.context.deproxify(&url));
            }
            item.attachments
                .retain(|a| passes_preferences(a, &self.config));
            for attachment in &mut item.attachments {
                attachment.ensure_id();
            }
        }

        let objects: Vec<_> = items.iter().map(item_to_api_json).collect();
        let created = self.api.create_items(&objects).await?;
        debug!("Hosted API created {} items", created.success.len());

        for attachment in items.iter().flat_map(|i| &i.attachments) {
            session.progress().report(attachment, AttachmentProgress::Percent(0));
        }

        for (index, item) in items.iter_mut().enumerate() {
            let Some(key) = created.key_at(index).map(str::to_string) else {
                warn!("No key returned for item {index}, skipping its attachments");
                for attachment in &item.attachments {
                    session.progress().fail(attachment, "Parent item was not created");
                }
                continue;
            };
            item.key = Some(key.clone());
            if item.attachments.is_empty() {
                continue;
            }
            let base = base_name(item);
            if let Err(e) = save_item_attachments(self, &key, &base, &mut item.attachments, session).await {
                warn!("Attachments of item {key} incomplete: {e}");
            }
        }

        Ok(SaveOutcome {
            done: items.clone(),
            items,
        })
    }
}

impl SaveDestination for CloudServerSaver {
    fn name(&self) -> &'static str {
        "hosted API"
    }

    fn try_save<'a>(
        &'a self,
        items: Vec<Item>,
        session: &'a Session,
    ) -> BoxFuture<'a, SaveResult<SaveOutcome>> {
        Box::pin(self.save_items(items, session))
    }
}
