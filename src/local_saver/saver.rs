//! `SaveDestination` backed by the desktop application

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, info};

use super::polling::poll_progress;
use super::prepare::{payload_items, prepare_items};
use super::snapshot::save_snapshot;
use super::upload::save_attachments;
use crate::attachment_fetcher::{AttachmentFetcher, FetchMethod};
use crate::config::SaveConfig;
use crate::connector::{AttachmentMetadata, ConnectorClient, SaveItemsRequest};
use crate::item_model::{Attachment, Item};
use crate::save_context::SaveContext;
use crate::save_engine::{
    DestinationCapabilities, SaveDestination, SaveError, SaveOutcome, SaveResult, Session,
};
use crate::save_progress::AttachmentProgress;
use crate::utils::{DEFAULT_CONTENT_TYPE, encode_rfc2047};

/// Saves items through the desktop application's connector server
pub struct LocalClientSaver {
    config: Arc<SaveConfig>,
    context: SaveContext,
    connector: ConnectorClient,
    fetcher: Arc<AttachmentFetcher>,
}

impl LocalClientSaver {
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(
        config: Arc<SaveConfig>,
        context: SaveContext,
        fetcher: Arc<AttachmentFetcher>,
    ) -> SaveResult<Self> {
        Ok(Self {
            connector: ConnectorClient::new(&config)?,
            config,
            context,
            fetcher,
        })
    }

    pub(crate) fn connector(&self) -> &ConnectorClient {
        &self.connector
    }

    pub(crate) fn fetcher(&self) -> &AttachmentFetcher {
        &self.fetcher
    }

    pub(crate) fn context(&self) -> &SaveContext {
        &self.context
    }

    /// Query the destination's preferences and, when it accepts uploads,
    /// whether its selected collection accepts files
    ///
    /// # Errors
    ///
    /// [`SaveError::Unreachable`] when the application is not running.
    pub async fn resolve_capabilities(&self) -> SaveResult<DestinationCapabilities> {
        let mut caps = self.connector.ping().await?;
        if caps.supports_attachment_upload {
            caps.files_editable = self.connector.selected_collection().await?.files_editable;
        }
        debug!("Destination capabilities: {caps:?}");
        Ok(caps)
    }

    /// Save `items` in `session`
    ///
    /// # Errors
    ///
    /// [`SaveError::Unreachable`] when the application cannot be contacted,
    /// any other error when it refused the items.
    pub async fn save_items(&self, items: Vec<Item>, session: &Session) -> SaveResult<SaveOutcome> {
        info!("Saving {} items to the desktop application", items.len());
        let caps = self.resolve_capabilities().await?;

        let prepared = prepare_items(items, &caps, &self.context);
        let snapshot = prepared.snapshot().map(|(_, a)| a.clone());
        let mut items = prepared.items;

        let request = SaveItemsRequest {
            session_id: session.id().to_string(),
            uri: self.context.page_url().to_string(),
            items: payload_items(&items, caps.supports_attachment_upload),
            proxy: self.context.proxy().map(|p| p.descriptor()),
            cookie: self.context.cookies().cookie_header(self.context.page_url()),
            // Uploading destinations get the snapshot without this flag
            single_file: snapshot.is_some() && !caps.supports_attachment_upload,
            incognito: self.context.is_incognito(),
        };
        let response = self.connector.save_items(&request).await?;
        debug!("saveItems accepted for session {}", session.id());

        if caps.supports_attachment_upload {
            if caps.files_editable {
                // Uploads mutate items while the snapshot request reads them
                let snapshot_items = items.clone();
                let snapshot_task = async {
                    if let Some(snapshot) = &snapshot {
                        save_snapshot(&self.connector, &self.context, session, &snapshot_items, snapshot)
                            .await;
                    }
                };
                tokio::join!(
                    save_attachments(self, &mut items, session, &caps),
                    snapshot_task
                );
            } else {
                info!("Selected collection does not accept files, skipping attachments");
            }
        } else {
            if response.items.len() == items.len() {
                items = merge_saved(items, response.items);
            }
            let snapshot_task = async {
                if let Some(snapshot) = &snapshot {
                    save_snapshot(&self.connector, &self.context, session, &items, snapshot).await;
                }
            };
            tokio::join!(
                poll_progress(&self.connector, &self.config, session, &items),
                snapshot_task
            );
        }

        let done = items.iter().map(Item::without_attachments).collect();
        Ok(SaveOutcome { items, done })
    }

    /// Upload an attachment that belongs to no item
    ///
    /// # Errors
    ///
    /// Fails when the application cannot be contacted, does not accept
    /// uploads, or the attachment cannot be fetched.
    pub async fn save_standalone_attachment(
        &self,
        mut attachment: Attachment,
        session: &Session,
    ) -> SaveResult<Attachment> {
        let caps = self.resolve_capabilities().await?;
        if !caps.supports_attachment_upload {
            return Err(SaveError::rejected(
                400,
                "Desktop application does not accept attachment uploads",
            ));
        }
        attachment.ensure_id();
        session.progress().report(&attachment, AttachmentProgress::Percent(0));

        let result = async {
            let fetched = self
                .fetcher
                .fetch(&attachment, &self.context, FetchMethod::Get)
                .await?;
            let metadata = AttachmentMetadata {
                id: attachment.label().to_string(),
                url: fetched.final_url.clone(),
                content_type: fetched
                    .content_type
                    .clone()
                    .or_else(|| attachment.mime())
                    .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
                parent_item_id: None,
                title: encode_rfc2047(attachment.title.as_deref().unwrap_or_default()),
            };
            self.connector
                .save_standalone_attachment(session.id(), &metadata, fetched.bytes)
                .await
        }
        .await;

        match result {
            Ok(()) => {
                session.progress().done(&attachment);
                Ok(attachment)
            }
            Err(e) => {
                session.progress().fail(&attachment, &e);
                Err(e)
            }
        }
    }
}

/// Take the application's view of each item, keeping the snapshot it never saw
///
/// Both lists are in submission order.
fn merge_saved(prepared: Vec<Item>, saved: Vec<Item>) -> Vec<Item> {
    saved
        .into_iter()
        .zip(prepared)
        .map(|(mut saved, prepared)| {
            if saved.id.is_none() {
                saved.id = prepared.id;
            }
            saved
                .attachments
                .extend(prepared.attachments.into_iter().filter(|a| a.single_file));
            saved
        })
        .collect()
}

impl SaveDestination for LocalClientSaver {
    fn name(&self) -> &'static str {
        "desktop application"
    }

    fn try_save<'a>(
        &'a self,
        items: Vec<Item>,
        session: &'a Session,
    ) -> BoxFuture<'a, SaveResult<SaveOutcome>> {
        Box::pin(self.save_items(items, session))
    }
}
