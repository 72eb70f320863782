//! Open-access lookup for items saved without a primary attachment

use tracing::{debug, info};

use crate::connector::{ConnectorClient, OaAttachmentRequest};
use crate::item_model::{Attachment, Item};
use crate::save_engine::{SaveResult, Session};
use crate::save_progress::AttachmentProgress;
use crate::utils::{FULL_TEXT_PDF_TITLE, OA_NOT_FOUND_TITLE, OA_SEARCHING_TITLE, random_id};

/// Ask the application for an open-access copy of `item`'s full text
///
/// The item's failed primary attachment, or a new placeholder, carries
/// "searching" while the lookup runs and ends done or failed.
pub(crate) async fn save_from_resolver(connector: &ConnectorClient, session: &Session, item: &mut Item) {
    let Some(item_id) = item.id.clone() else {
        return;
    };
    let idx = match item.attachments.iter().position(|a| a.is_primary) {
        Some(idx) => idx,
        None => {
            let mut placeholder = Attachment::default().with_id(random_id());
            placeholder.mime_type = Some("application/pdf".to_string());
            placeholder.parent_item = Some(item_id.clone());
            placeholder.is_primary = true;
            placeholder.is_open_access = true;
            item.attachments.push(placeholder);
            item.attachments.len() - 1
        }
    };
    let attachment = &mut item.attachments[idx];
    attachment.title = Some(OA_SEARCHING_TITLE.to_string());
    session.progress().report(attachment, AttachmentProgress::Percent(0));

    let request = OaAttachmentRequest {
        session_id: session.id().to_string(),
        item_id,
    };
    match lookup(connector, &request).await {
        Ok(Some(title)) => {
            info!("Saved open-access attachment for item {}", request.item_id);
            attachment.title = Some(title);
            attachment.is_open_access = true;
            session.progress().done(attachment);
        }
        Ok(None) => {
            debug!("No open-access copy for item {}", request.item_id);
            attachment.title = Some(OA_NOT_FOUND_TITLE.to_string());
            session.progress().fail(attachment, OA_NOT_FOUND_TITLE);
        }
        Err(e) => {
            session.progress().fail(attachment, e);
        }
    }
}

async fn lookup(connector: &ConnectorClient, request: &OaAttachmentRequest) -> SaveResult<Option<String>> {
    if !connector.has_oa_attachments(request).await? {
        return Ok(None);
    }
    let title = connector.save_oa_attachment(request).await?;
    Ok(Some(title.unwrap_or_else(|| FULL_TEXT_PDF_TITLE.to_string())))
}
