//! Per-attachment pipeline of the hosted API path

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::filename::attachment_filename;
use super::html_snapshot::rewrite_snapshot;
use super::saver::CloudServerSaver;
use crate::attachment_fetcher::{FetchMethod, FetchedAttachment};
use crate::cloud_api::{AttachmentUpload, UploadProgress};
use crate::config::SaveConfig;
use crate::content_hash::md5_hex;
use crate::item_model::{Attachment, AttachmentKind, LinkMode};
use crate::save_engine::{SaveError, SaveResult, Session};
use crate::save_progress::{AttachmentCallback, AttachmentProgress};
use crate::utils::DEFAULT_CONTENT_TYPE;

/// Whether the account preferences allow saving `attachment`
pub(crate) fn passes_preferences(attachment: &Attachment, config: &SaveConfig) -> bool {
    match attachment.kind() {
        AttachmentKind::Linked => true,
        AttachmentKind::Snapshot => config.automatic_snapshots(),
        AttachmentKind::Imported => config.download_associated_files(),
    }
}

/// Save every attachment of one created item concurrently
///
/// Each failure is reported on its own attachment; the batch fails once all
/// attachments have settled if any of them failed.
pub(crate) async fn save_item_attachments(
    saver: &CloudServerSaver,
    item_key: &str,
    base_name: &str,
    attachments: &mut [Attachment],
    session: &Session,
) -> SaveResult<()> {
    let results = join_all(attachments.iter_mut().map(|attachment| async move {
        let result = save_attachment(saver, item_key, base_name, attachment, session).await;
        match &result {
            Ok(()) => {
                session.progress().done(attachment);
            }
            Err(e) => {
                warn!("Attachment {} failed: {e}", attachment.label());
                session.progress().fail(attachment, e);
            }
        }
        result
    }))
    .await;

    let mut failed: Vec<SaveError> = results.into_iter().filter_map(Result::err).collect();
    match failed.len() {
        0 => Ok(()),
        1 => Err(failed.remove(0)),
        n => Err(SaveError::Other(format!(
            "{n} attachments of item {item_key} failed, first: {}",
            failed[0]
        ))),
    }
}

async fn save_attachment(
    saver: &CloudServerSaver,
    item_key: &str,
    base_name: &str,
    attachment: &mut Attachment,
    session: &Session,
) -> SaveResult<()> {
    attachment.parent_item = Some(item_key.to_string());

    let known_link = attachment.kind() == AttachmentKind::Linked && attachment.mime().is_some();
    if known_link {
        attachment.convert_to_link();
    } else {
        load_attachment(saver, attachment).await?;
    }

    attachment.filename = Some(attachment_filename(base_name, attachment));
    let kind = attachment.kind();
    attachment.link_mode = Some(LinkMode::from(kind));

    let mut placeholder = attachment.clone();
    if let Some(url) = attachment.url.as_deref() {
        placeholder.url = Some(saver.context().deproxify(url));
    }
    let key = saver.api().create_attachment_item(item_key, &placeholder).await?;
    attachment.key = Some(key.clone());
    session.progress().report(attachment, AttachmentProgress::Percent(50));

    if kind == AttachmentKind::Linked {
        debug!("Attachment {} saved as a link", attachment.label());
        return Ok(());
    }

    let mut data = attachment
        .take_data()
        .ok_or_else(|| SaveError::InvalidAttachment(format!("{} has no content", attachment.label())))?;
    let mime_type = attachment
        .mime()
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
    if kind == AttachmentKind::Snapshot {
        let source = attachment.url.clone().unwrap_or_default();
        data = rewrite_snapshot(&data, attachment.charset.as_deref(), &mime_type, &source)?;
        attachment.charset = Some("UTF-8".to_string());
    }

    let id = attachment.ensure_id().to_string();
    let upload = AttachmentUpload {
        id: id.clone(),
        md5: md5_hex(&data),
        data,
        filename: attachment.filename.clone().unwrap_or_default(),
        key,
        mime_type,
        charset: attachment.charset.clone(),
    };

    let relay: AttachmentCallback = {
        let gate = Arc::clone(session.progress());
        let attachment = attachment.clone();
        Arc::new(move |progress| {
            gate.report(&attachment, progress);
        })
    };
    session.callbacks().register(id.clone(), relay);
    let progress: UploadProgress = {
        let callbacks = Arc::clone(session.callbacks());
        let id = id.clone();
        Arc::new(move |percent| {
            callbacks.dispatch(&id, AttachmentProgress::Percent(percent));
        })
    };

    let result = saver.api().upload_attachment(upload, progress).await;
    session.callbacks().remove(&id);
    result
}

/// Fetch the attachment's bytes (or only its headers for a link) and record
/// the observed type
///
/// A link-only attachment, or one whose origin could not be reached, falls
/// back to a linked URL instead of failing.
async fn load_attachment(saver: &CloudServerSaver, attachment: &mut Attachment) -> SaveResult<()> {
    let link_only = attachment.kind() == AttachmentKind::Linked;
    let method = if link_only { FetchMethod::Head } else { FetchMethod::Get };

    let fetched = match capture_page(saver, attachment).await {
        Some(captured) => captured,
        None => saver.fetcher().fetch(attachment, saver.context(), method).await,
    };

    match fetched {
        Ok(fetched) => {
            if let Some(content_type) = fetched.content_type {
                attachment.mime_type = Some(content_type);
            }
            attachment.charset = fetched.charset;
            if link_only {
                attachment.convert_to_link();
            } else {
                attachment.set_data(fetched.bytes)?;
            }
            Ok(())
        }
        Err(e) if link_only || e.is_network() => {
            info!("Saving {} as a link: {e}", attachment.label());
            attachment.convert_to_link();
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Snapshot of the current page through the capture service, if this is one
async fn capture_page(
    saver: &CloudServerSaver,
    attachment: &Attachment,
) -> Option<SaveResult<FetchedAttachment>> {
    if attachment.kind() != AttachmentKind::Snapshot {
        return None;
    }
    let url = attachment.url.as_deref()?;
    if url != saver.context().page_url() {
        return None;
    }
    let capture = saver.context().capture()?;
    debug!("Capturing current page for snapshot {}", attachment.label());
    Some(capture.capture().await.map(|bytes| FetchedAttachment {
        bytes,
        content_type: attachment.mime(),
        charset: Some("UTF-8".to_string()),
        final_url: url.to_string(),
        status: 200,
    }))
}
