//! Pushing attachment bytes to a desktop application that accepts uploads

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use super::open_access::save_from_resolver;
use super::saver::LocalClientSaver;
use crate::attachment_fetcher::FetchMethod;
use crate::connector::AttachmentMetadata;
use crate::content_hash::md5_hex;
use crate::item_model::{Attachment, AttachmentKind, Item};
use crate::save_engine::{DestinationCapabilities, SaveError, SaveResult, Session};
use crate::save_progress::{AttachmentCallback, AttachmentProgress};
use crate::utils::{DEFAULT_CONTENT_TYPE, encode_rfc2047};

/// Fetch and upload every attachment of `items`
///
/// Items run concurrently; attachments of one item run in order. A failed
/// primary attachment stays at 0 until the open-access search settles it, and
/// fails with its own error when the search does not replace it.
pub(crate) async fn save_attachments(
    saver: &LocalClientSaver,
    items: &mut [Item],
    session: &Session,
    caps: &DestinationCapabilities,
) {
    join_all(
        items
            .iter_mut()
            .map(|item| save_item_attachments(saver, item, session, caps)),
    )
    .await;
}

async fn save_item_attachments(
    saver: &LocalClientSaver,
    item: &mut Item,
    session: &Session,
    caps: &DestinationCapabilities,
) {
    let gate = session.progress();
    let mut has_primary = false;
    let mut deferred: Vec<(String, String)> = Vec::new();

    for attachment in item.attachments.iter_mut().filter(|a| !a.single_file) {
        match attachment.kind() {
            AttachmentKind::Linked => {
                gate.done(attachment);
                continue;
            }
            AttachmentKind::Imported | AttachmentKind::Snapshot => {
                gate.report(attachment, AttachmentProgress::Percent(0));
            }
        }
        if attachment.is_open_access {
            continue;
        }
        if attachment.is_primary_type() {
            attachment.is_primary = true;
        }

        match upload_attachment(saver, attachment, session).await {
            Ok(()) => {
                has_primary |= attachment.is_primary;
                gate.done(attachment);
            }
            Err(e) if attachment.is_primary && caps.download_associated_files => {
                debug!(
                    "Primary attachment {} failed ({e}), waiting for open-access search",
                    attachment.label()
                );
                deferred.push((attachment.label().to_string(), e.to_string()));
            }
            Err(e) => {
                warn!("Attachment {} failed: {e}", attachment.label());
                gate.fail(attachment, e);
            }
        }
    }

    if !has_primary && caps.download_associated_files && caps.files_editable {
        save_from_resolver(saver.connector(), session, item).await;
    }

    for attachment in item.attachments.iter().filter(|a| !gate.is_terminal(a)) {
        if let Some((_, reason)) = deferred.iter().find(|(label, _)| label == attachment.label()) {
            warn!("Attachment {} failed: {reason}", attachment.label());
            gate.fail(attachment, reason);
        }
    }
}

/// Download one attachment and hand its bytes to the application
///
/// Progress past the download is relayed through the session's callback
/// registry under the hash of the attachment URL, qualified by the attachment
/// id so equal URLs in one session keep separate relays.
async fn upload_attachment(
    saver: &LocalClientSaver,
    attachment: &Attachment,
    session: &Session,
) -> SaveResult<()> {
    let url = attachment
        .url
        .clone()
        .ok_or_else(|| SaveError::InvalidAttachment(format!("{} has no URL", attachment.label())))?;
    let key = relay_key(&url, attachment);
    let relay: AttachmentCallback = {
        let gate = Arc::clone(session.progress());
        let attachment = attachment.clone();
        Arc::new(move |progress| {
            gate.report(&attachment, progress);
        })
    };
    session.callbacks().register(key.clone(), relay);

    let result = async {
        let fetched = saver
            .fetcher()
            .fetch(attachment, saver.context(), FetchMethod::Get)
            .await?;
        session.callbacks().dispatch(&key, AttachmentProgress::Percent(0));

        let metadata = AttachmentMetadata {
            id: attachment.label().to_string(),
            url: fetched.final_url.clone(),
            content_type: fetched
                .content_type
                .clone()
                .or_else(|| attachment.mime())
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            parent_item_id: attachment.parent_item.clone(),
            title: encode_rfc2047(attachment.title.as_deref().unwrap_or_default()),
        };
        saver
            .connector()
            .save_attachment(session.id(), &metadata, fetched.bytes)
            .await
    }
    .await;

    // The caller reports the terminal state
    session.callbacks().remove(&key);
    result
}

fn relay_key(url: &str, attachment: &Attachment) -> String {
    format!("{}:{}", md5_hex(url.as_bytes()), attachment.label())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_keys_differ_for_same_url() {
        let first = Attachment::new("https://x/file.pdf", "application/pdf").with_id("a1");
        let second = Attachment::new("https://x/file.pdf", "application/pdf").with_id("a2");
        let key = relay_key("https://x/file.pdf", &first);
        assert!(key.starts_with(&md5_hex(b"https://x/file.pdf")));
        assert_ne!(key, relay_key("https://x/file.pdf", &second));
    }
}
