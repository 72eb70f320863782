//! Progress polling for attachments the desktop application saves itself

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::SaveConfig;
use crate::connector::ConnectorClient;
use crate::item_model::{Attachment, Item, ProgressValue};
use crate::save_engine::{SaveError, Session};
use crate::save_progress::AttachmentProgress;
use crate::utils::LOST_CONNECTION_MESSAGE;

/// Translate the client's progress value, `None` meaning nothing to report yet
fn to_progress(attachment: &Attachment, value: Option<ProgressValue>) -> Option<AttachmentProgress> {
    match value? {
        ProgressValue::Percent(p) => {
            // Truncation is fine, the value is clamped to 0..=100 first
            Some(AttachmentProgress::Percent(p.clamp(0.0, 100.0).round() as u8))
        }
        ProgressValue::Flag(true) => Some(AttachmentProgress::DONE),
        ProgressValue::Flag(false) => {
            let reason = attachment
                .extra
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("Attachment could not be saved");
            Some(AttachmentProgress::Failed(reason.to_string()))
        }
    }
}

fn fail_outstanding(session: &Session, outstanding: &[Attachment]) {
    warn!(
        "Lost connection while polling session {}, failing {} attachments",
        session.id(),
        outstanding.len()
    );
    for attachment in outstanding {
        session.progress().fail(attachment, LOST_CONNECTION_MESSAGE);
    }
}

/// Poll `sessionProgress` until the session is done or the poll ceiling is
/// reached, reporting every attachment in every reply
///
/// Attachments may show up in later replies than the first. A transport
/// failure fails every attachment from the last reply (or from `items` before
/// the first reply) and ends polling.
pub(crate) async fn poll_progress(
    connector: &ConnectorClient,
    config: &SaveConfig,
    session: &Session,
    items: &[Item],
) {
    let mut outstanding: Vec<Attachment> = items
        .iter()
        .flat_map(|item| item.attachments.iter())
        .filter(|a| a.id.is_some() && !a.single_file)
        .cloned()
        .collect();

    for poll in 0..config.max_polls() {
        let response = match connector.session_progress(session.id()).await {
            Ok(response) => response,
            Err(SaveError::Rejected { status: 404, .. }) if config.legacy_progress_fallback() => {
                debug!("sessionProgress unsupported, falling back to attachmentProgress");
                poll_legacy(connector, config, session, outstanding, config.max_polls() - poll).await;
                return;
            }
            Err(e) => {
                debug!("sessionProgress failed: {e}");
                fail_outstanding(session, &outstanding);
                return;
            }
        };

        let mut latest = Vec::new();
        for item in response.items {
            for mut attachment in item.attachments {
                attachment.parent_item.clone_from(&item.id);
                if let Some(progress) = to_progress(&attachment, attachment.progress) {
                    session.progress().report(&attachment, progress);
                }
                latest.push(attachment);
            }
        }
        outstanding = latest;

        if response.done {
            debug!("Session {} done after {} polls", session.id(), poll + 1);
            return;
        }
        if poll + 1 < config.max_polls() {
            sleep(config.poll_interval()).await;
        }
    }
    warn!(
        "Stopped polling session {} after {} polls",
        session.id(),
        config.max_polls()
    );
}

/// Poll `attachmentProgress` with the ids still in flight
///
/// Attachments drop out once they report 100 or failure.
async fn poll_legacy(
    connector: &ConnectorClient,
    config: &SaveConfig,
    session: &Session,
    mut outstanding: Vec<Attachment>,
    polls: u32,
) {
    for poll in 0..polls {
        if outstanding.is_empty() {
            return;
        }
        let ids: Vec<String> = outstanding.iter().map(|a| a.label().to_string()).collect();
        let values = match connector.attachment_progress(&ids).await {
            Ok(values) => values,
            Err(e) => {
                debug!("attachmentProgress failed: {e}");
                fail_outstanding(session, &outstanding);
                return;
            }
        };

        let mut still_running = Vec::with_capacity(outstanding.len());
        for (idx, attachment) in outstanding.into_iter().enumerate() {
            let progress = to_progress(&attachment, values.get(idx).copied().flatten());
            let terminal = progress.as_ref().is_some_and(AttachmentProgress::is_terminal);
            if let Some(progress) = progress {
                session.progress().report(&attachment, progress);
            }
            if !terminal {
                still_running.push(attachment);
            }
        }
        outstanding = still_running;

        if !outstanding.is_empty() && poll + 1 < polls {
            sleep(config.poll_interval()).await;
        }
    }
}
