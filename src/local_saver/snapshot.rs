//! Single-file snapshot side channel

use tracing::{debug, warn};

use crate::connector::{ConnectorClient, SingleFileRequest};
use crate::item_model::{Attachment, Item};
use crate::save_context::SaveContext;
use crate::save_engine::{SaveError, SaveResult, Session};
use crate::save_progress::AttachmentProgress;

/// Capture the page and send it with `saveSingleFile`, reporting progress
/// for `snapshot`
pub(crate) async fn save_snapshot(
    connector: &ConnectorClient,
    context: &SaveContext,
    session: &Session,
    items: &[Item],
    snapshot: &Attachment,
) {
    session.progress().report(snapshot, AttachmentProgress::Percent(0));
    match send_snapshot(connector, context, session, items, snapshot).await {
        Ok(()) => {
            debug!("Snapshot {} saved", snapshot.label());
            session.progress().done(snapshot);
        }
        Err(e) => {
            warn!("Snapshot {} failed: {e}", snapshot.label());
            session.progress().fail(snapshot, e);
        }
    }
}

async fn send_snapshot(
    connector: &ConnectorClient,
    context: &SaveContext,
    session: &Session,
    items: &[Item],
    snapshot: &Attachment,
) -> SaveResult<()> {
    let capture = context
        .capture()
        .ok_or_else(|| SaveError::Other("No page capture service available".to_string()))?;
    let bytes = capture.capture().await?;

    let url = items
        .first()
        .and_then(|item| item.url.clone())
        .unwrap_or_else(|| context.page_url().to_string());
    let request = SingleFileRequest {
        session_id: session.id().to_string(),
        url,
        title: snapshot.title.clone().unwrap_or_default(),
        snapshot_content: String::from_utf8_lossy(&bytes).into_owned(),
        items: items.to_vec(),
    };
    connector.save_single_file(&request).await
}
