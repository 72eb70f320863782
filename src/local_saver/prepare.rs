//! Attachment normalization before `saveItems`

use tracing::debug;

use crate::item_model::{Attachment, AttachmentKind, Item};
use crate::save_context::SaveContext;
use crate::save_engine::DestinationCapabilities;
use crate::utils::{FULL_TEXT_PDF_TITLE, origin_of};

/// Items ready for submission
#[derive(Debug, Clone)]
pub struct PreparedSave {
    /// Every kept attachment, the snapshot included
    pub items: Vec<Item>,
}

impl PreparedSave {
    /// The page snapshot sent through the single-file side channel, with the
    /// index of its item
    #[must_use]
    pub fn snapshot(&self) -> Option<(usize, &Attachment)> {
        self.items.iter().enumerate().find_map(|(idx, item)| {
            item.attachments
                .iter()
                .find(|a| a.single_file)
                .map(|a| (idx, a))
        })
    }
}

/// Normalize items and attachments for the desktop application
///
/// Assigns missing ids, default titles, parents and referrers; applies the
/// destination's preference gate when it accepts uploads; replaces
/// translator PDFs with the page itself when saving a single item from a PDF
/// page; and marks at most one HTML snapshot for the side channel. Snapshots
/// are dropped from multiple-item saves.
#[must_use]
pub fn prepare_items(
    mut items: Vec<Item>,
    caps: &DestinationCapabilities,
    context: &SaveContext,
) -> PreparedSave {
    let referrer = origin_of(context.page_url());

    if items.len() == 1 && context.page_is_pdf() {
        let item = &mut items[0];
        item.attachments.retain(|a| a.mime().as_deref() != Some("application/pdf"));
        item.attachments.push(
            Attachment::new(context.page_url(), "application/pdf").with_title(FULL_TEXT_PDF_TITLE),
        );
    }

    let multiple = items.len() > 1;
    let mut snapshot_taken = false;

    for item in &mut items {
        let item_id = item.ensure_id().to_string();
        let attachments = std::mem::take(&mut item.attachments);
        for mut attachment in attachments {
            if attachment.title.is_none() {
                let mime = attachment.mime_type.clone().unwrap_or_default();
                attachment.title = Some(format!("{mime} Attachment"));
            }
            attachment.ensure_id();
            attachment.parent_item = Some(item_id.clone());
            attachment.referrer.clone_from(&referrer);

            let kind = attachment.kind();
            if caps.supports_attachment_upload {
                let wanted = match kind {
                    AttachmentKind::Linked => true,
                    AttachmentKind::Snapshot => caps.automatic_snapshots,
                    AttachmentKind::Imported => caps.download_associated_files,
                };
                if !wanted {
                    debug!(
                        "Ignoring {} attachment {}: disabled by preferences",
                        attachment.mime().unwrap_or_default(),
                        attachment.label()
                    );
                    continue;
                }
            }

            if kind == AttachmentKind::Snapshot {
                if multiple {
                    debug!("Ignoring snapshot {} for multiple-item save", attachment.label());
                    continue;
                }
                if snapshot_taken {
                    debug!("Ignoring extra snapshot {}", attachment.label());
                    continue;
                }
                snapshot_taken = true;
                attachment.single_file = true;
            }

            item.attachments.push(attachment);
        }
    }

    PreparedSave { items }
}

/// Copy of `items` as sent in `saveItems`
///
/// The snapshot never travels in the payload. When the destination accepts
/// uploads, only linked attachments do.
#[must_use]
pub fn payload_items(items: &[Item], supports_attachment_upload: bool) -> Vec<Item> {
    items
        .iter()
        .map(|item| {
            let mut item = item.clone();
            item.attachments.retain(|a| {
                if supports_attachment_upload {
                    a.kind() == AttachmentKind::Linked
                } else {
                    !a.single_file
                }
            });
            item
        })
        .collect()
}
