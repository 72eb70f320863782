//! Bibliographic items and their attachments
//!
//! Items arrive from the translator as JSON and travel to both destinations in
//! (nearly) the same shape, so the model is serde-first with camelCase field
//! names. Fields the saver never looks at are preserved in `extra`.

pub mod attachment;
pub mod item;

pub use attachment::{Attachment, AttachmentKind, LinkMode, ProgressValue};
pub use item::{Creator, Item};
