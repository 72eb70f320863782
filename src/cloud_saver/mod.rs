//! CloudServerSaver: items and attachments to the hosted account
//!
//! Items are created in one batch. Attachments that pass the account
//! preferences are then fetched, turned into links when they cannot be
//! downloaded, rewritten when they are HTML snapshots and uploaded with
//! their MD5.

mod attachments;
pub mod filename;
pub mod html_snapshot;
mod saver;

pub use filename::{attachment_filename, base_name};
pub use html_snapshot::rewrite_snapshot;
pub use saver::CloudServerSaver;
