//! Saving through the desktop application
//!
//! A session moves through `Preparing -> Submitted -> Polling` and ends
//! completed, or degraded when the connection drops mid-poll. Which half of
//! the attachment work happens here depends on whether the application
//! accepts uploaded attachment bytes.

pub mod open_access;
pub mod polling;
pub mod prepare;
pub mod saver;
pub mod snapshot;
pub mod upload;

pub use prepare::{PreparedSave, payload_items, prepare_items};
pub use saver::LocalClientSaver;
