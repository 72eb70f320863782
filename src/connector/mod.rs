//! Loopback RPC client for the desktop application
//!
//! Every call is a JSON POST to `{connector_url}connector/{method}`. A call
//! that cannot be delivered at all fails with `SaveError::Unreachable`; any
//! HTTP error status fails with `SaveError::Rejected`.

pub mod client;
pub mod wire;

pub use client::ConnectorClient;
pub use wire::{
    AttachmentMetadata, OaAttachmentRequest, SaveItemsRequest, SaveItemsResponse,
    SelectedCollection, SessionProgress, SingleFileRequest,
};
