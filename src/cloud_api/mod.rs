//! REST client for the hosted account
//!
//! Items are created in one batch request, attachment placeholders one by
//! one, and file bytes go through the authorize/upload/register exchange.

pub mod client;
pub mod upload;

pub use client::{CloudApiClient, CreateItemsResponse, item_to_api_json};
pub use upload::{AttachmentUpload, UploadAuthorization, UploadProgress};
