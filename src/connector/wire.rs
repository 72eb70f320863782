//! Request and response bodies of the connector protocol

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::item_model::Item;
use crate::save_engine::DestinationCapabilities;

/// Body of `saveItems`
#[derive(Debug, Clone, Serialize)]
pub struct SaveItemsRequest {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    pub uri: String,
    pub items: Vec<Item>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,
    /// A snapshot follows through `saveSingleFile`
    #[serde(rename = "singleFile", skip_serializing_if = "std::ops::Not::not")]
    pub single_file: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub incognito: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveItemsResponse {
    #[serde(default)]
    pub items: Vec<Item>,
}

/// Reply to `sessionProgress`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionProgress {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PingResponse {
    #[serde(default)]
    pub prefs: DestinationCapabilities,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedCollection {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "editable_by_default")]
    pub editable: bool,
    #[serde(default = "editable_by_default")]
    pub files_editable: bool,
}

fn editable_by_default() -> bool {
    true
}

/// Body of `saveSingleFile`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleFileRequest {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    pub url: String,
    pub title: String,
    pub snapshot_content: String,
    pub items: Vec<Item>,
}

/// Body of `hasOAAttachments` and `saveOAAttachment`
#[derive(Debug, Clone, Serialize)]
pub struct OaAttachmentRequest {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    #[serde(rename = "itemID")]
    pub item_id: String,
}

/// JSON sent in the metadata header of a binary attachment upload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentMetadata {
    pub id: String,
    pub url: String,
    pub content_type: String,
    #[serde(rename = "parentItemID", skip_serializing_if = "Option::is_none")]
    pub parent_item_id: Option<String>,
    /// RFC 2047 encoded so the header stays ASCII
    pub title: String,
}
