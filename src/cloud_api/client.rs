//! Item creation endpoints

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::{ApiCredentials, SaveConfig};
use crate::item_model::{Attachment, Item, LinkMode};
use crate::save_engine::{SaveError, SaveResult};
use crate::utils::{API_VERSION, API_VERSION_HEADER};

/// Reply to an item creation request
///
/// `success` maps the index of each created object in the request to its key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateItemsResponse {
    #[serde(default)]
    pub success: HashMap<String, String>,
    #[serde(default)]
    pub failed: HashMap<String, Value>,
}

impl CreateItemsResponse {
    #[must_use]
    pub fn key_at(&self, index: usize) -> Option<&str> {
        self.success.get(&index.to_string()).map(String::as_str)
    }
}

/// Client for the hosted REST API
#[derive(Debug, Clone)]
pub struct CloudApiClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) credentials: Option<ApiCredentials>,
    pub(crate) timeout: Duration,
}

impl CloudApiClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &SaveConfig) -> SaveResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent())
            .build()
            .map_err(|e| SaveError::Other(format!("Failed to build API client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.api_url().to_string(),
            credentials: config.api_credentials().cloned(),
            timeout: config.attachment_timeout(),
        })
    }

    pub(crate) fn credentials(&self) -> SaveResult<&ApiCredentials> {
        self.credentials
            .as_ref()
            .ok_or_else(|| SaveError::rejected(403, "Not authorized"))
    }

    pub(crate) fn items_url(&self) -> SaveResult<String> {
        let creds = self.credentials()?;
        Ok(format!("{}users/{}/items", self.base_url, creds.user_id))
    }

    /// Create `objects` in one request
    ///
    /// # Errors
    ///
    /// `Rejected { status: 403 }` without credentials, `Rejected` for an error
    /// status or when any object failed, a transport error otherwise.
    pub async fn create_items(&self, objects: &[Value]) -> SaveResult<CreateItemsResponse> {
        let url = self.items_url()?;
        let creds = self.credentials()?;
        debug!("Creating {} objects on the hosted API", objects.len());
        let response = self
            .client
            .post(&url)
            .query(&[("key", creds.api_key.as_str())])
            .header(API_VERSION_HEADER, API_VERSION)
            .timeout(self.timeout)
            .json(objects)
            .send()
            .await?;
        let status = response.status();
        let text = checked_text(response).await?;

        let parsed: CreateItemsResponse = serde_json::from_str(&text).map_err(|_| {
            SaveError::InvalidResponse(format!("Unexpected response received from server: {text}"))
        })?;
        if !parsed.failed.is_empty() {
            warn!("Hosted API rejected {} objects", parsed.failed.len());
            return Err(SaveError::Rejected {
                status: status.as_u16(),
                message: format!("Save to server failed with {status} {text}"),
                value: serde_json::from_str(&text).ok(),
            });
        }
        Ok(parsed)
    }

    /// Create the attachment placeholder under `parent_key`, returning its key
    ///
    /// # Errors
    ///
    /// See [`CloudApiClient::create_items`].
    pub async fn create_attachment_item(&self, parent_key: &str, attachment: &Attachment) -> SaveResult<String> {
        let link_mode = attachment.link_mode.unwrap_or(LinkMode::from(attachment.kind()));
        let tags = attachment
            .extra
            .get("tags")
            .filter(|t| t.is_array())
            .cloned()
            .unwrap_or_else(|| json!([]));
        let note = attachment
            .extra
            .get("note")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let object = json!({
            "itemType": "attachment",
            "parentItem": parent_key,
            "linkMode": link_mode,
            "title": attachment.title.as_deref().unwrap_or("Untitled Attachment"),
            "accessDate": "CURRENT_TIMESTAMP",
            "url": attachment.url,
            "note": note,
            "tags": tags,
        });
        let response = self.create_items(&[object]).await?;
        let key = response
            .key_at(0)
            .ok_or_else(|| SaveError::InvalidResponse("Attachment item was not created".to_string()))?;
        debug!("Attachment item created for {}", attachment.label());
        Ok(key.to_string())
    }
}

/// Hosted API form of an item: attachments are created separately and the
/// local id never leaves this process
#[must_use]
pub fn item_to_api_json(item: &Item) -> Value {
    let mut object = item.without_attachments();
    object.id = None;
    object.key = None;
    let mut value = serde_json::to_value(&object).unwrap_or_else(|_| json!({}));
    if let Some(map) = value.as_object_mut() {
        map.remove("attachments");
    }
    value
}

/// Body of a successful response, or `Rejected` carrying status and body
pub(crate) async fn checked_text(response: Response) -> SaveResult<String> {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    if status.is_client_error() || status.is_server_error() {
        warn!("API request failed with {status} ({text})");
        return Err(SaveError::Rejected {
            status: status.as_u16(),
            message: format!("{} ({text})", status.as_u16()),
            value: serde_json::from_str(&text).ok(),
        });
    }
    Ok(text)
}
