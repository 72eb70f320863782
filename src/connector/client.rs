//! HTTP transport for connector calls

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::wire::{
    AttachmentMetadata, OaAttachmentRequest, PingResponse, SaveItemsRequest, SaveItemsResponse,
    SelectedCollection, SessionProgress, SingleFileRequest,
};
use crate::config::SaveConfig;
use crate::item_model::ProgressValue;
use crate::save_engine::{DestinationCapabilities, SaveError, SaveResult};
use crate::utils::{
    ATTACHMENT_METADATA_HEADER, CONNECTOR_API_VERSION, CONNECTOR_API_VERSION_HEADER,
    CONNECTOR_CLIENT_VERSION_HEADER,
};

/// Client for the desktop application's connector server
#[derive(Debug, Clone)]
pub struct ConnectorClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    attachment_timeout: Duration,
}

impl ConnectorClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &SaveConfig) -> SaveResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONNECTOR_CLIENT_VERSION_HEADER,
            HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
        );
        headers.insert(
            CONNECTOR_API_VERSION_HEADER,
            HeaderValue::from(CONNECTOR_API_VERSION),
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| SaveError::Other(format!("Failed to build connector client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.connector_url().to_string(),
            timeout: config.connector_timeout(),
            attachment_timeout: config.attachment_timeout(),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}connector/{method}", self.base_url)
    }

    /// Call `method` with a JSON body and decode the JSON reply
    ///
    /// Empty replies decode from `null`, so `()` and `Option<_>` work as `T`.
    ///
    /// # Errors
    ///
    /// [`SaveError::Unreachable`] if the request could not be delivered,
    /// [`SaveError::Rejected`] for an HTTP error status.
    pub async fn call_method<T, B>(&self, method: &str, body: &B) -> SaveResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        debug!("Connector call {method}");
        let response = self
            .client
            .post(self.endpoint(method))
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| unreachable(method, &e))?;
        decode(method, response).await
    }

    /// Destination preferences, queried once per session
    ///
    /// # Errors
    ///
    /// See [`ConnectorClient::call_method`].
    pub async fn ping(&self) -> SaveResult<DestinationCapabilities> {
        let value: Value = self.call_method("ping", &json!({})).await?;
        // Old clients answer with plain text and no prefs
        Ok(serde_json::from_value::<PingResponse>(value)
            .map(|r| r.prefs)
            .unwrap_or_default())
    }

    /// # Errors
    ///
    /// See [`ConnectorClient::call_method`].
    pub async fn selected_collection(&self) -> SaveResult<SelectedCollection> {
        self.call_method("getSelectedCollection", &json!({})).await
    }

    /// # Errors
    ///
    /// See [`ConnectorClient::call_method`].
    pub async fn save_items(&self, request: &SaveItemsRequest) -> SaveResult<SaveItemsResponse> {
        let value: Value = self.call_method("saveItems", request).await?;
        if value.is_null() {
            return Ok(SaveItemsResponse::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// # Errors
    ///
    /// See [`ConnectorClient::call_method`].
    pub async fn session_progress(&self, session_id: &str) -> SaveResult<SessionProgress> {
        self.call_method("sessionProgress", &json!({ "sessionID": session_id }))
            .await
    }

    /// Progress for each of `ids`, in order, as reported by clients that
    /// predate `sessionProgress`
    ///
    /// # Errors
    ///
    /// See [`ConnectorClient::call_method`].
    pub async fn attachment_progress(&self, ids: &[String]) -> SaveResult<Vec<Option<ProgressValue>>> {
        self.call_method("attachmentProgress", ids).await
    }

    /// # Errors
    ///
    /// See [`ConnectorClient::call_method`].
    pub async fn save_single_file(&self, request: &SingleFileRequest) -> SaveResult<()> {
        let _: Value = self.call_method("saveSingleFile", request).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// See [`ConnectorClient::call_method`].
    pub async fn has_oa_attachments(&self, request: &OaAttachmentRequest) -> SaveResult<bool> {
        let value: Value = self.call_method("hasOAAttachments", request).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Ask the destination to find and save an open-access copy, returning
    /// the title of the saved attachment
    ///
    /// # Errors
    ///
    /// See [`ConnectorClient::call_method`].
    pub async fn save_oa_attachment(&self, request: &OaAttachmentRequest) -> SaveResult<Option<String>> {
        let value: Value = self.call_method("saveOAAttachment", request).await?;
        Ok(value.as_str().map(ToString::to_string))
    }

    /// Upload the bytes of an attachment belonging to an item of `session_id`
    ///
    /// # Errors
    ///
    /// See [`ConnectorClient::call_method`].
    pub async fn save_attachment(
        &self,
        session_id: &str,
        metadata: &AttachmentMetadata,
        bytes: Vec<u8>,
    ) -> SaveResult<()> {
        self.upload("saveAttachment", session_id, metadata, bytes).await
    }

    /// Upload an attachment that has no parent item
    ///
    /// # Errors
    ///
    /// See [`ConnectorClient::call_method`].
    pub async fn save_standalone_attachment(
        &self,
        session_id: &str,
        metadata: &AttachmentMetadata,
        bytes: Vec<u8>,
    ) -> SaveResult<()> {
        self.upload("saveStandaloneAttachment", session_id, metadata, bytes)
            .await
    }

    async fn upload(
        &self,
        method: &str,
        session_id: &str,
        metadata: &AttachmentMetadata,
        bytes: Vec<u8>,
    ) -> SaveResult<()> {
        let header = serde_json::to_string(metadata)?;
        debug!("Connector upload {method}: {} bytes for {}", bytes.len(), metadata.id);
        let response = self
            .client
            .post(self.endpoint(method))
            .query(&[("sessionID", session_id)])
            .timeout(self.attachment_timeout)
            .header(CONTENT_TYPE, &metadata.content_type)
            .header(ATTACHMENT_METADATA_HEADER, header)
            .body(bytes)
            .send()
            .await
            .map_err(|e| unreachable(method, &e))?;
        let _: Value = decode(method, response).await?;
        Ok(())
    }
}

fn unreachable(method: &str, err: &reqwest::Error) -> SaveError {
    warn!("Connector call {method} could not be delivered: {err}");
    SaveError::Unreachable(format!("{method}: {err}"))
}

async fn decode<T: DeserializeOwned>(method: &str, response: reqwest::Response) -> SaveResult<T> {
    let status = response.status();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("json"));
    let text = response
        .text()
        .await
        .map_err(|e| SaveError::Network(format!("{method}: failed to read reply: {e}")))?;

    let value = if text.trim().is_empty() || status == StatusCode::NO_CONTENT {
        Value::Null
    } else if is_json {
        serde_json::from_str(&text)
            .map_err(|e| SaveError::InvalidResponse(format!("{method}: {e}")))?
    } else {
        Value::String(text.clone())
    };

    if status.is_client_error() || status.is_server_error() {
        debug!("Connector call {method} rejected with {status}: {text}");
        return Err(SaveError::Rejected {
            status: status.as_u16(),
            message: if text.is_empty() {
                status.to_string()
            } else {
                text
            },
            value: (!value.is_null()).then_some(value),
        });
    }

    serde_json::from_value(value).map_err(|e| SaveError::InvalidResponse(format!("{method}: {e}")))
}
