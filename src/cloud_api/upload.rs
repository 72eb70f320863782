//! Three-step file upload: authorize, send the bytes, register

use std::sync::Arc;

use futures::stream;
use reqwest::Body;
use reqwest::header::{CONTENT_TYPE, IF_NONE_MATCH};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::client::{CloudApiClient, checked_text};
use crate::save_engine::{SaveError, SaveResult};
use crate::utils::{API_VERSION, API_VERSION_HEADER};

/// Bytes per chunk of the streamed upload body
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Receives upload percentages below 100
pub type UploadProgress = Arc<dyn Fn(u8) + Send + Sync>;

/// Everything needed to upload one attachment file
#[derive(Debug, Clone, Default)]
pub struct AttachmentUpload {
    pub id: String,
    pub data: Vec<u8>,
    pub filename: String,
    /// Key of the attachment item created beforehand
    pub key: String,
    /// Lowercase hex MD5 of `data`
    pub md5: String,
    pub mime_type: String,
    pub charset: Option<String>,
}

impl AttachmentUpload {
    fn validate(&self) -> SaveResult<()> {
        let missing = [
            ("id", self.id.is_empty()),
            ("data", self.data.is_empty()),
            ("filename", self.filename.is_empty()),
            ("key", self.key.is_empty()),
            ("md5", self.md5.is_empty()),
            ("mimeType", self.mime_type.is_empty()),
        ]
        .into_iter()
        .find_map(|(field, empty)| empty.then_some(field));
        if let Some(field) = missing {
            return Err(SaveError::InvalidAttachment(format!(
                "Required property {field} not provided"
            )));
        }
        if !self.key.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SaveError::InvalidAttachment(format!(
                "Attachment key is invalid: {}",
                self.key
            )));
        }
        Ok(())
    }
}

/// Reply to the authorization request
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UploadAuthorization {
    /// The server already holds a file with this hash
    Exists { exists: serde_json::Value },
    #[serde(rename_all = "camelCase")]
    Upload {
        url: String,
        content_type: String,
        prefix: String,
        suffix: String,
        upload_key: String,
    },
}

impl CloudApiClient {
    /// Upload `upload`, calling `progress` with each percentage below 100
    ///
    /// # Errors
    ///
    /// `InvalidAttachment` for a missing field or malformed key, `Rejected`
    /// when any of the three requests is refused.
    pub async fn upload_attachment(&self, upload: AttachmentUpload, progress: UploadProgress) -> SaveResult<()> {
        upload.validate()?;
        let creds = self.credentials()?;
        let file_url = format!("{}/{}/file", self.items_url()?, upload.key);

        let mut form = vec![
            ("md5", upload.md5.clone()),
            ("filename", upload.filename.clone()),
            ("filesize", upload.data.len().to_string()),
            ("mtime", chrono::Utc::now().timestamp_millis().to_string()),
            ("contentType", upload.mime_type.clone()),
        ];
        if let Some(charset) = &upload.charset {
            form.push(("charset", charset.clone()));
        }

        let response = self
            .client
            .post(&file_url)
            .query(&[("key", creds.api_key.as_str())])
            .header(API_VERSION_HEADER, API_VERSION)
            .header(IF_NONE_MATCH, "*")
            .timeout(self.timeout)
            .form(&form)
            .send()
            .await?;
        let status = response.status();
        let text = checked_text(response).await?;
        if status.as_u16() != 200 {
            return Err(SaveError::Rejected {
                status: status.as_u16(),
                message: format!("Upload authorization failed: {text}"),
                value: None,
            });
        }
        let authorization: UploadAuthorization = serde_json::from_str(&text)
            .map_err(|e| SaveError::InvalidResponse(format!("Upload authorization: {e}")))?;

        let (url, content_type, prefix, suffix, upload_key) = match authorization {
            UploadAuthorization::Exists { .. } => {
                info!("File for {} already on the server", upload.id);
                return Ok(());
            }
            UploadAuthorization::Upload {
                url,
                content_type,
                prefix,
                suffix,
                upload_key,
            } => (url, content_type, prefix, suffix, upload_key),
        };

        let total = prefix.len() + upload.data.len() + suffix.len();
        let mut body = Vec::with_capacity(total);
        body.extend_from_slice(prefix.as_bytes());
        body.extend_from_slice(&upload.data);
        body.extend_from_slice(suffix.as_bytes());

        let chunks: Vec<Vec<u8>> = body.chunks(UPLOAD_CHUNK_SIZE).map(<[u8]>::to_vec).collect();
        let mut loaded = 0usize;
        let reporter = Arc::clone(&progress);
        let chunks = chunks.into_iter().map(move |chunk| {
            loaded += chunk.len();
            let percent = loaded * 100 / total.max(1);
            if percent < 100 {
                reporter(u8::try_from(percent).unwrap_or(99));
            }
            Ok::<_, std::io::Error>(chunk)
        });

        debug!("Uploading {total} bytes for {}", upload.id);
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, content_type)
            .timeout(self.timeout)
            .body(Body::wrap_stream(stream::iter(chunks)))
            .send()
            .await?;
        let status = response.status().as_u16();
        if status != 200 && status != 201 {
            let text = response.text().await.unwrap_or_default();
            warn!("File upload for {} failed with {status}", upload.id);
            return Err(SaveError::Rejected {
                status,
                message: format!("File upload failed: {text}"),
                value: None,
            });
        }

        let response = self
            .client
            .post(&file_url)
            .query(&[("key", creds.api_key.as_str())])
            .header(API_VERSION_HEADER, API_VERSION)
            .header(IF_NONE_MATCH, "*")
            .timeout(self.timeout)
            .form(&[("upload", upload_key.as_str())])
            .send()
            .await?;
        let status = response.status().as_u16();
        if status != 204 {
            let text = response.text().await.unwrap_or_default();
            return Err(SaveError::Rejected {
                status,
                message: format!("Upload registration failed: {text}"),
                value: None,
            });
        }
        info!("Uploaded {} ({} bytes)", upload.filename, upload.data.len());
        Ok(())
    }
}
