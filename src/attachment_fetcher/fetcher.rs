//! HTTP retrieval of attachment bytes

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use log::{debug, info, warn};
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, COOKIE, REFERER, USER_AGENT};

use super::content_type::parse_content_type;
use crate::bot_bypass::{BotBypassChain, BypassLevel};
use crate::config::SaveConfig;
use crate::item_model::Attachment;
use crate::save_context::SaveContext;
use crate::save_engine::{SaveError, SaveResult};
use crate::utils::origin_of;

/// HTTP method used for an attachment request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMethod {
    Get,
    /// Headers only, for link-only attachments of unknown type
    Head,
}

/// A successfully fetched attachment
#[derive(Debug, Clone)]
pub struct FetchedAttachment {
    /// Empty for `HEAD` requests
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub charset: Option<String>,
    /// URL after redirects or bypass correction
    pub final_url: String,
    pub status: u16,
}

/// Downloads attachments and checks their content type
pub struct AttachmentFetcher {
    client: Client,
    timeout: Duration,
    user_agent: String,
    bypass: Option<Arc<BotBypassChain>>,
}

impl AttachmentFetcher {
    /// Create a fetcher, with browser-backed bot bypass when enabled in `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &SaveConfig) -> SaveResult<Self> {
        let bypass = config
            .bot_bypass_enabled()
            .then(|| Arc::new(BotBypassChain::with_browser(config)));
        Self::with_bypass(config, bypass)
    }

    /// Create a fetcher with an explicit bypass chain (or none)
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_bypass(config: &SaveConfig, bypass: Option<Arc<BotBypassChain>>) -> SaveResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| SaveError::Other(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout: config.attachment_timeout(),
            user_agent: config.user_agent().to_string(),
            bypass,
        })
    }

    /// Fetch `attachment`, verifying the response type against its MIME type
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::AttachmentMismatch`] when the server answers with
    /// a different type, [`SaveError::BotBlocked`] when the bypass chain ran
    /// and every strategy failed, or the transport error of the request.
    pub async fn fetch(
        &self,
        attachment: &Attachment,
        context: &SaveContext,
        method: FetchMethod,
    ) -> SaveResult<FetchedAttachment> {
        let url = attachment
            .url
            .as_deref()
            .ok_or_else(|| SaveError::InvalidAttachment(format!("{} has no URL", attachment.label())))?;
        let mime = attachment.mime();
        let expected = mime.as_deref();

        let err = match self.fetch_url(url, expected, attachment, context, method).await {
            Ok(fetched) => {
                if let Some(chain) = self.bypass.as_deref()
                    && chain.remembered_level(url).is_some()
                {
                    chain.remember(url, BypassLevel::Direct);
                }
                return Ok(fetched);
            }
            Err(err) => err,
        };

        let Some(chain) = self.bypass_for(url, &err, context) else {
            return Err(err);
        };
        info!("Direct download of {url} looks blocked ({err}), trying bypass strategies");
        let cookies = context.cookies().cookie_header(url);
        chain
            .run(url, expected, cookies.as_deref(), err, |corrected| async move {
                self.fetch_url(&corrected, expected, attachment, context, method)
                    .await
            })
            .await
    }

    fn bypass_for(&self, url: &str, err: &SaveError, context: &SaveContext) -> Option<&BotBypassChain> {
        let chain = self.bypass.as_deref()?;
        let blocked = match err {
            SaveError::AttachmentMismatch { .. } => true,
            SaveError::Http { status, .. } => *status == 403,
            other => other.is_network(),
        };
        if !blocked || !context.is_bot_bypass_supported() {
            return None;
        }
        if !chain.allows(url) {
            debug!("{url} is not on the bypass allow-list");
            return None;
        }
        Some(chain)
    }

    async fn fetch_url(
        &self,
        url: &str,
        expected: Option<&str>,
        attachment: &Attachment,
        context: &SaveContext,
        method: FetchMethod,
    ) -> SaveResult<FetchedAttachment> {
        let request = match method {
            FetchMethod::Get => self.client.get(url),
            FetchMethod::Head => self.client.head(url),
        };
        let mut request = request
            .timeout(self.timeout)
            .header(USER_AGENT, &self.user_agent);
        if let Some(cookie) = context.cookies().cookie_header(url) {
            request = request.header(COOKIE, cookie);
        }
        let referrer = attachment
            .referrer
            .clone()
            .or_else(|| origin_of(context.page_url()));
        if let Some(referrer) = referrer {
            request = request.header(REFERER, referrer);
        }

        debug!("{method:?} {url}");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("Attachment download from {url} failed with status: {status}");
            return Err(SaveError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let header = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let content_type = parse_content_type(header);
        if let (Some(expected), Some(actual)) = (expected, content_type.mime.as_deref())
            && !actual.eq_ignore_ascii_case(expected)
        {
            return Err(SaveError::AttachmentMismatch {
                actual: actual.to_string(),
                expected: expected.to_string(),
            });
        }

        let final_url = response.url().to_string();
        let bytes = match method {
            FetchMethod::Head => Vec::new(),
            FetchMethod::Get => read_body(response).await?,
        };
        debug!("Fetched {} bytes from {final_url}", bytes.len());

        Ok(FetchedAttachment {
            bytes,
            content_type: content_type.mime,
            charset: content_type.charset,
            final_url,
            status: status.as_u16(),
        })
    }
}

async fn read_body(response: reqwest::Response) -> SaveResult<Vec<u8>> {
    let expected_size = response.content_length().unwrap_or(0);
    let mut buffer = Vec::with_capacity(usize::try_from(expected_size).unwrap_or(0));
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(buffer)
}
