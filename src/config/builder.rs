//! Builder for `SaveConfig`
//!
//! Every field has a default; `build()` validates the combination.

use anyhow::{Result, bail};
use url::Url;

use super::types::{ApiCredentials, SaveConfig};
use crate::utils::{
    CHROME_USER_AGENT, DEFAULT_API_URL, DEFAULT_ATTACHMENT_TIMEOUT_SECS, DEFAULT_BOT_BYPASS_DOMAINS,
    DEFAULT_CONNECTOR_TIMEOUT_SECS, DEFAULT_CONNECTOR_URL, DEFAULT_HIDDEN_FRAME_TIMEOUT_SECS,
    DEFAULT_MAX_POLLS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WINDOW_PROMPT_SIZE,
};

#[derive(Debug, Clone)]
pub struct SaveConfigBuilder {
    connector_url: String,
    connector_timeout_secs: u64,
    api_url: String,
    api_credentials: Option<ApiCredentials>,
    automatic_snapshots: bool,
    download_associated_files: bool,
    attachment_timeout_secs: u64,
    poll_interval_ms: u64,
    max_polls: u32,
    legacy_progress_fallback: bool,
    bot_bypass_enabled: bool,
    bot_bypass_domains: Vec<String>,
    hidden_frame_timeout_secs: u64,
    window_prompt_size: (u32, u32),
    user_agent: String,
}

impl Default for SaveConfigBuilder {
    fn default() -> Self {
        Self {
            connector_url: DEFAULT_CONNECTOR_URL.to_string(),
            connector_timeout_secs: DEFAULT_CONNECTOR_TIMEOUT_SECS,
            api_url: DEFAULT_API_URL.to_string(),
            api_credentials: None,
            automatic_snapshots: true,
            download_associated_files: true,
            attachment_timeout_secs: DEFAULT_ATTACHMENT_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_polls: DEFAULT_MAX_POLLS,
            legacy_progress_fallback: true,
            bot_bypass_enabled: true,
            bot_bypass_domains: DEFAULT_BOT_BYPASS_DOMAINS
                .iter()
                .map(ToString::to_string)
                .collect(),
            hidden_frame_timeout_secs: DEFAULT_HIDDEN_FRAME_TIMEOUT_SECS,
            window_prompt_size: DEFAULT_WINDOW_PROMPT_SIZE,
            user_agent: CHROME_USER_AGENT.to_string(),
        }
    }
}

impl SaveConfigBuilder {
    #[must_use]
    pub fn connector_url(mut self, url: impl Into<String>) -> Self {
        self.connector_url = with_trailing_slash(url.into());
        self
    }

    #[must_use]
    pub fn connector_timeout_secs(mut self, secs: u64) -> Self {
        self.connector_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = with_trailing_slash(url.into());
        self
    }

    #[must_use]
    pub fn api_credentials(mut self, user_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.api_credentials = Some(ApiCredentials {
            user_id: user_id.into(),
            api_key: api_key.into(),
        });
        self
    }

    #[must_use]
    pub fn automatic_snapshots(mut self, enabled: bool) -> Self {
        self.automatic_snapshots = enabled;
        self
    }

    #[must_use]
    pub fn download_associated_files(mut self, enabled: bool) -> Self {
        self.download_associated_files = enabled;
        self
    }

    #[must_use]
    pub fn attachment_timeout_secs(mut self, secs: u64) -> Self {
        self.attachment_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    #[must_use]
    pub fn max_polls(mut self, polls: u32) -> Self {
        self.max_polls = polls;
        self
    }

    #[must_use]
    pub fn legacy_progress_fallback(mut self, enabled: bool) -> Self {
        self.legacy_progress_fallback = enabled;
        self
    }

    #[must_use]
    pub fn bot_bypass_enabled(mut self, enabled: bool) -> Self {
        self.bot_bypass_enabled = enabled;
        self
    }

    #[must_use]
    pub fn bot_bypass_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bot_bypass_domains = domains
            .into_iter()
            .map(|d| d.into().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        self
    }

    #[must_use]
    pub fn hidden_frame_timeout_secs(mut self, secs: u64) -> Self {
        self.hidden_frame_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn window_prompt_size(mut self, width: u32, height: u32) -> Self {
        self.window_prompt_size = (width, height);
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Validate and build the configuration
    ///
    /// # Errors
    ///
    /// Returns an error when a base URL does not parse as http(s), or when the
    /// polling settings would never poll.
    pub fn build(self) -> Result<SaveConfig> {
        validate_base_url("connector_url", &self.connector_url)?;
        validate_base_url("api_url", &self.api_url)?;
        if self.max_polls == 0 {
            bail!("max_polls must be at least 1");
        }
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than zero");
        }
        if self.connector_timeout_secs == 0 || self.attachment_timeout_secs == 0 {
            bail!("timeouts must be greater than zero");
        }
        Ok(self.into_config())
    }

    pub(crate) fn into_config(self) -> SaveConfig {
        SaveConfig {
            connector_url: self.connector_url,
            connector_timeout_secs: self.connector_timeout_secs,
            api_url: self.api_url,
            api_credentials: self.api_credentials,
            automatic_snapshots: self.automatic_snapshots,
            download_associated_files: self.download_associated_files,
            attachment_timeout_secs: self.attachment_timeout_secs,
            poll_interval_ms: self.poll_interval_ms,
            max_polls: self.max_polls,
            legacy_progress_fallback: self.legacy_progress_fallback,
            bot_bypass_enabled: self.bot_bypass_enabled,
            bot_bypass_domains: self.bot_bypass_domains,
            hidden_frame_timeout_secs: self.hidden_frame_timeout_secs,
            window_prompt_size: self.window_prompt_size,
            user_agent: self.user_agent,
        }
    }
}

fn with_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

fn validate_base_url(field: &str, url: &str) -> Result<()> {
    let parsed = Url::parse(url).map_err(|e| anyhow::anyhow!("Invalid {field} '{url}': {e}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("{field} must use http or https, got '{url}'");
    }
    if !url.ends_with('/') {
        bail!("{field} must end with '/', got '{url}'");
    }
    Ok(())
}
