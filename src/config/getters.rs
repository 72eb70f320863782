//! Getter methods for `SaveConfig`

use std::time::Duration;

use super::types::{ApiCredentials, SaveConfig};

impl SaveConfig {
    #[must_use]
    pub fn connector_url(&self) -> &str {
        &self.connector_url
    }

    #[must_use]
    pub fn connector_timeout(&self) -> Duration {
        Duration::from_secs(self.connector_timeout_secs)
    }

    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    #[must_use]
    pub fn api_credentials(&self) -> Option<&ApiCredentials> {
        self.api_credentials.as_ref()
    }

    #[must_use]
    pub fn automatic_snapshots(&self) -> bool {
        self.automatic_snapshots
    }

    #[must_use]
    pub fn download_associated_files(&self) -> bool {
        self.download_associated_files
    }

    #[must_use]
    pub fn attachment_timeout(&self) -> Duration {
        Duration::from_secs(self.attachment_timeout_secs)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn max_polls(&self) -> u32 {
        self.max_polls
    }

    #[must_use]
    pub fn legacy_progress_fallback(&self) -> bool {
        self.legacy_progress_fallback
    }

    #[must_use]
    pub fn bot_bypass_enabled(&self) -> bool {
        self.bot_bypass_enabled
    }

    #[must_use]
    pub fn bot_bypass_domains(&self) -> &[String] {
        &self.bot_bypass_domains
    }

    #[must_use]
    pub fn hidden_frame_timeout(&self) -> Duration {
        Duration::from_secs(self.hidden_frame_timeout_secs)
    }

    #[must_use]
    pub fn window_prompt_size(&self) -> (u32, u32) {
        self.window_prompt_size
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}
