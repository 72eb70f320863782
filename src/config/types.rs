//! Core configuration types for save operations

use serde::{Deserialize, Serialize};

use super::builder::SaveConfigBuilder;

/// Credentials for the hosted API
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiCredentials {
    pub user_id: String,
    pub api_key: String,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("user_id", &self.user_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Main configuration struct for save operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveConfig {
    /// Base URL of the desktop client's connector server, ends with `/`
    pub(crate) connector_url: String,
    pub(crate) connector_timeout_secs: u64,

    /// Base URL of the hosted API, ends with `/`
    pub(crate) api_url: String,
    pub(crate) api_credentials: Option<ApiCredentials>,

    /// Save HTML snapshots to the hosted API
    pub(crate) automatic_snapshots: bool,
    /// Save PDFs and other files to the hosted API
    pub(crate) download_associated_files: bool,

    pub(crate) attachment_timeout_secs: u64,
    pub(crate) poll_interval_ms: u64,
    /// Upper bound on `sessionProgress` calls per session
    pub(crate) max_polls: u32,
    /// Fall back to `attachmentProgress` when `sessionProgress` is unknown
    pub(crate) legacy_progress_fallback: bool,

    pub(crate) bot_bypass_enabled: bool,
    pub(crate) bot_bypass_domains: Vec<String>,
    pub(crate) hidden_frame_timeout_secs: u64,
    pub(crate) window_prompt_size: (u32, u32),

    pub(crate) user_agent: String,
}

impl SaveConfig {
    #[must_use]
    pub fn builder() -> SaveConfigBuilder {
        SaveConfigBuilder::default()
    }
}

impl Default for SaveConfig {
    fn default() -> Self {
        SaveConfigBuilder::default().into_config()
    }
}
