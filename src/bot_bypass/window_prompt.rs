//! Visible window the user can complete a challenge in

use chromiumoxide::cdp::browser_protocol::network::EventResponseReceived;
use futures::future::BoxFuture;
use tracing::info;

use super::browser::{apply_cookies, js_string, launch_browser, wait_for_attachment};
use super::chain::{BypassLevel, BypassStrategy};
use crate::save_engine::{SaveError, SaveResult};

/// Opens the URL in a visible browser window and waits, without a time
/// limit, until a response of the expected type arrives or the user closes
/// the window.
pub struct WindowPromptStrategy {
    size: (u32, u32),
    user_agent: String,
}

impl WindowPromptStrategy {
    pub fn new(size: (u32, u32), user_agent: impl Into<String>) -> Self {
        Self {
            size,
            user_agent: user_agent.into(),
        }
    }

    async fn run(&self, url: &str, expected_mime: Option<&str>, cookies: Option<&str>) -> SaveResult<String> {
        let wrapper = launch_browser(false, self.size, &self.user_agent).await?;
        let page = wrapper
            .browser()
            .new_page("about:blank")
            .await
            .map_err(|e| SaveError::Browser(format!("Failed to open window: {e}")))?;
        apply_cookies(&page, url, cookies).await?;
        let mut events = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| SaveError::Browser(format!("Failed to listen for responses: {e}")))?;

        // Navigating from script returns at once; goto would wait for a load
        // event the challenge page may never fire
        page.evaluate(format!("window.location.href = {}", js_string(url)))
            .await
            .map_err(|e| SaveError::Browser(format!("Failed to open {url}: {e}")))?;
        info!("Waiting for the user to complete the download challenge for {url}");

        let found = wait_for_attachment(&mut events, url, expected_mime).await;
        wrapper.shutdown().await;
        found.ok_or_else(|| SaveError::Browser("Window closed before the attachment loaded".to_string()))
    }
}

impl BypassStrategy for WindowPromptStrategy {
    fn name(&self) -> &'static str {
        "window-prompt"
    }

    fn level(&self) -> BypassLevel {
        BypassLevel::WindowPrompt
    }

    fn attempt<'a>(
        &'a self,
        url: &'a str,
        expected_mime: Option<&'a str>,
        cookies: Option<&'a str>,
    ) -> BoxFuture<'a, SaveResult<String>> {
        Box::pin(self.run(url, expected_mime, cookies))
    }
}
