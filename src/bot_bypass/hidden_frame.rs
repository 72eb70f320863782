//! Load the attachment in an invisible frame and watch the network

use std::future::Future;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::network::EventResponseReceived;
use futures::future::BoxFuture;
use tokio::time::timeout;
use tracing::debug;

use super::browser::{apply_cookies, js_string, launch_browser, wait_for_attachment};
use super::chain::{BypassLevel, BypassStrategy};
use crate::save_engine::{SaveError, SaveResult};
use crate::utils::{DEFAULT_WINDOW_PROMPT_SIZE, origin_of};

/// Headless page that loads the URL in a hidden iframe, giving the
/// challenge script a chance to run, and reports the first response of the
/// expected type. The whole attempt, browser launch included, is bounded by
/// `timeout`.
pub struct HiddenFrameStrategy {
    timeout: Duration,
    user_agent: String,
}

impl HiddenFrameStrategy {
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            timeout,
            user_agent: user_agent.into(),
        }
    }

    async fn run(&self, url: &str, expected_mime: Option<&str>, cookies: Option<&str>) -> SaveResult<String> {
        let wrapper = launch_browser(true, DEFAULT_WINDOW_PROMPT_SIZE, &self.user_agent).await?;
        let page = wrapper
            .browser()
            .new_page("about:blank")
            .await
            .map_err(|e| SaveError::Browser(format!("Failed to open page: {e}")))?;
        apply_cookies(&page, url, cookies).await?;

        let host_page = origin_of(url).unwrap_or_else(|| "about:blank".to_string());
        page.goto(host_page.as_str())
            .await
            .map_err(|e| SaveError::Browser(format!("Failed to open {host_page}: {e}")))?;
        let mut events = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| SaveError::Browser(format!("Failed to listen for responses: {e}")))?;

        let script = format!(
            "(() => {{ const f = document.createElement('iframe'); \
             f.style.display = 'none'; f.src = {}; \
             document.documentElement.appendChild(f); }})()",
            js_string(url)
        );
        page.evaluate(script)
            .await
            .map_err(|e| SaveError::Browser(format!("Failed to inject frame: {e}")))?;

        let found = wait_for_attachment(&mut events, url, expected_mime).await;
        wrapper.shutdown().await;
        found.ok_or_else(|| SaveError::Browser("Browser closed before the attachment loaded".to_string()))
    }
}

/// Bound a whole attempt by `limit`; on expiry the browser is torn down by
/// dropping its wrapper
async fn bounded<F>(limit: Duration, url: &str, attempt: F) -> SaveResult<String>
where
    F: Future<Output = SaveResult<String>>,
{
    match timeout(limit, attempt).await {
        Ok(result) => result,
        Err(_) => {
            debug!("Hidden frame saw no attachment response within {limit:?}");
            Err(SaveError::Timeout(format!("hidden frame for {url}")))
        }
    }
}

impl BypassStrategy for HiddenFrameStrategy {
    fn name(&self) -> &'static str {
        "hidden-frame"
    }

    fn level(&self) -> BypassLevel {
        BypassLevel::HiddenFrame
    }

    fn attempt<'a>(
        &'a self,
        url: &'a str,
        expected_mime: Option<&'a str>,
        cookies: Option<&'a str>,
    ) -> BoxFuture<'a, SaveResult<String>> {
        Box::pin(bounded(self.timeout, url, self.run(url, expected_mime, cookies)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn slow_attempt_times_out() {
        let err = bounded(
            Duration::from_millis(10),
            "https://www.sciencedirect.com/x.pdf",
            futures::future::pending(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SaveError::Timeout(_)), "{err}");
    }

    #[tokio::test]
    async fn finished_attempt_passes_through() {
        let got = bounded(Duration::from_secs(5), "https://a/x.pdf", async {
            Ok("https://a/real.pdf".to_string())
        })
        .await
        .unwrap();
        assert_eq!(got, "https://a/real.pdf");
    }
}
