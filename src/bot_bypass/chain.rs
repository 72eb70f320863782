//! Ordered bypass strategies with per-host memory

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use super::allow_list::BypassAllowList;
use super::hidden_frame::HiddenFrameStrategy;
use super::window_prompt::WindowPromptStrategy;
use crate::config::SaveConfig;
use crate::save_engine::{SaveError, SaveResult};
use crate::utils::host_of;

/// Escalation level of a download attempt, in escalation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BypassLevel {
    Direct,
    HiddenFrame,
    WindowPrompt,
}

/// One way of getting past a download challenge
pub trait BypassStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn level(&self) -> BypassLevel;

    /// Load `url` so the challenge can complete and return the URL the
    /// attachment was actually served from
    ///
    /// `cookies` is the user's `Cookie` header for `url`, loaded into the
    /// browser before navigating.
    fn attempt<'a>(
        &'a self,
        url: &'a str,
        expected_mime: Option<&'a str>,
        cookies: Option<&'a str>,
    ) -> BoxFuture<'a, SaveResult<String>>;
}

/// Tries bypass strategies in escalation order, retrying the download with
/// each corrected URL until one succeeds
pub struct BotBypassChain {
    allow_list: BypassAllowList,
    strategies: Vec<Arc<dyn BypassStrategy>>,
    last_success: DashMap<String, BypassLevel>,
}

impl BotBypassChain {
    pub fn new(allow_list: BypassAllowList, mut strategies: Vec<Arc<dyn BypassStrategy>>) -> Self {
        strategies.sort_by_key(|s| s.level());
        Self {
            allow_list,
            strategies,
            last_success: DashMap::new(),
        }
    }

    /// Hidden-frame then window-prompt strategies backed by a local Chromium
    #[must_use]
    pub fn with_browser(config: &SaveConfig) -> Self {
        Self::new(
            BypassAllowList::new(config.bot_bypass_domains()),
            vec![
                Arc::new(HiddenFrameStrategy::new(
                    config.hidden_frame_timeout(),
                    config.user_agent(),
                )),
                Arc::new(WindowPromptStrategy::new(
                    config.window_prompt_size(),
                    config.user_agent(),
                )),
            ],
        )
    }

    #[must_use]
    pub fn allows(&self, url: &str) -> bool {
        self.allow_list.allows(url)
    }

    /// Level that last got a download from `url`'s host through
    #[must_use]
    pub fn remembered_level(&self, url: &str) -> Option<BypassLevel> {
        let host = host_of(url)?;
        self.last_success.get(&host).map(|l| *l.value())
    }

    pub fn remember(&self, url: &str, level: BypassLevel) {
        if let Some(host) = host_of(url) {
            self.last_success.insert(host, level);
        }
    }

    /// Run the strategies for `url`, calling `retry` with each corrected URL
    ///
    /// Strategies below the level that last succeeded for the host are
    /// skipped. Each strategy gets one attempt and one retry.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::BotBlocked`] wrapping `cause` when no strategy
    /// produced a working URL.
    pub async fn run<T, F, Fut>(
        &self,
        url: &str,
        expected_mime: Option<&str>,
        cookies: Option<&str>,
        cause: SaveError,
        mut retry: F,
    ) -> SaveResult<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = SaveResult<T>>,
    {
        let start = self
            .remembered_level(url)
            .unwrap_or(BypassLevel::Direct);

        for strategy in self.strategies.iter().filter(|s| s.level() >= start) {
            debug!("Trying {} bypass for {url}", strategy.name());
            let corrected = match strategy.attempt(url, expected_mime, cookies).await {
                Ok(corrected) => corrected,
                Err(e) => {
                    debug!("{} bypass for {url} failed: {e}", strategy.name());
                    continue;
                }
            };
            match retry(corrected.clone()).await {
                Ok(value) => {
                    info!("{} bypass succeeded for {url} via {corrected}", strategy.name());
                    self.remember(url, strategy.level());
                    return Ok(value);
                }
                Err(e) => debug!("Retry of {corrected} after {} bypass failed: {e}", strategy.name()),
            }
        }

        warn!("All bypass strategies failed for {url}");
        Err(SaveError::BotBlocked {
            url: url.to_string(),
            cause: Box::new(cause),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Scripted {
        level: BypassLevel,
        result: Option<&'static str>,
        calls: Arc<Mutex<Vec<BypassLevel>>>,
    }

    impl BypassStrategy for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn level(&self) -> BypassLevel {
            self.level
        }

        fn attempt<'a>(
            &'a self,
            _url: &'a str,
            _expected_mime: Option<&'a str>,
            _cookies: Option<&'a str>,
        ) -> BoxFuture<'a, SaveResult<String>> {
            self.calls.lock().push(self.level);
            let result = self
                .result
                .map(ToString::to_string)
                .ok_or_else(|| SaveError::Browser("no interception".into()));
            Box::pin(async move { result })
        }
    }

    fn chain(
        hidden: Option<&'static str>,
        window: Option<&'static str>,
    ) -> (BotBypassChain, Arc<Mutex<Vec<BypassLevel>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let strategies: Vec<Arc<dyn BypassStrategy>> = vec![
            Arc::new(Scripted {
                level: BypassLevel::WindowPrompt,
                result: window,
                calls: Arc::clone(&calls),
            }),
            Arc::new(Scripted {
                level: BypassLevel::HiddenFrame,
                result: hidden,
                calls: Arc::clone(&calls),
            }),
        ];
        (
            BotBypassChain::new(BypassAllowList::new(["sciencedirect.com"]), strategies),
            calls,
        )
    }

    const URL: &str = "https://www.sciencedirect.com/x.pdf";

    #[tokio::test]
    async fn hidden_frame_runs_before_window_prompt() {
        let (chain, calls) = chain(None, Some("https://pdf.sciencedirect.com/real.pdf"));
        let got = chain
            .run(URL, Some("application/pdf"), None, SaveError::Network("x".into()), |u| async move {
                Ok::<_, SaveError>(u)
            })
            .await
            .unwrap();
        assert_eq!(got, "https://pdf.sciencedirect.com/real.pdf");
        assert_eq!(
            *calls.lock(),
            vec![BypassLevel::HiddenFrame, BypassLevel::WindowPrompt]
        );
        assert_eq!(chain.remembered_level(URL), Some(BypassLevel::WindowPrompt));
    }

    #[tokio::test]
    async fn remembered_level_skips_lower_strategies() {
        let (chain, calls) = chain(Some("https://a/"), Some("https://b/"));
        chain.remember(URL, BypassLevel::WindowPrompt);
        let got = chain
            .run(URL, None, None, SaveError::Network("x".into()), |u| async move {
                Ok::<_, SaveError>(u)
            })
            .await
            .unwrap();
        assert_eq!(got, "https://b/");
        assert_eq!(*calls.lock(), vec![BypassLevel::WindowPrompt]);
    }

    #[tokio::test]
    async fn exhaustion_wraps_original_error() {
        let (chain, _) = chain(Some("https://a/"), None);
        let err = chain
            .run(
                URL,
                Some("application/pdf"),
                None,
                SaveError::AttachmentMismatch {
                    actual: "text/html".into(),
                    expected: "application/pdf".into(),
                },
                |_| async { Err::<(), _>(SaveError::Network("still blocked".into())) },
            )
            .await
            .unwrap_err();
        match err {
            SaveError::BotBlocked { url, cause } => {
                assert_eq!(url, URL);
                assert!(matches!(*cause, SaveError::AttachmentMismatch { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
