//! AttachmentFetcher escalation through the bypass chain

use std::sync::Arc;

use citesave::bot_bypass::BypassAllowList;
use citesave::{
    Attachment, AttachmentFetcher, BotBypassChain, BypassLevel, BypassStrategy, CookieProvider, FetchMethod,
    SaveConfig, SaveContext, SaveError, SaveResult,
};
use futures::future::BoxFuture;
use mockito::{Server, ServerGuard};
use parking_lot::Mutex;

/// Strategy that records its invocation and answers with a fixed result
struct Recording {
    name: &'static str,
    level: BypassLevel,
    answer: Option<String>,
    log: Arc<Mutex<Vec<&'static str>>>,
    cookies_seen: Arc<Mutex<Vec<Option<String>>>>,
}

impl BypassStrategy for Recording {
    fn name(&self) -> &'static str {
        self.name
    }

    fn level(&self) -> BypassLevel {
        self.level
    }

    fn attempt<'a>(
        &'a self,
        _url: &'a str,
        _expected: Option<&'a str>,
        cookies: Option<&'a str>,
    ) -> BoxFuture<'a, SaveResult<String>> {
        self.log.lock().push(self.name);
        self.cookies_seen.lock().push(cookies.map(ToString::to_string));
        let answer = self
            .answer
            .clone()
            .ok_or_else(|| SaveError::Browser("challenge never completed".into()));
        Box::pin(async move { answer })
    }
}

type CookieLog = Arc<Mutex<Vec<Option<String>>>>;

fn chain(domains: &[&str], corrected: Option<String>, log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<BotBypassChain> {
    chain_with_cookie_log(domains, corrected, log, &CookieLog::default())
}

fn chain_with_cookie_log(
    domains: &[&str],
    corrected: Option<String>,
    log: &Arc<Mutex<Vec<&'static str>>>,
    cookies_seen: &CookieLog,
) -> Arc<BotBypassChain> {
    // Registered out of order on purpose; the chain sorts by level
    let strategies: Vec<Arc<dyn BypassStrategy>> = vec![
        Arc::new(Recording {
            name: "window",
            level: BypassLevel::WindowPrompt,
            answer: corrected,
            log: Arc::clone(log),
            cookies_seen: Arc::clone(cookies_seen),
        }),
        Arc::new(Recording {
            name: "hidden",
            level: BypassLevel::HiddenFrame,
            answer: None,
            log: Arc::clone(log),
            cookies_seen: Arc::clone(cookies_seen),
        }),
    ];
    Arc::new(BotBypassChain::new(BypassAllowList::new(domains.iter().copied()), strategies))
}

async fn challenge_server() -> ServerGuard {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/article/pdf")
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body("<html>checking your browser</html>")
        .create_async()
        .await;
    server
        .mock("GET", "/real.pdf")
        .with_header("content-type", "application/pdf")
        .with_body("%PDF-1.7")
        .create_async()
        .await;
    server
}

#[tokio::test]
async fn mismatch_outside_allow_list_fails_without_bypass() {
    let server = challenge_server().await;
    let log = Arc::default();
    let config = SaveConfig::default();
    let fetcher = AttachmentFetcher::with_bypass(&config, Some(chain(&["sciencedirect.com"], None, &log))).unwrap();
    let context = SaveContext::new("https://x/").bot_bypass_supported(true);
    let attachment = Attachment::new(format!("{}/article/pdf", server.url()), "application/pdf");

    let err = fetcher
        .fetch(&attachment, &context, FetchMethod::Get)
        .await
        .unwrap_err();

    assert!(matches!(err, SaveError::AttachmentMismatch { .. }));
    assert!(err.to_string().contains("does not match specified type application/pdf"));
    assert!(log.lock().is_empty());
}

#[tokio::test]
async fn allow_listed_host_escalates_hidden_frame_then_window() {
    let server = challenge_server().await;
    let log = Arc::default();
    let chain = chain(&["127.0.0.1"], Some(format!("{}/real.pdf", server.url())), &log);
    let config = SaveConfig::default();
    let fetcher = AttachmentFetcher::with_bypass(&config, Some(Arc::clone(&chain))).unwrap();
    let context = SaveContext::new("https://x/").bot_bypass_supported(true);
    let url = format!("{}/article/pdf", server.url());
    let attachment = Attachment::new(&url, "application/pdf");

    let fetched = fetcher
        .fetch(&attachment, &context, FetchMethod::Get)
        .await
        .unwrap();

    assert_eq!(fetched.bytes, b"%PDF-1.7");
    assert_eq!(*log.lock(), vec!["hidden", "window"]);
    assert_eq!(chain.remembered_level(&url), Some(BypassLevel::WindowPrompt));
}

#[tokio::test]
async fn exhausted_chain_reports_bot_blocked() {
    let server = challenge_server().await;
    let log = Arc::default();
    let config = SaveConfig::default();
    let fetcher = AttachmentFetcher::with_bypass(&config, Some(chain(&["127.0.0.1"], None, &log))).unwrap();
    let context = SaveContext::new("https://x/").bot_bypass_supported(true);
    let attachment = Attachment::new(format!("{}/article/pdf", server.url()), "application/pdf");

    let err = fetcher
        .fetch(&attachment, &context, FetchMethod::Get)
        .await
        .unwrap_err();

    match err {
        SaveError::BotBlocked { cause, .. } => {
            assert!(matches!(*cause, SaveError::AttachmentMismatch { .. }));
        }
        other => panic!("expected BotBlocked, got {other}"),
    }
    assert_eq!(*log.lock(), vec!["hidden", "window"]);
}

#[tokio::test]
async fn context_without_bypass_support_never_escalates() {
    let server = challenge_server().await;
    let log = Arc::default();
    let config = SaveConfig::default();
    let fetcher = AttachmentFetcher::with_bypass(&config, Some(chain(&["127.0.0.1"], None, &log))).unwrap();
    let context = SaveContext::new("https://x/").bot_bypass_supported(false);
    let attachment = Attachment::new(format!("{}/article/pdf", server.url()), "application/pdf");

    let err = fetcher
        .fetch(&attachment, &context, FetchMethod::Get)
        .await
        .unwrap_err();

    assert!(matches!(err, SaveError::AttachmentMismatch { .. }));
    assert!(log.lock().is_empty());
}

#[tokio::test]
async fn strategies_receive_the_users_cookies() {
    let server = challenge_server().await;
    let log = Arc::default();
    let cookies_seen = CookieLog::default();
    let chain = chain_with_cookie_log(
        &["127.0.0.1"],
        Some(format!("{}/real.pdf", server.url())),
        &log,
        &cookies_seen,
    );
    let fetcher = AttachmentFetcher::with_bypass(&SaveConfig::default(), Some(chain)).unwrap();
    let cookies: Arc<dyn CookieProvider> = Arc::new(|_: &str| Some("sid=abc; theme=dark".to_string()));
    let context = SaveContext::new("https://x/")
        .bot_bypass_supported(true)
        .with_cookies(cookies);
    let attachment = Attachment::new(format!("{}/article/pdf", server.url()), "application/pdf");

    fetcher
        .fetch(&attachment, &context, FetchMethod::Get)
        .await
        .unwrap();

    let expected = Some("sid=abc; theme=dark".to_string());
    assert_eq!(*cookies_seen.lock(), vec![expected.clone(), expected]);
}
