//! Local Chromium for the browser-backed bypass strategies

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, EventResponseReceived};
use chromiumoxide::listeners::EventStream;
use futures::StreamExt;
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

use crate::save_engine::{SaveError, SaveResult};
use crate::utils::random_id;

/// Find Chrome/Chromium executable on the system with platform-specific search paths
pub fn find_browser_executable() -> SaveResult<PathBuf> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!(
                "Using browser from CHROMIUM_PATH environment variable: {}",
                path.display()
            );
            return Ok(path);
        }
        warn!(
            "CHROMIUM_PATH environment variable points to non-existent file: {}",
            path.display()
        );
    }

    let paths: &[&str] = if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ]
    } else if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "~/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ]
    };

    for path_str in paths {
        let path = match path_str.strip_prefix("~/") {
            Some(rest) => match dirs::home_dir() {
                Some(home) => home.join(rest),
                None => continue,
            },
            None => PathBuf::from(path_str),
        };
        if path.exists() {
            info!("Found browser at: {}", path.display());
            return Ok(path);
        }
    }

    if !cfg!(target_os = "windows") {
        for cmd in ["chromium", "chromium-browser", "google-chrome", "chrome"] {
            if let Ok(output) = Command::new("which").arg(cmd).output()
                && output.status.success()
            {
                let path_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path_str.is_empty() {
                    info!("Found browser using 'which' command: {path_str}");
                    return Ok(PathBuf::from(path_str));
                }
            }
        }
    }

    Err(SaveError::Browser(
        "Chrome/Chromium executable not found".to_string(),
    ))
}

/// Browser plus the task driving its CDP connection
///
/// Dropping the wrapper stops the handler and removes the profile directory.
pub struct BrowserWrapper {
    browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: Option<PathBuf>,
}

impl BrowserWrapper {
    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Close the browser and wait for the process to exit
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser: {e}");
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Failed to wait for browser exit: {e}");
        }
        self.cleanup_temp_dir();
    }

    fn cleanup_temp_dir(&mut self) {
        if let Some(path) = self.user_data_dir.take()
            && let Err(e) = std::fs::remove_dir_all(&path)
        {
            warn!(
                "Failed to clean up temp directory {}: {e}",
                path.display()
            );
        }
    }
}

impl Drop for BrowserWrapper {
    fn drop(&mut self) {
        self.handler.abort();
        self.cleanup_temp_dir();
    }
}

/// Launch a browser with its own temporary profile
///
/// # Errors
///
/// Returns [`SaveError::Browser`] if no executable is found or the launch fails.
pub async fn launch_browser(
    headless: bool,
    window_size: (u32, u32),
    user_agent: &str,
) -> SaveResult<BrowserWrapper> {
    let chrome_path = find_browser_executable()?;
    let user_data_dir = std::env::temp_dir().join(format!("citesave_chrome_{}", random_id()));
    std::fs::create_dir_all(&user_data_dir)
        .map_err(|e| SaveError::Browser(format!("Failed to create user data directory: {e}")))?;

    let mut config_builder = BrowserConfigBuilder::default()
        .request_timeout(Duration::from_secs(30))
        .window_size(window_size.0, window_size.1)
        .user_data_dir(user_data_dir.clone())
        .chrome_executable(chrome_path);
    config_builder = if headless {
        config_builder.headless_mode(HeadlessMode::default())
    } else {
        config_builder.with_head()
    };
    let browser_config = config_builder
        .arg(format!("--user-agent={user_agent}"))
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-infobars")
        .arg("--disable-notifications")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--disable-popup-blocking")
        .arg("--password-store=basic")
        .arg("--use-mock-keychain")
        .build()
        .map_err(|e| SaveError::Browser(format!("Failed to build browser config: {e}")))?;

    info!("Launching {} browser for download challenge", if headless { "headless" } else { "visible" });
    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .map_err(|e| SaveError::Browser(format!("Failed to launch browser: {e}")))?;

    let handler = task::spawn(async move {
        while let Some(h) = handler.next().await {
            if let Err(e) = h {
                let error_msg = e.to_string();
                // chromiumoxide does not know every CDP event Chrome sends
                if error_msg.contains("data did not match any variant of untagged enum Message")
                    || error_msg.contains("Failed to deserialize WS response")
                {
                    trace!("Suppressed benign CDP serialization error: {error_msg}");
                } else {
                    error!("Browser handler error: {e:?}");
                }
            }
        }
    });

    Ok(BrowserWrapper {
        browser,
        handler,
        user_data_dir: Some(user_data_dir),
    })
}

/// Whether an intercepted response is the attachment rather than a challenge page
pub(crate) fn is_attachment_response(
    event: &EventResponseReceived,
    original_url: &str,
    expected_mime: Option<&str>,
) -> bool {
    let mime = event.response.mime_type.to_ascii_lowercase();
    match expected_mime {
        Some(expected) => mime.eq_ignore_ascii_case(expected),
        None => mime != "text/html" && event.response.url != original_url,
    }
}

/// Wait on `events` for the attachment response, returning its URL
pub(crate) async fn wait_for_attachment(
    events: &mut EventStream<EventResponseReceived>,
    original_url: &str,
    expected_mime: Option<&str>,
) -> Option<String> {
    while let Some(event) = events.next().await {
        if is_attachment_response(&event, original_url, expected_mime) {
            return Some(event.response.url.clone());
        }
    }
    None
}

/// Split a `Cookie` header into name/value pairs
pub(crate) fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Load the user's cookies for `url` into the browser
///
/// # Errors
///
/// Returns [`SaveError::Browser`] if a cookie is rejected.
pub(crate) async fn apply_cookies(page: &Page, url: &str, header: Option<&str>) -> SaveResult<()> {
    let cookies = parse_cookie_header(header.unwrap_or_default())
        .into_iter()
        .map(|(name, value)| CookieParam::builder().name(name).value(value).url(url).build())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SaveError::Browser(format!("Invalid cookie: {e}")))?;
    if cookies.is_empty() {
        return Ok(());
    }
    debug!("Loading {} cookies for {url} into the browser", cookies.len());
    page.set_cookies(cookies)
        .await
        .map_err(|e| SaveError::Browser(format!("Failed to set cookies: {e}")))?;
    Ok(())
}

/// JavaScript string literal for `value`
pub(crate) fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
