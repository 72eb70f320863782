//! Traits for services provided by the host application

use futures::future::BoxFuture;
use serde_json::{Value, json};
use url::Url;

use crate::save_engine::SaveResult;
use crate::utils::strip_proxy_host;

/// Looks up the `Cookie` header value to send with a request to `url`
pub trait CookieProvider: Send + Sync {
    fn cookie_header(&self, url: &str) -> Option<String>;
}

impl<F> CookieProvider for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn cookie_header(&self, url: &str) -> Option<String> {
        self(url)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoCookies;

impl CookieProvider for NoCookies {
    fn cookie_header(&self, _url: &str) -> Option<String> {
        None
    }
}

/// The same cookie header for every URL of one host
#[derive(Debug, Clone)]
pub struct StaticCookies {
    host: String,
    header: String,
}

impl StaticCookies {
    pub fn new(host: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            host: host.into().to_ascii_lowercase(),
            header: header.into(),
        }
    }
}

impl CookieProvider for StaticCookies {
    fn cookie_header(&self, url: &str) -> Option<String> {
        let host = crate::utils::host_of(url)?;
        (host == self.host || host.ends_with(&format!(".{}", self.host)))
            .then(|| self.header.clone())
    }
}

/// Captures the current page as a self-contained HTML document
pub trait PageCapture: Send + Sync {
    fn capture(&self) -> BoxFuture<'_, SaveResult<Vec<u8>>>;
}

/// Knowledge of the proxy the page was loaded through
pub trait ProxyResolver: Send + Sync {
    /// Convert a proxied URL back to the URL of the origin site
    fn to_proper(&self, url: &str) -> String;

    /// Description of the proxy sent to the desktop client
    fn descriptor(&self) -> Value;
}

/// Proxy that encodes the origin host into the first label of its own host,
/// e.g. `www-sciencedirect-com.proxy.uni.edu`
#[derive(Debug, Clone)]
pub struct HyphenatedProxy {
    suffix: String,
}

impl HyphenatedProxy {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into().trim_start_matches('.').to_ascii_lowercase(),
        }
    }
}

impl ProxyResolver for HyphenatedProxy {
    fn to_proper(&self, url: &str) -> String {
        let Ok(mut parsed) = Url::parse(url) else {
            return url.to_string();
        };
        let Some(host) = parsed.host_str().map(str::to_ascii_lowercase) else {
            return url.to_string();
        };
        if !host.ends_with(&format!(".{}", self.suffix)) {
            return url.to_string();
        }
        if let Some(proper) = strip_proxy_host(&host)
            && parsed.set_host(Some(&proper)).is_ok()
        {
            return parsed.to_string();
        }
        url.to_string()
    }

    fn descriptor(&self) -> Value {
        json!({
            "scheme": format!("%h.{}/%p", self.suffix),
            "dotsToHyphens": true,
        })
    }
}
