//! Per-page save context and the collaborators it carries
//!
//! Cookie lookup, page capture and proxy rewriting are owned by other parts
//! of the host application; the savers only see them through these traits.

pub mod collaborators;

pub use collaborators::{
    CookieProvider, HyphenatedProxy, NoCookies, PageCapture, ProxyResolver, StaticCookies,
};

use std::fmt;
use std::sync::Arc;

/// Everything a save needs to know about the page the items came from
#[derive(Clone)]
pub struct SaveContext {
    page_url: String,
    page_content_type: Option<String>,
    cookies: Arc<dyn CookieProvider>,
    capture: Option<Arc<dyn PageCapture>>,
    proxy: Option<Arc<dyn ProxyResolver>>,
    incognito: bool,
    bot_bypass_supported: bool,
}

impl SaveContext {
    pub fn new(page_url: impl Into<String>) -> Self {
        Self {
            page_url: page_url.into(),
            page_content_type: None,
            cookies: Arc::new(NoCookies),
            capture: None,
            proxy: None,
            incognito: false,
            bot_bypass_supported: false,
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.page_content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn with_cookies(mut self, cookies: Arc<dyn CookieProvider>) -> Self {
        self.cookies = cookies;
        self
    }

    #[must_use]
    pub fn with_capture(mut self, capture: Arc<dyn PageCapture>) -> Self {
        self.capture = Some(capture);
        self
    }

    #[must_use]
    pub fn with_proxy(mut self, proxy: Arc<dyn ProxyResolver>) -> Self {
        self.proxy = Some(proxy);
        self
    }

    #[must_use]
    pub fn incognito(mut self, incognito: bool) -> Self {
        self.incognito = incognito;
        self
    }

    /// Allow browser-based bypass strategies for this page
    #[must_use]
    pub fn bot_bypass_supported(mut self, supported: bool) -> Self {
        self.bot_bypass_supported = supported;
        self
    }

    #[must_use]
    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    #[must_use]
    pub fn page_content_type(&self) -> Option<&str> {
        self.page_content_type.as_deref()
    }

    /// Whether the page itself is a PDF document
    #[must_use]
    pub fn page_is_pdf(&self) -> bool {
        self.page_content_type
            .as_deref()
            .is_some_and(|ct| ct.trim().eq_ignore_ascii_case("application/pdf"))
    }

    #[must_use]
    pub fn cookies(&self) -> &dyn CookieProvider {
        self.cookies.as_ref()
    }

    #[must_use]
    pub fn capture(&self) -> Option<&Arc<dyn PageCapture>> {
        self.capture.as_ref()
    }

    #[must_use]
    pub fn proxy(&self) -> Option<&Arc<dyn ProxyResolver>> {
        self.proxy.as_ref()
    }

    #[must_use]
    pub fn is_incognito(&self) -> bool {
        self.incognito
    }

    #[must_use]
    pub fn is_bot_bypass_supported(&self) -> bool {
        self.bot_bypass_supported
    }

    /// `url` in its non-proxied form, unchanged when no proxy is active
    #[must_use]
    pub fn deproxify(&self, url: &str) -> String {
        match &self.proxy {
            Some(proxy) => proxy.to_proper(url),
            None => url.to_string(),
        }
    }
}

impl fmt::Debug for SaveContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveContext")
            .field("page_url", &self.page_url)
            .field("page_content_type", &self.page_content_type)
            .field("capture", &self.capture.is_some())
            .field("proxy", &self.proxy.is_some())
            .field("incognito", &self.incognito)
            .field("bot_bypass_supported", &self.bot_bypass_supported)
            .finish_non_exhaustive()
    }
}
