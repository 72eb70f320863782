//! Domains known to put downloads behind a JavaScript challenge

use crate::utils::{host_of, strip_proxy_host};

#[derive(Debug, Clone, Default)]
pub struct BypassAllowList {
    domains: Vec<String>,
}

impl BypassAllowList {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(|d| d.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Whether `url`'s host, or the origin host behind a hyphenating proxy,
    /// is one of the listed domains or a subdomain of one
    #[must_use]
    pub fn allows(&self, url: &str) -> bool {
        let Some(host) = host_of(url) else {
            return false;
        };
        if self.matches_host(&host) {
            return true;
        }
        strip_proxy_host(&host).is_some_and(|proper| self.matches_host(&proper))
    }

    fn matches_host(&self, host: &str) -> bool {
        self.domains.iter().any(|domain| {
            host == domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}
