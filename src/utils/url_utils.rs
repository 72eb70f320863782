//! URL helpers for referrers, hostnames and proxied hosts.

use url::Url;

/// Check if a URL is a fetchable http(s) URL
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    // Skip data URLs, javascript URLs, and other non-http schemes
    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Origin of a URL (`scheme://host[:port]`), used as the referrer for attachment requests
#[must_use]
pub fn origin_of(url: &str) -> Option<String> {
    let origin = Url::parse(url).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Lowercased hostname of a URL
#[must_use]
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(str::to_ascii_lowercase)
}

/// Undo the hostname rewriting done by hyphenating reverse proxies.
///
/// EZproxy-style proxies in "HttpsHyphens" mode serve `www.example.com` as
/// `www-example-com.proxy.uni.edu`. Returns the candidate proper host
/// (`www.example.com`) when the first label carries hyphens, otherwise `None`.
#[must_use]
pub fn strip_proxy_host(host: &str) -> Option<String> {
    let host = host.strip_prefix("0-").unwrap_or(host);
    let (first, rest) = host.split_once('.')?;
    if !first.contains('-') || rest.is_empty() {
        return None;
    }
    Some(first.replace('-', "."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_drops_path_and_query() {
        assert_eq!(
            origin_of("https://www.example.com:8443/a/b?c=d#e").as_deref(),
            Some("https://www.example.com:8443")
        );
        assert_eq!(origin_of("not a url"), None);
    }

    #[test]
    fn proxy_host_is_dehyphenated() {
        assert_eq!(
            strip_proxy_host("www-sciencedirect-com.proxy.uni.edu").as_deref(),
            Some("www.sciencedirect.com")
        );
        assert_eq!(strip_proxy_host("www.sciencedirect.com"), None);
        assert_eq!(strip_proxy_host("localhost"), None);
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(is_valid_url("https://example.com/file.pdf"));
        assert!(!is_valid_url("javascript:void(0)"));
        assert!(!is_valid_url("ftp://example.com/file.pdf"));
        assert!(!is_valid_url(""));
    }
}
