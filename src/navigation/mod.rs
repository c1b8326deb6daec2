//! Decides which navigations are worth analyzing.

use url::Url;

/// Frame id the browser assigns to a tab's top-level document.
pub const TOP_LEVEL_FRAME: u32 = 0;

/// Pure admission predicate for navigation events.
#[derive(Debug, Clone, Default)]
pub struct NavigationFilter {
    /// Host of the classifier service; analyzing it would feed back into itself.
    service_host: Option<String>,
}

impl NavigationFilter {
    pub fn new(service_host: Option<String>) -> Self {
        Self {
            service_host: service_host.map(|h| h.to_ascii_lowercase()),
        }
    }

    /// Admit only top-level http(s) navigations to hosts other than the service's own.
    pub fn admit(&self, url: &str, frame_id: u32) -> bool {
        if frame_id != TOP_LEVEL_FRAME {
            return false;
        }
        let parsed = match Url::parse(url) {
            Ok(u) => u,
            Err(_) => return false,
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }
        let host = match parsed.host_str() {
            Some(h) if !h.is_empty() => h.to_ascii_lowercase(),
            _ => return false,
        };
        match &self.service_host {
            Some(own) => host != *own,
            None => true,
        }
    }
}

/// Lower-cased host of `url`, if it has one.
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_end_matches('.').to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> NavigationFilter {
        NavigationFilter::new(Some("api.phishguard.example".to_string()))
    }

    #[test]
    fn test_admits_top_level_web_pages() {
        assert!(filter().admit("https://example.com/", TOP_LEVEL_FRAME));
        assert!(filter().admit("http://example.com/login?x=1", TOP_LEVEL_FRAME));
    }

    #[test]
    fn test_rejects_subframes() {
        assert!(!filter().admit("https://example.com/", 3));
    }

    #[test]
    fn test_rejects_internal_schemes() {
        for url in [
            "chrome://settings",
            "about:blank",
            "chrome-extension://abcdef/popup.html",
            "moz-extension://abcdef/warning.html",
            "data:text/html,<h1>hi</h1>",
            "blob:https://example.com/1234",
            "file:///etc/passwd",
            "not a url",
        ] {
            assert!(!filter().admit(url, TOP_LEVEL_FRAME), "{} should be rejected", url);
        }
    }

    #[test]
    fn test_rejects_own_service() {
        assert!(!filter().admit("https://api.phishguard.example/analyze", TOP_LEVEL_FRAME));
        assert!(!filter().admit("https://API.PHISHGUARD.EXAMPLE/health", TOP_LEVEL_FRAME));
        assert!(filter().admit("https://phishguard.example/", TOP_LEVEL_FRAME));
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("https://Mail.Example.com./inbox").as_deref(), Some("mail.example.com"));
        assert_eq!(host_of("garbage"), None);
    }
}
