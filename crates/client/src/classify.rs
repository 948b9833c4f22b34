//! Request classification.
//!
//! Two separate questions are answered here:
//!
//! - [`intercepts`]: does the worker handle the request at all? Only GET
//!   requests to http(s) URLs are intercepted; everything else goes to the
//!   network untouched.
//! - [`Classifier::classify`]: for an intercepted request, may a successful
//!   network response be written back into the cache?
//!
//! Every intercepted request gets cache fallback on network failure, but only
//! `CacheEligible` ones are written back. Navigations that match no marker
//! are still read through (they fall back to the offline document), while
//! other unmatched GETs only ever read the cache.

use url::Url;

/// Write-back policy for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Never written back. Also the verdict for requests that are not intercepted.
    Ignore,
    /// Static asset or API response: written back on success.
    CacheEligible,
    /// Unmatched navigation: read-through with offline-document fallback, no write-back.
    CacheEligibleNavigation,
}

impl Verdict {
    pub fn writes_back(self) -> bool {
        matches!(self, Verdict::CacheEligible)
    }
}

/// Whether the worker intercepts a request with this method and URL.
pub fn intercepts(method: &str, url: &Url) -> bool {
    method.eq_ignore_ascii_case("GET") && matches!(url.scheme(), "http" | "https")
}

/// Pure classification against a fixed set of URL markers.
#[derive(Debug, Clone)]
pub struct Classifier {
    markers: Vec<String>,
}

impl Classifier {
    pub fn new(markers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { markers: markers.into_iter().map(Into::into).filter(|m: &String| !m.is_empty()).collect() }
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Classify a request by method, URL and navigation flag.
    ///
    /// Markers are matched as plain substrings of the full URL, query included.
    pub fn classify(&self, method: &str, url: &Url, navigation: bool) -> Verdict {
        if !intercepts(method, url) {
            return Verdict::Ignore;
        }

        let url = url.as_str();
        if self.markers.iter().any(|marker| url.contains(marker.as_str())) {
            Verdict::CacheEligible
        } else if navigation {
            Verdict::CacheEligibleNavigation
        } else {
            Verdict::Ignore
        }
    }
}
