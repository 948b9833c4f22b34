//! Request and response model shared by the store, the network client and
//! the interceptor.

use bytes::Bytes;
use url::Url;

use crate::cache::key::RequestKey;

/// An intercepted outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// HTTP method, uppercase.
    pub method: String,
    /// Absolute request URL.
    pub url: Url,
    /// Whether the request loads a full document rather than a sub-resource.
    pub navigation: bool,
    /// Request headers, forwarded as-is.
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// Build a request with an arbitrary method.
    pub fn new(method: impl Into<String>, url: Url) -> Self {
        Self { method: method.into().to_ascii_uppercase(), url, navigation: false, headers: Vec::new() }
    }

    /// A sub-resource GET.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    /// A document navigation GET.
    pub fn navigate(url: Url) -> Self {
        Self { navigation: true, ..Self::get(url) }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Identity under which a response to this request is stored.
    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }
}

/// A response snapshot: status, headers and body.
///
/// Headers keep their original order and casing so that a stored entry
/// reads back byte-identical to what was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: body.into() }
    }

    /// Status in the 200..=299 range.
    pub fn is_ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Case-insensitive header lookup, first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
