//! URL resolution for requests and manifest entries.

use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve `input` against `origin`.
///
/// Steps:
/// 1. Trim leading/trailing whitespace
/// 2. Absolute URLs are kept; paths resolve against `origin`
/// 3. Remove fragment (#...)
/// 4. Keep query string intact
///
/// Non-http schemes are returned as parsed; deciding whether to intercept
/// them is the classifier's job.
pub fn resolve(origin: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut resolved = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
        }
        Err(e) => return Err(UrlError::InvalidUrl(e.to_string())),
    };

    resolved.set_fragment(None);

    Ok(resolved)
}

/// Resolve every entry of a manifest, failing on the first bad one.
pub fn resolve_all(origin: &Url, inputs: &[String]) -> Result<Vec<Url>, UrlError> {
    inputs.iter().map(|input| resolve(origin, input)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("http://localhost:8080").unwrap()
    }

    #[test]
    fn test_resolve_root_path() {
        let url = resolve(&origin(), "/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_resolve_relative_path() {
        let url = resolve(&origin(), "/offline.html").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/offline.html");
    }

    #[test]
    fn test_resolve_absolute_kept() {
        let url = resolve(&origin(), "https://fonts.example.com/css2?family=Roboto").unwrap();
        assert_eq!(url.host_str(), Some("fonts.example.com"));
        assert_eq!(url.query(), Some("family=Roboto"));
    }

    #[test]
    fn test_resolve_lowercases_host() {
        let url = resolve(&origin(), "https://EXAMPLE.COM/Path").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert_eq!(url.path(), "/Path");
    }

    #[test]
    fn test_resolve_removes_fragment() {
        let url = resolve(&origin(), "/calendar#today").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/calendar");
    }

    #[test]
    fn test_resolve_keeps_foreign_scheme() {
        let url = resolve(&origin(), "chrome-extension://abc/script.js").unwrap();
        assert_eq!(url.scheme(), "chrome-extension");
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve(&origin(), ""), Err(UrlError::Empty)));
        assert!(matches!(resolve(&origin(), "   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_resolve_all_fails_on_bad_entry() {
        let inputs = vec!["/".to_string(), " ".to_string()];
        assert!(resolve_all(&origin(), &inputs).is_err());
    }
}
