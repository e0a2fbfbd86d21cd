//! Target URL validation and canonicalization.
//!
//! Every resource points at an absolute `http`/`https` URL with a host. The
//! stored form has a lowercase host and no default port. Path, query and
//! fragment are kept as submitted, so hash-routed targets still work.

use url::Url;

/// Longest target URL accepted, in bytes, after trimming.
pub const MAX_URL_LENGTH: usize = 2048;

/// Errors that can occur during URL normalization.
#[derive(Debug, thiserror::Error)]
pub enum UrlNormalizationError {
    #[error("URL must not be empty")]
    Empty,

    #[error("URL exceeds {MAX_URL_LENGTH} characters")]
    TooLong,

    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("URL must include a host")]
    MissingHost,

    #[error("Failed to normalize URL: {0}")]
    NormalizationFailed(String),
}

/// Validates `input` and returns its canonical form.
///
/// Surrounding whitespace is ignored. Path case, query string and fragment
/// are kept.
///
/// # Errors
///
/// Returns [`UrlNormalizationError::UnsupportedProtocol`] for `javascript:`,
/// `data:`, `ftp:` and any other non-HTTP scheme, and
/// [`UrlNormalizationError::InvalidFormat`] for relative or malformed input.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(
///     normalize_url("  HTTPS://Example.COM:443/Path#top ").unwrap(),
///     "https://example.com/Path#top"
/// );
/// ```
pub fn normalize_url(input: &str) -> Result<String, UrlNormalizationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(UrlNormalizationError::Empty);
    }
    if input.len() > MAX_URL_LENGTH {
        return Err(UrlNormalizationError::TooLong);
    }

    let mut url =
        Url::parse(input).map_err(|e| UrlNormalizationError::InvalidFormat(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlNormalizationError::UnsupportedProtocol);
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(UrlNormalizationError::MissingHost)?
        .to_ascii_lowercase();
    url.set_host(Some(&host)).map_err(|e| {
        UrlNormalizationError::NormalizationFailed(format!("Failed to set host: {e}"))
    })?;

    if matches!(
        (url.scheme(), url.port()),
        ("http", Some(80)) | ("https", Some(443))
    ) {
        url.set_port(None).map_err(|_| {
            UrlNormalizationError::NormalizationFailed("Failed to remove default port".to_string())
        })?;
    }

    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_host_gets_root_path() {
        assert_eq!(normalize_url("http://example.com").unwrap(), "http://example.com/");
    }

    #[test]
    fn test_canonical_form() {
        assert_eq!(
            normalize_url("  HTTPS://Example.COM:443/Path?key=VALUE#anchor ").unwrap(),
            "https://example.com/Path?key=VALUE#anchor"
        );
    }

    #[test]
    fn test_hash_route_survives() {
        let input = "https://app.example.com/#/dashboard/42";
        assert_eq!(normalize_url(input).unwrap(), input);
    }

    #[test]
    fn test_custom_port_is_kept() {
        assert_eq!(
            normalize_url("http://localhost:3000/test").unwrap(),
            "http://localhost:3000/test"
        );
    }

    #[test]
    fn test_default_http_port_removed() {
        assert_eq!(
            normalize_url("http://example.com:80/a").unwrap(),
            "http://example.com/a"
        );
    }

    #[test]
    fn test_rejects_empty_and_whitespace() {
        assert!(matches!(normalize_url(""), Err(UrlNormalizationError::Empty)));
        assert!(matches!(normalize_url("   "), Err(UrlNormalizationError::Empty)));
    }

    #[test]
    fn test_rejects_relative() {
        assert!(matches!(
            normalize_url("example.com/path"),
            Err(UrlNormalizationError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_rejects_other_schemes() {
        for input in [
            "ftp://example.com/file.txt",
            "javascript:alert('xss')",
            "data:text/plain,Hello",
            "mailto:test@example.com",
        ] {
            assert!(
                matches!(normalize_url(input), Err(UrlNormalizationError::UnsupportedProtocol)),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_overlong() {
        let url = format!("https://example.com/{}", "a".repeat(MAX_URL_LENGTH));
        assert!(matches!(normalize_url(&url), Err(UrlNormalizationError::TooLong)));
    }
}
