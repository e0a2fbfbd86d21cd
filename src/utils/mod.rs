//! Utility functions for URL processing and request handling.
//!
//! - [`url_normalizer`] - URL normalization and sanitization
//! - [`client_ip`] - Rate-limit identity from the peer address or proxy headers

pub mod client_ip;
pub mod url_normalizer;
