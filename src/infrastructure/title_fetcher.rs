//! Best-effort page title lookup for newly created resources.

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

/// Longest title kept, in characters.
pub const MAX_TITLE_CHARS: usize = 255;

/// Most of a response body read while looking for the title.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

const TITLE_CLOSE: &[u8] = b"</title>";

const USER_AGENT: &str = concat!("codeshort/", env!("CARGO_PKG_VERSION"), " (title fetcher)");

static TITLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());

/// Looks up a human-readable title for a target URL.
///
/// Never fails: any network, status, content-type or parsing problem yields
/// `None`, and creation proceeds without a title.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TitleFetcher: Send + Sync {
    async fn fetch_title(&self, url: &str) -> Option<String>;
}

/// Fetches the page over HTTP and extracts its `<title>` element.
pub struct HttpTitleFetcher {
    client: reqwest::Client,
}

impl HttpTitleFetcher {
    /// Builds a fetcher whose requests are bounded by `timeout` end to end.
    ///
    /// # Errors
    ///
    /// Returns the underlying `reqwest` error if the TLS backend cannot be
    /// initialised.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl TitleFetcher for HttpTitleFetcher {
    async fn fetch_title(&self, url: &str) -> Option<String> {
        let mut response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(url, error = %e, "Title fetch failed");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!(url, status = %response.status(), "Title fetch got non-success status");
            return None;
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_none_or(|ct| ct.to_ascii_lowercase().contains("html"));
        if !is_html {
            return None;
        }

        let mut head = HeadBuffer::default();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    if head.push(&chunk) {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(url, error = %e, "Title fetch body read failed");
                    return None;
                }
            }
        }

        extract_title(&head.into_text())
    }
}

/// Start of a response body, kept until the title has closed or
/// [`MAX_BODY_BYTES`] have been read.
#[derive(Debug, Default)]
struct HeadBuffer {
    bytes: Vec<u8>,
}

impl HeadBuffer {
    /// Appends a chunk. Returns `true` once nothing more needs to be read.
    fn push(&mut self, chunk: &[u8]) -> bool {
        let room = MAX_BODY_BYTES - self.bytes.len();
        let take = chunk.len().min(room);
        // The closing tag may straddle the previous chunk.
        let scan_from = self.bytes.len().saturating_sub(TITLE_CLOSE.len() - 1);
        self.bytes.extend_from_slice(&chunk[..take]);

        self.bytes.len() >= MAX_BODY_BYTES
            || self.bytes[scan_from..]
                .windows(TITLE_CLOSE.len())
                .any(|w| w.eq_ignore_ascii_case(TITLE_CLOSE))
    }

    fn into_text(self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Fetcher used when title lookup is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTitleFetcher;

#[async_trait]
impl TitleFetcher for NoopTitleFetcher {
    async fn fetch_title(&self, _url: &str) -> Option<String> {
        None
    }
}

/// Extracts, decodes and tidies the first `<title>` of an HTML document.
pub fn extract_title(html: &str) -> Option<String> {
    let raw = TITLE_REGEX.captures(html)?.get(1)?.as_str();
    let decoded = decode_entities(raw);
    let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.is_empty() {
        return None;
    }

    Some(collapsed.chars().take(MAX_TITLE_CHARS).collect())
}

fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}
