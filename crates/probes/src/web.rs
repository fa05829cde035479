//! HTTP homepage fetch and lightweight HTML extraction.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};
use vouch_core::{ProbeOutcome, WebData};

/// Fixed user agent sent with every homepage request.
const USER_AGENT: &str = "Mozilla/5.0 (compatible; VouchVerify/1.0; +https://vouch.dev)";

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid regex"));
static META_NAME_FIRST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<meta[^>]*name\s*=\s*["']description["'][^>]*content\s*=\s*["']([^"']*)["']"#)
        .expect("valid regex")
});
static META_CONTENT_FIRST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<meta[^>]*content\s*=\s*["']([^"']*)["'][^>]*name\s*=\s*["']description["']"#)
        .expect("valid regex")
});

/// Trait for homepage fetches, object-safe so tests can substitute mocks.
#[async_trait]
pub trait HomepageFetcher: Send + Sync {
    /// Fetch and parse the homepage at `url`.
    async fn fetch(&self, url: &str) -> ProbeOutcome<WebData>;
}

/// Production homepage client built on reqwest.
///
/// Follows redirects and identifies itself with a fixed user agent. Title
/// and meta description are extracted only from `text/html` responses.
#[derive(Debug)]
pub struct WebClient {
    client: reqwest::Client,
}

impl WebClient {
    /// Create a client with the given request deadline.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HomepageFetcher for WebClient {
    async fn fetch(&self, url: &str) -> ProbeOutcome<WebData> {
        let url = normalize_url(url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!(%url, "HTTP request timed out");
                return ProbeOutcome::failed("HTTP request timed out");
            }
            Err(e) => {
                warn!(%url, error = %e, "HTTP request failed");
                return ProbeOutcome::failed(format!("HTTP request failed: {e}"));
            }
        };

        let status_code = response.status().as_u16();
        let reachable = (200..400).contains(&status_code);
        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/html"));

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return ProbeOutcome::failed(format!("failed to read response body: {e}")),
        };

        let (title, description) = if reachable && is_html {
            let html = String::from_utf8_lossy(&body);
            (extract_title(&html), extract_description(&html))
        } else {
            (None, None)
        };

        debug!(%url, status_code, reachable, bytes = body.len(), "homepage fetched");

        ProbeOutcome::Success(WebData {
            reachable,
            status_code: Some(status_code),
            title,
            description,
            content_length: body.len() as u64,
        })
    }
}

/// Prefix `https://` when the URL has no scheme.
fn normalize_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_owned()
    } else {
        format!("https://{url}")
    }
}

fn extract_title(html: &str) -> Option<String> {
    TITLE_RE
        .captures(html)
        .map(|c| collapse_whitespace(&c[1]))
        .filter(|t| !t.is_empty())
}

fn extract_description(html: &str) -> Option<String> {
    META_NAME_FIRST_RE
        .captures(html)
        .or_else(|| META_CONTENT_FIRST_RE.captures(html))
        .map(|c| collapse_whitespace(&c[1]))
        .filter(|d| !d.is_empty())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_is_prefixed_when_missing() {
        assert_eq!(normalize_url("novageo.io"), "https://novageo.io");
        assert_eq!(normalize_url("http://novageo.io"), "http://novageo.io");
        assert_eq!(normalize_url("https://novageo.io"), "https://novageo.io");
    }

    #[test]
    fn title_extraction() {
        let html = "<html><head><title>\n  NovaGeo —\n  Satellite Data  </title></head></html>";
        assert_eq!(
            extract_title(html).as_deref(),
            Some("NovaGeo — Satellite Data")
        );
    }

    #[test]
    fn title_missing_or_empty_yields_none() {
        assert!(extract_title("<html><body>no head</body></html>").is_none());
        assert!(extract_title("<title>   </title>").is_none());
    }

    #[test]
    fn description_with_name_before_content() {
        let html = r#"<meta name="description" content="Geospatial intelligence platform">"#;
        assert_eq!(
            extract_description(html).as_deref(),
            Some("Geospatial intelligence platform")
        );
    }

    #[test]
    fn description_with_content_before_name() {
        let html = r#"<meta content="Reversed attribute order" name="description">"#;
        assert_eq!(
            extract_description(html).as_deref(),
            Some("Reversed attribute order")
        );
    }

    #[test]
    fn unrelated_meta_tags_are_ignored() {
        let html = r#"<meta name="keywords" content="satellite, geo">"#;
        assert!(extract_description(html).is_none());
    }

    #[test]
    fn title_regex_is_case_insensitive() {
        let html = "<TITLE>Upper Case</TITLE>";
        assert_eq!(extract_title(html).as_deref(), Some("Upper Case"));
    }
}
