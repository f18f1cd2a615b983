use crate::error::{MdvError, Result};
use std::time::Duration;

/// Retrieves document text from a URL.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Blocking HTTP fetcher. Non-2xx responses and transport errors both come
/// back as [`MdvError::FetchFailed`]; nothing is retried.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("mdview/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MdvError::FetchFailed(format!("could not build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .map_err(|e| MdvError::FetchFailed(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(MdvError::FetchFailed(format!("HTTP {}", status.as_u16())));
        }
        resp.text().map_err(|e| MdvError::FetchFailed(e.to_string()))
    }
}

/// Only http(s) URLs are fetched; anything else is treated as a path.
pub fn is_url(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_http_urls() {
        assert!(is_url("https://example.org/a.md"));
        assert!(is_url("HTTP://EXAMPLE.ORG"));
        assert!(!is_url("./notes.md"));
        assert!(!is_url("ftp://example.org/a.md"));
    }
}
