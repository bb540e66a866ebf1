pub mod arxiv;
pub mod bing;
pub mod brave;
pub mod duckduckgo;
pub mod github;
pub mod google;
pub mod google_images;
pub mod reddit;
pub mod wikipedia;
pub mod youtube;

use std::sync::Arc;

use reqwest::StatusCode;

use crate::core::types::{Category, EngineParams, EngineResults};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("blocked: {reason}")]
    Blocked { reason: String },
    #[error("upstream status {0}")]
    Status(u16),
    #[error("timed out after {0}ms")]
    Timeout(u64),
    #[error("transient: {0}")]
    Transient(String),
    #[error("fatal: {0}")]
    Fatal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A fully-described upstream request. Adapters build these; all I/O happens
/// in the executor.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub cookies: Vec<(String, String)>,
}

impl EngineRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            headers: Vec::new(),
            body: None,
            cookies: Vec::new(),
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn cookie(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((key.into(), value.into()));
        self
    }
}

/// One upstream search provider: static descriptor data plus the two pure
/// operations the executor drives. Adapters never perform I/O themselves.
pub trait Engine: Send + Sync {
    fn name(&self) -> &'static str;
    fn shortcut(&self) -> &'static str;
    fn categories(&self) -> &'static [Category];

    fn supports_paging(&self) -> bool {
        true
    }

    fn max_page(&self) -> u32 {
        10
    }

    fn timeout_ms(&self) -> u64 {
        4_000
    }

    fn weight(&self) -> f64 {
        1.0
    }

    fn disabled(&self) -> bool {
        false
    }

    fn build_request(&self, query: &str, params: &EngineParams) -> anyhow::Result<EngineRequest>;

    fn parse_response(&self, body: &str, params: &EngineParams) -> anyhow::Result<EngineResults>;
}

/// Every engine the orchestrator can schedule.
pub fn registry() -> Vec<Arc<dyn Engine>> {
    vec![
        Arc::new(google::Google),
        Arc::new(google_images::GoogleImages),
        Arc::new(bing::Bing),
        Arc::new(bing::BingImages),
        Arc::new(bing::BingNews),
        Arc::new(brave::Brave),
        Arc::new(duckduckgo::DuckDuckGoImages),
        Arc::new(duckduckgo::DuckDuckGoVideos),
        Arc::new(duckduckgo::DuckDuckGoNews),
        Arc::new(wikipedia::Wikipedia),
        Arc::new(youtube::YouTube),
        Arc::new(reddit::Reddit),
        Arc::new(arxiv::Arxiv),
        Arc::new(github::GitHub),
    ]
}

/// Classify anti-bot responses so failed engines report *why*.
pub fn detect_block_reason(status: StatusCode, body: &str) -> Option<String> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Some("http_429".to_string());
    }
    if status == StatusCode::FORBIDDEN {
        return Some("http_403".to_string());
    }
    if status == StatusCode::SERVICE_UNAVAILABLE {
        return Some("http_503".to_string());
    }

    let lower = body.to_lowercase();
    let maybe = [
        ("unusual traffic", "unusual_traffic"),
        (
            "your computer or network may be sending automated queries",
            "captcha",
        ),
        ("captcha", "captcha"),
        ("verify you are human", "captcha"),
        ("enable javascript", "js_required"),
        ("access denied", "access_denied"),
    ];

    for (needle, label) in maybe {
        if lower.contains(needle) {
            return Some(label.to_string());
        }
    }

    // Tiny HTML + any block-ish token.
    if body.len() < 3500 && (lower.contains("captcha") || lower.contains("blocked")) {
        return Some("block_page".to_string());
    }

    None
}

/// Realistic desktop/mobile user agents rotated across HTML engines.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36 Edg/126.0.0.0",
];

pub fn random_user_agent() -> &'static str {
    use rand::RngExt;
    let mut rng = rand::rng();
    let index = rng.random_range(0..USER_AGENTS.len());
    USER_AGENTS[index]
}

/// Standard navigation headers sent alongside the user agent.
pub fn stealth_headers() -> Vec<(String, String)> {
    vec![
        (
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                .to_string(),
        ),
        (
            "Accept-Language".to_string(),
            crate::core::config::accept_language(),
        ),
        ("Upgrade-Insecure-Requests".to_string(), "1".to_string()),
        ("Sec-Fetch-Dest".to_string(), "document".to_string()),
        ("Sec-Fetch-Mode".to_string(), "navigate".to_string()),
        ("Sec-Fetch-Site".to_string(), "none".to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_fourteen_engines_with_unique_names() {
        let engines = registry();
        assert_eq!(engines.len(), 14);
        let mut names: Vec<_> = engines.iter().map(|e| e.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 14);
    }

    #[test]
    fn block_reason_detects_status_and_markers() {
        assert_eq!(
            detect_block_reason(StatusCode::TOO_MANY_REQUESTS, "").as_deref(),
            Some("http_429")
        );
        assert_eq!(
            detect_block_reason(StatusCode::OK, "please verify you are human").as_deref(),
            Some("captcha")
        );
        assert_eq!(detect_block_reason(StatusCode::OK, "<html>results</html>"), None);
    }

    #[test]
    fn user_agent_pool_is_sane() {
        assert!(!USER_AGENTS.is_empty());
        assert!(random_user_agent().contains("Mozilla"));
    }
}
