use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::core::types::{Category, EngineParams, EngineResult, EngineResults, TimeRange};
use crate::extract;

use super::{Engine, EngineRequest};

/// Mobile GSA user agents; Google serves the lighter `_fmt:prog` markup to
/// these.
const GSA_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Linux; Android 14; Pixel 8 Build/UQ1A.240205.002; wv) AppleWebKit/537.36 (KHTML, like Gecko) Version/4.0 Chrome/124.0.6367.54 Mobile Safari/537.36 GSA/15.16.33.28.arm64",
    "Mozilla/5.0 (Linux; Android 13; SM-G991B Build/TP1A.220624.014; wv) AppleWebKit/537.36 (KHTML, like Gecko) Version/4.0 Chrome/123.0.6312.99 Mobile Safari/537.36 GSA/15.10.37.28.arm64",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) GSA/317.0.613669502 Mobile/15E148 Safari/604.1",
];

/// Process-wide async-request id, regenerated hourly. Concurrent regeneration
/// is idempotent (last writer wins).
static ARC_ID: Mutex<Option<(String, Instant)>> = Mutex::new(None);

const ARC_ID_TTL: Duration = Duration::from_secs(60 * 60);

fn arc_id() -> String {
    let mut guard = match ARC_ID.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Some((id, minted)) = guard.as_ref() {
        if minted.elapsed() < ARC_ID_TTL {
            return id.clone();
        }
    }
    let id = fresh_arc_id();
    *guard = Some((id.clone(), Instant::now()));
    id
}

fn fresh_arc_id() -> String {
    use rand::RngExt;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    let suffix: String = (0..23)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect();
    format!("srp_{}", suffix)
}

fn gsa_user_agent() -> &'static str {
    use rand::RngExt;
    let mut rng = rand::rng();
    GSA_USER_AGENTS[rng.random_range(0..GSA_USER_AGENTS.len())]
}

pub(super) fn normalize_google_href(href: &str) -> Option<String> {
    if href.is_empty() {
        return None;
    }

    if href.starts_with("/url?") {
        if let Ok(url) = url::Url::parse(&format!("https://www.google.com{}", href)) {
            for (k, v) in url.query_pairs() {
                if (k == "q" || k == "url") && !v.is_empty() {
                    return Some(v.to_string());
                }
            }
        }
        return None;
    }

    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }

    None
}

/// Results pointing back at Google itself are navigation chrome, except the
/// translate subdomain which is a real destination.
fn is_google_internal(url_str: &str) -> bool {
    let Ok(url) = url::Url::parse(url_str) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    (host == "google.com" || host.ends_with(".google.com")) && !host.starts_with("translate.")
}

fn extract_snippet(container: &str) -> String {
    // Google markup changes often; try a few known snippet classes.
    let candidates = ["div.VwiC3b", "div.IsZvec", "span.aCOpRe", "div.MUxGbd"];
    for css in candidates {
        if let Some(el) = extract::find_elements(container, css).into_iter().next() {
            let text = extract::extract_text(&el);
            if text.len() >= 20 {
                return text;
            }
        }
    }
    String::new()
}

fn parse_containers(body: &str) -> Vec<String> {
    let primary = extract::find_elements(body, "div.MjjYud");
    if !primary.is_empty() {
        return primary;
    }
    // Legacy layout, minus knowledge blocks.
    extract::find_elements(body, "div.g")
        .into_iter()
        .filter(|el| {
            extract::attribute_of(el, "class")
                .map(|c| !c.split_whitespace().any(|t| t == "g-blk"))
                .unwrap_or(true)
        })
        .collect()
}

pub struct Google;

impl Engine for Google {
    fn name(&self) -> &'static str {
        "google"
    }

    fn shortcut(&self) -> &'static str {
        "go"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::General]
    }

    fn timeout_ms(&self) -> u64 {
        3_000
    }

    fn weight(&self) -> f64 {
        1.4
    }

    fn build_request(&self, query: &str, params: &EngineParams) -> anyhow::Result<EngineRequest> {
        let mut url = url::Url::parse("https://www.google.com/search")?;
        let lang = params.locale.split('-').next().unwrap_or("en");
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("q", query);
            qp.append_pair("hl", lang);
            qp.append_pair("start", &((params.page.saturating_sub(1)) * 10).to_string());
            qp.append_pair("asearch", "arc");
            qp.append_pair(
                "async",
                &format!("arc_id:{},use_ac:true,_fmt:prog", arc_id()),
            );
            match params.time_range {
                TimeRange::Any => {}
                TimeRange::Day => {
                    qp.append_pair("tbs", "qdr:d");
                }
                TimeRange::Week => {
                    qp.append_pair("tbs", "qdr:w");
                }
                TimeRange::Month => {
                    qp.append_pair("tbs", "qdr:m");
                }
                TimeRange::Year => {
                    qp.append_pair("tbs", "qdr:y");
                }
            }
            qp.append_pair(
                "safe",
                match params.safe_search {
                    0 => "off",
                    1 => "medium",
                    _ => "high",
                },
            );
        }

        Ok(EngineRequest::get(url.to_string())
            .header("User-Agent", gsa_user_agent())
            .cookie("CONSENT", "YES+"))
    }

    fn parse_response(&self, body: &str, _params: &EngineParams) -> anyhow::Result<EngineResults> {
        let mut out = EngineResults::default();

        for container in parse_containers(body) {
            let mut chosen: Option<(String, String)> = None;
            for a in extract::find_elements(&container, "a") {
                let Some(h3) = extract::find_elements(&a, "h3").into_iter().next() else {
                    continue;
                };
                let href = extract::attribute_of(&a, "href").unwrap_or_default();
                let Some(url) = normalize_google_href(&href) else {
                    continue;
                };
                let title = extract::extract_text(&h3);
                if title.is_empty() {
                    continue;
                }
                chosen = Some((url, title));
                break;
            }

            let Some((url, title)) = chosen else {
                continue;
            };
            if is_google_internal(&url) {
                continue;
            }

            out.results.push(EngineResult {
                url,
                title,
                content: extract_snippet(&container),
                category: Category::General,
                ..Default::default()
            });
        }

        // Related-search chips and the "showing results for" rewrite.
        for chip in extract::find_elements(body, "a.k8XOCe") {
            let text = extract::extract_text(&chip);
            if !text.is_empty() && !out.suggestions.contains(&text) {
                out.suggestions.push(text);
            }
        }
        for corr in extract::find_elements(body, "a#fprsl") {
            let text = extract::extract_text(&corr);
            if !text.is_empty() {
                out.corrections.push(text);
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arc_id_is_stable_within_the_hour() {
        let a = arc_id();
        let b = arc_id();
        assert_eq!(a, b);
        assert!(a.starts_with("srp_"));
        assert_eq!(a.len(), "srp_".len() + 23);
    }

    #[test]
    fn unwraps_redirect_hrefs() {
        assert_eq!(
            normalize_google_href("/url?q=https://example.com/x&sa=U").as_deref(),
            Some("https://example.com/x")
        );
        assert_eq!(normalize_google_href("/search?q=self"), None);
        assert_eq!(
            normalize_google_href("https://example.com/").as_deref(),
            Some("https://example.com/")
        );
    }

    #[test]
    fn rejects_google_hosts_except_translate() {
        assert!(is_google_internal("https://www.google.com/maps"));
        assert!(!is_google_internal("https://translate.google.com/x"));
        assert!(!is_google_internal("https://example.com/"));
    }

    #[test]
    fn parses_progressive_fragment() {
        let body = r#"
<div class="MjjYud"><a href="/url?q=https://example.com/rust&sa=U"><h3>Rust Language</h3></a>
<div class="VwiC3b">Rust is a systems programming language focused on safety.</div></div>
<div class="MjjYud"><a href="https://www.google.com/maps"><h3>Maps</h3></a></div>
<a class="k8XOCe">rust tutorial</a>
"#;
        let engine = Google;
        let parsed = engine
            .parse_response(body, &EngineParams::default())
            .unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].url, "https://example.com/rust");
        assert_eq!(parsed.results[0].title, "Rust Language");
        assert!(parsed.results[0].content.contains("systems programming"));
        assert_eq!(parsed.suggestions, vec!["rust tutorial".to_string()]);
    }

    #[test]
    fn request_carries_consent_cookie_and_async_params() {
        let engine = Google;
        let req = engine
            .build_request("rust", &EngineParams::default())
            .unwrap();
        assert!(req.url.contains("asearch=arc"));
        assert!(req.url.contains("_fmt%3Aprog") || req.url.contains("_fmt:prog"));
        assert!(req.cookies.iter().any(|(k, _)| k == "CONSENT"));
    }
}
