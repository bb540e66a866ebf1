use crate::core::types::{Category, EngineParams, EngineResult, EngineResults, Template};

use super::{Engine, EngineRequest};

/// Pull the anti-automation token out of a DuckDuckGo HTML page. The JSON
/// endpoints refuse requests without it; the orchestrator fetches and caches
/// it before scheduling any of these engines.
pub fn extract_vqd(html: &str) -> Option<String> {
    for pat in [r#"vqd=["']([\d-]+)["']"#, r"vqd=([\d-]+)&"] {
        if let Ok(re) = regex::Regex::new(pat) {
            if let Some(cap) = re.captures(html) {
                return Some(cap[1].to_string());
            }
        }
    }
    None
}

/// Page the HTML fetch used to mint a `vqd` token for `query`.
pub fn vqd_bootstrap_url(query: &str) -> String {
    let mut url = url::Url::parse("https://duckduckgo.com/").expect("static url");
    url.query_pairs_mut()
        .append_pair("q", query)
        .append_pair("ia", "web");
    url.to_string()
}

fn js_endpoint(
    path: &str,
    query: &str,
    params: &EngineParams,
    page_step: u32,
) -> anyhow::Result<EngineRequest> {
    let mut url = url::Url::parse(&format!("https://duckduckgo.com/{}", path))?;
    {
        let mut qp = url.query_pairs_mut();
        let locale = if params.locale == "all" {
            "us-en".to_string()
        } else {
            // DDG wants region-language, lowercased.
            let mut parts = params.locale.split('-');
            let lang = parts.next().unwrap_or("en").to_ascii_lowercase();
            let region = parts
                .next()
                .map(|r| r.to_ascii_lowercase())
                .unwrap_or_else(|| "us".to_string());
            format!("{}-{}", region, lang)
        };
        qp.append_pair("l", &locale);
        qp.append_pair("o", "json");
        qp.append_pair("q", query);
        if let Some(vqd) = params.engine_data.get("vqd") {
            qp.append_pair("vqd", vqd);
        }
        qp.append_pair("f", ",,,");
        qp.append_pair("p", if params.safe_search == 0 { "-1" } else { "1" });
        if params.page > 1 {
            qp.append_pair("s", &((params.page - 1) * page_step).to_string());
        }
    }

    Ok(EngineRequest::get(url.to_string())
        .header("User-Agent", super::random_user_agent())
        .header("Referer", "https://duckduckgo.com/")
        .cookie("kl", "us-en"))
}

fn results_array(body: &str) -> Vec<serde_json::Value> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("results").and_then(|r| r.as_array()).cloned())
        .unwrap_or_default()
}

fn str_field(item: &serde_json::Value, key: &str) -> Option<String> {
    item.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

pub struct DuckDuckGoImages;

impl Engine for DuckDuckGoImages {
    fn name(&self) -> &'static str {
        "duckduckgo_images"
    }

    fn shortcut(&self) -> &'static str {
        "ddi"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::Images]
    }

    fn timeout_ms(&self) -> u64 {
        4_500
    }

    fn build_request(&self, query: &str, params: &EngineParams) -> anyhow::Result<EngineRequest> {
        js_endpoint("i.js", query, params, 100)
    }

    fn parse_response(&self, body: &str, _params: &EngineParams) -> anyhow::Result<EngineResults> {
        let mut out = EngineResults::default();
        for item in results_array(body) {
            let Some(image) = str_field(&item, "image") else {
                continue;
            };
            let width = item.get("width").and_then(|v| v.as_u64());
            let height = item.get("height").and_then(|v| v.as_u64());

            out.results.push(EngineResult {
                url: str_field(&item, "url").unwrap_or_else(|| image.clone()),
                title: str_field(&item, "title").unwrap_or_default(),
                category: Category::Images,
                template: Some(Template::Images),
                image_url: Some(image),
                thumbnail_url: str_field(&item, "thumbnail"),
                source: str_field(&item, "source"),
                resolution: match (width, height) {
                    (Some(w), Some(h)) => Some(format!("{}x{}", w, h)),
                    _ => None,
                },
                ..Default::default()
            });
        }
        Ok(out)
    }
}

pub struct DuckDuckGoVideos;

impl Engine for DuckDuckGoVideos {
    fn name(&self) -> &'static str {
        "duckduckgo_videos"
    }

    fn shortcut(&self) -> &'static str {
        "ddv"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::Videos]
    }

    fn timeout_ms(&self) -> u64 {
        4_500
    }

    fn build_request(&self, query: &str, params: &EngineParams) -> anyhow::Result<EngineRequest> {
        js_endpoint("v.js", query, params, 60)
    }

    fn parse_response(&self, body: &str, _params: &EngineParams) -> anyhow::Result<EngineResults> {
        let mut out = EngineResults::default();
        for item in results_array(body) {
            let Some(url) = str_field(&item, "content") else {
                continue;
            };

            out.results.push(EngineResult {
                url,
                title: str_field(&item, "title").unwrap_or_default(),
                content: str_field(&item, "description").unwrap_or_default(),
                category: Category::Videos,
                template: Some(Template::Videos),
                duration: str_field(&item, "duration"),
                embed_url: str_field(&item, "embed_url"),
                channel: str_field(&item, "uploader").or_else(|| str_field(&item, "publisher")),
                views: item
                    .get("statistics")
                    .and_then(|s| s.get("viewCount"))
                    .and_then(|v| v.as_u64()),
                published_at: str_field(&item, "published"),
                thumbnail_url: item
                    .get("images")
                    .and_then(|i| i.get("medium").or_else(|| i.get("small")))
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
                ..Default::default()
            });
        }
        Ok(out)
    }
}

pub struct DuckDuckGoNews;

impl Engine for DuckDuckGoNews {
    fn name(&self) -> &'static str {
        "duckduckgo_news"
    }

    fn shortcut(&self) -> &'static str {
        "ddn"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::News]
    }

    fn timeout_ms(&self) -> u64 {
        4_500
    }

    fn build_request(&self, query: &str, params: &EngineParams) -> anyhow::Result<EngineRequest> {
        js_endpoint("news.js", query, params, 30)
    }

    fn parse_response(&self, body: &str, _params: &EngineParams) -> anyhow::Result<EngineResults> {
        let mut out = EngineResults::default();
        for item in results_array(body) {
            let Some(url) = str_field(&item, "url") else {
                continue;
            };

            let published_at = item
                .get("date")
                .and_then(|v| v.as_i64())
                .and_then(|epoch| chrono::DateTime::from_timestamp(epoch, 0))
                .map(|dt| dt.to_rfc3339());

            out.results.push(EngineResult {
                url,
                title: str_field(&item, "title").unwrap_or_default(),
                content: str_field(&item, "excerpt").unwrap_or_default(),
                category: Category::News,
                template: Some(Template::News),
                source: str_field(&item, "source"),
                thumbnail_url: str_field(&item, "image"),
                published_at,
                ..Default::default()
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_vqd_tokens() {
        assert_eq!(
            extract_vqd(r#"...vqd="4-12345678901234567890"..."#).as_deref(),
            Some("4-12345678901234567890")
        );
        assert_eq!(
            extract_vqd("href=\"/i.js?q=x&vqd=3-987654321&o=json\"").as_deref(),
            Some("3-987654321")
        );
        assert_eq!(extract_vqd("<html>nothing here</html>"), None);
    }

    #[test]
    fn request_includes_vqd_when_present() {
        let mut params = EngineParams::default();
        params
            .engine_data
            .insert("vqd".to_string(), "4-111".to_string());
        let req = DuckDuckGoImages.build_request("cats", &params).unwrap();
        assert!(req.url.contains("vqd=4-111"));

        // Absent vqd still yields a URL; execution will fail upstream.
        let req = DuckDuckGoImages
            .build_request("cats", &EngineParams::default())
            .unwrap();
        assert!(!req.url.contains("vqd="));
    }

    #[test]
    fn parses_image_results() {
        let body = r#"{"results":[{"title":"A cat","image":"https://i.example.com/c.jpg","thumbnail":"https://t.example.com/c.jpg","url":"https://example.com/cat","width":640,"height":480,"source":"Example"}]}"#;
        let parsed = DuckDuckGoImages
            .parse_response(body, &EngineParams::default())
            .unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].resolution.as_deref(), Some("640x480"));
    }

    #[test]
    fn parses_news_epoch_dates() {
        let body = r#"{"results":[{"title":"Headline","url":"https://news.example.com/1","excerpt":"Body","date":1700000000,"source":"Wire"}]}"#;
        let parsed = DuckDuckGoNews
            .parse_response(body, &EngineParams::default())
            .unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert!(parsed.results[0]
            .published_at
            .as_deref()
            .unwrap()
            .starts_with("2023-11-14"));
    }

    #[test]
    fn malformed_json_yields_empty() {
        let parsed = DuckDuckGoVideos
            .parse_response("<html>block page</html>", &EngineParams::default())
            .unwrap();
        assert!(parsed.results.is_empty());
    }
}
