use crate::core::types::{Category, EngineParams, EngineResult, EngineResults, Template};

use super::{Engine, EngineRequest};

pub struct GoogleImages;

/// The `isch` endpoint answers with a JSON payload behind an XSSI guard
/// prefix; when Google reshuffles the shape we fall back to a raw harvest of
/// `["https://…", W, H]` triples.
fn parse_metadata_json(body: &str) -> Option<Vec<EngineResult>> {
    let start = body.find('{')?;
    let value: serde_json::Value = serde_json::from_str(body[start..].trim()).ok()?;
    let metadata = value.get("ischj")?.get("metadata")?.as_array()?;

    let mut out = Vec::new();
    for item in metadata {
        let original = item.get("original_image");
        let image_url = original
            .and_then(|o| o.get("url"))
            .and_then(|u| u.as_str())
            .unwrap_or_default();
        if image_url.is_empty() {
            continue;
        }

        let width = original
            .and_then(|o| o.get("width"))
            .and_then(|w| w.as_u64());
        let height = original
            .and_then(|o| o.get("height"))
            .and_then(|h| h.as_u64());
        let result = item.get("result");
        let page_url = result
            .and_then(|r| r.get("referrer_url"))
            .and_then(|u| u.as_str())
            .unwrap_or(image_url);
        let title = result
            .and_then(|r| r.get("page_title"))
            .and_then(|t| t.as_str())
            .unwrap_or_default();
        let source = result
            .and_then(|r| r.get("site_title"))
            .and_then(|s| s.as_str())
            .map(|s| s.to_string());
        let thumbnail = item
            .get("thumbnail")
            .and_then(|t| t.get("url"))
            .and_then(|u| u.as_str())
            .map(|u| u.to_string());

        out.push(EngineResult {
            url: page_url.to_string(),
            title: title.to_string(),
            category: Category::Images,
            template: Some(Template::Images),
            image_url: Some(image_url.to_string()),
            thumbnail_url: thumbnail,
            source,
            resolution: match (width, height) {
                (Some(w), Some(h)) => Some(format!("{}x{}", w, h)),
                _ => None,
            },
            ..Default::default()
        });
    }

    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn harvest_image_triples(body: &str) -> Vec<EngineResult> {
    let re = regex::Regex::new(
        r#"\["(https?://[^"]+?\.(?:jpe?g|png|webp|gif))",(\d+),(\d+)\]"#,
    );
    let Ok(re) = re else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for cap in re.captures_iter(body).take(50) {
        let url = cap[1].to_string();
        if !seen.insert(url.clone()) {
            continue;
        }
        let width = &cap[2];
        let height = &cap[3];
        out.push(EngineResult {
            url: url.clone(),
            title: String::new(),
            category: Category::Images,
            template: Some(Template::Images),
            image_url: Some(url),
            resolution: Some(format!("{}x{}", width, height)),
            ..Default::default()
        });
    }
    out
}

impl Engine for GoogleImages {
    fn name(&self) -> &'static str {
        "google_images"
    }

    fn shortcut(&self) -> &'static str {
        "goi"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::Images]
    }

    fn timeout_ms(&self) -> u64 {
        3_500
    }

    fn weight(&self) -> f64 {
        1.2
    }

    fn build_request(&self, query: &str, params: &EngineParams) -> anyhow::Result<EngineRequest> {
        let mut url = url::Url::parse("https://www.google.com/search")?;
        let lang = params.locale.split('-').next().unwrap_or("en");
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("q", query);
            qp.append_pair("tbm", "isch");
            qp.append_pair("hl", lang);
            qp.append_pair("asearch", "isch");
            qp.append_pair(
                "async",
                &format!("_fmt:json,p:1,ijn:{}", params.page.saturating_sub(1)),
            );
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
            .header("User-Agent", super::random_user_agent())
            .cookie("CONSENT", "YES+"))
    }

    fn parse_response(&self, body: &str, _params: &EngineParams) -> anyhow::Result<EngineResults> {
        let results = parse_metadata_json(body).unwrap_or_else(|| harvest_image_triples(body));
        Ok(EngineResults {
            results,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ischj_metadata() {
        let body = r#")]}'
{"ischj":{"metadata":[{"result":{"referrer_url":"https://example.com/cats","page_title":"Cats","site_title":"Example"},"original_image":{"url":"https://img.example.com/cat.jpg","width":800,"height":600},"thumbnail":{"url":"https://t.example.com/cat.jpg"}}]}}"#;
        let engine = GoogleImages;
        let parsed = engine
            .parse_response(body, &EngineParams::default())
            .unwrap();
        assert_eq!(parsed.results.len(), 1);
        let r = &parsed.results[0];
        assert_eq!(r.url, "https://example.com/cats");
        assert_eq!(r.image_url.as_deref(), Some("https://img.example.com/cat.jpg"));
        assert_eq!(r.resolution.as_deref(), Some("800x600"));
        assert_eq!(r.template, Some(Template::Images));
    }

    #[test]
    fn falls_back_to_triple_harvest() {
        let body = r#"garbage ["https://img.example.com/a.png",600,800] more ["https://img.example.com/a.png",600,800]"#;
        let engine = GoogleImages;
        let parsed = engine
            .parse_response(body, &EngineParams::default())
            .unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].resolution.as_deref(), Some("600x800"));
    }

    #[test]
    fn malformed_body_yields_empty() {
        let engine = GoogleImages;
        let parsed = engine
            .parse_response("<html>not json</html>", &EngineParams::default())
            .unwrap();
        assert!(parsed.results.is_empty());
    }
}
