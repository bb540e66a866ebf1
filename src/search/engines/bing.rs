use base64::Engine as _;
use scraper::{Html, Selector};

use crate::core::types::{Category, EngineParams, EngineResult, EngineResults, Template, TimeRange};
use crate::extract;

use super::{Engine, EngineRequest};

/// Unwrap Bing's `/ck/a` click-tracking links. The `u` parameter carries the
/// destination as `a1<base64url>`.
pub(super) fn normalize_bing_href(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if !(href.starts_with("http://") || href.starts_with("https://")) {
        return None;
    }

    let Ok(url) = url::Url::parse(href) else {
        return Some(href.to_string());
    };

    if matches!(url.host_str(), Some("www.bing.com") | Some("bing.com"))
        && url.path().starts_with("/ck/")
    {
        for (k, v) in url.query_pairs() {
            if k == "u" && !v.trim().is_empty() {
                let raw = v.strip_prefix("a1").unwrap_or(&v);
                let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
                    .decode(raw)
                    .or_else(|_| base64::engine::general_purpose::STANDARD.decode(raw));
                if let Ok(bytes) = decoded {
                    if let Ok(s) = String::from_utf8(bytes) {
                        let s = s.trim().to_string();
                        if s.starts_with("http://") || s.starts_with("https://") {
                            return Some(s);
                        }
                    }
                }
                break;
            }
        }
    }

    Some(href.to_string())
}

fn safe_search_cookie(level: u8) -> &'static str {
    match level {
        0 => "ADLT=OFF",
        1 => "ADLT=DEMOTE",
        _ => "ADLT=STRICT",
    }
}

fn element_text(el: scraper::ElementRef<'_>) -> String {
    extract::collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

pub struct Bing;

impl Engine for Bing {
    fn name(&self) -> &'static str {
        "bing"
    }

    fn shortcut(&self) -> &'static str {
        "bi"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::General]
    }

    fn timeout_ms(&self) -> u64 {
        3_000
    }

    fn weight(&self) -> f64 {
        1.2
    }

    fn build_request(&self, query: &str, params: &EngineParams) -> anyhow::Result<EngineRequest> {
        let mut url = url::Url::parse("https://www.bing.com/search")?;
        let lang = params.locale.split('-').next().unwrap_or("en");
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("q", query);
            qp.append_pair("first", &((params.page - 1) * 10 + 1).to_string());
            qp.append_pair("setlang", lang);
            // Bing's private freshness filter.
            let ez = match params.time_range {
                TimeRange::Any => None,
                TimeRange::Day => Some("1"),
                TimeRange::Week => Some("2"),
                TimeRange::Month => Some("3"),
                TimeRange::Year => Some("5"),
            };
            if let Some(ez) = ez {
                qp.append_pair("filters", &format!("ex1:\"ez{}\"", ez));
            }
        }

        Ok(EngineRequest::get(url.to_string())
            .header("User-Agent", super::random_user_agent())
            .cookie("SRCHHPGUSR", safe_search_cookie(params.safe_search))
            .cookie("_EDGE_CD", format!("m={}", params.locale)))
    }

    fn parse_response(&self, body: &str, _params: &EngineParams) -> anyhow::Result<EngineResults> {
        let mut out = EngineResults::default();
        let doc = Html::parse_document(body);
        let (Ok(sel_item), Ok(sel_link)) =
            (Selector::parse("li.b_algo"), Selector::parse("h2 a"))
        else {
            return Ok(out);
        };
        let sel_snip = Selector::parse("div.b_caption p").ok();
        let sel_sugg = Selector::parse("div.b_rs a, li.b_ans a.b_restorab").ok();
        let sel_corr = Selector::parse("div#sp_requery a").ok();

        for item in doc.select(&sel_item) {
            let Some(link) = item.select(&sel_link).next() else {
                continue;
            };
            let href_raw = link.value().attr("href").unwrap_or("");
            let Some(url) = normalize_bing_href(href_raw) else {
                continue;
            };
            let title = element_text(link);
            if title.is_empty() {
                continue;
            }
            let snippet = sel_snip
                .as_ref()
                .and_then(|sel| item.select(sel).next())
                .map(element_text)
                .unwrap_or_default();

            out.results.push(EngineResult {
                url,
                title,
                content: snippet,
                category: Category::General,
                ..Default::default()
            });
        }

        if let Some(sel) = &sel_sugg {
            for s in doc.select(sel) {
                let text = element_text(s);
                if !text.is_empty() && !out.suggestions.contains(&text) {
                    out.suggestions.push(text);
                }
            }
        }
        if let Some(sel) = &sel_corr {
            for c in doc.select(sel) {
                let text = element_text(c);
                if !text.is_empty() {
                    out.corrections.push(text);
                }
            }
        }

        Ok(out)
    }
}

pub struct BingImages;

impl Engine for BingImages {
    fn name(&self) -> &'static str {
        "bing_images"
    }

    fn shortcut(&self) -> &'static str {
        "bii"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::Images]
    }

    fn timeout_ms(&self) -> u64 {
        3_500
    }

    fn build_request(&self, query: &str, params: &EngineParams) -> anyhow::Result<EngineRequest> {
        let mut url = url::Url::parse("https://www.bing.com/images/search")?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("q", query);
            qp.append_pair("first", &((params.page - 1) * 35 + 1).to_string());
            qp.append_pair("count", "35");
            // Freshness in minutes.
            let minutes = match params.time_range {
                TimeRange::Any => None,
                TimeRange::Day => Some(1_440u32),
                TimeRange::Week => Some(10_080),
                TimeRange::Month => Some(43_200),
                TimeRange::Year => Some(525_600),
            };
            if let Some(m) = minutes {
                qp.append_pair("qft", &format!("+filterui:age-lt{}", m));
            }
        }

        Ok(EngineRequest::get(url.to_string())
            .header("User-Agent", super::random_user_agent())
            .cookie("SRCHHPGUSR", safe_search_cookie(params.safe_search)))
    }

    fn parse_response(&self, body: &str, _params: &EngineParams) -> anyhow::Result<EngineResults> {
        let mut out = EngineResults::default();
        let doc = Html::parse_document(body);
        let Ok(sel_item) = Selector::parse("a.iusc") else {
            return Ok(out);
        };

        for item in doc.select(&sel_item) {
            let Some(meta) = item.value().attr("m") else {
                continue;
            };
            let Ok(meta) = serde_json::from_str::<serde_json::Value>(meta) else {
                continue;
            };
            let image_url = meta.get("murl").and_then(|v| v.as_str()).unwrap_or("");
            if image_url.is_empty() {
                continue;
            }
            let page_url = meta
                .get("purl")
                .and_then(|v| v.as_str())
                .unwrap_or(image_url);
            let title = meta
                .get("t")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();

            out.results.push(EngineResult {
                url: page_url.to_string(),
                title,
                category: Category::Images,
                template: Some(Template::Images),
                image_url: Some(image_url.to_string()),
                thumbnail_url: meta
                    .get("turl")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
                ..Default::default()
            });
        }

        Ok(out)
    }
}

pub struct BingNews;

impl Engine for BingNews {
    fn name(&self) -> &'static str {
        "bing_news"
    }

    fn shortcut(&self) -> &'static str {
        "bin"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::News]
    }

    fn timeout_ms(&self) -> u64 {
        3_500
    }

    fn build_request(&self, query: &str, params: &EngineParams) -> anyhow::Result<EngineRequest> {
        let mut url = url::Url::parse("https://www.bing.com/news/search")?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("q", query);
            qp.append_pair("first", &((params.page - 1) * 10 + 1).to_string());
            let interval = match params.time_range {
                TimeRange::Day => Some("4"),
                TimeRange::Week => Some("7"),
                TimeRange::Month | TimeRange::Year => Some("9"),
                TimeRange::Any => None,
            };
            if let Some(iv) = interval {
                qp.append_pair("qft", &format!("interval=\"{}\"", iv));
            }
        }

        Ok(EngineRequest::get(url.to_string())
            .header("User-Agent", super::random_user_agent())
            .cookie("SRCHHPGUSR", safe_search_cookie(params.safe_search)))
    }

    fn parse_response(&self, body: &str, _params: &EngineParams) -> anyhow::Result<EngineResults> {
        let mut out = EngineResults::default();
        let doc = Html::parse_document(body);
        let (Ok(sel_card), Ok(sel_title)) =
            (Selector::parse("div.news-card"), Selector::parse("a.title"))
        else {
            return Ok(out);
        };
        let sel_snip = Selector::parse("div.snippet").ok();
        let sel_img = Selector::parse("img").ok();

        for card in doc.select(&sel_card) {
            let url = card
                .value()
                .attr("url")
                .or_else(|| card.value().attr("data-url"))
                .unwrap_or("");
            let Some(url) = normalize_bing_href(url) else {
                continue;
            };
            let title = card
                .select(&sel_title)
                .next()
                .map(element_text)
                .unwrap_or_default();
            if title.is_empty() {
                continue;
            }

            out.results.push(EngineResult {
                url,
                title,
                content: sel_snip
                    .as_ref()
                    .and_then(|sel| card.select(sel).next())
                    .map(element_text)
                    .unwrap_or_default(),
                category: Category::News,
                template: Some(Template::News),
                source: card.value().attr("data-author").map(|s| s.to_string()),
                thumbnail_url: sel_img
                    .as_ref()
                    .and_then(|sel| card.select(sel).next())
                    .and_then(|img| img.value().attr("src"))
                    .map(|s| s.to_string()),
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
    fn decodes_click_tracking_urls() {
        // base64url("https://example.com/page") with the a1 prefix.
        let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode("https://example.com/page");
        let href = format!("https://www.bing.com/ck/a?u=a1{}&p=x", encoded);
        assert_eq!(
            normalize_bing_href(&href).as_deref(),
            Some("https://example.com/page")
        );
    }

    #[test]
    fn passes_plain_urls_through() {
        assert_eq!(
            normalize_bing_href("https://example.com/a").as_deref(),
            Some("https://example.com/a")
        );
        assert_eq!(normalize_bing_href("/relative"), None);
    }

    #[test]
    fn parses_web_results() {
        let body = r#"<html><body><ol>
<li class="b_algo"><h2><a href="https://example.com/one">First result</a></h2>
<div class="b_caption"><p>Snippet one here.</p></div></li>
<li class="b_algo"><h2><a href="https://example.com/two">Second</a></h2></li>
</ol></body></html>"#;
        let parsed = Bing.parse_response(body, &EngineParams::default()).unwrap();
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[0].content, "Snippet one here.");
    }

    #[test]
    fn parses_image_metadata_attribute() {
        let body = r#"<a class="iusc" m='{"murl":"https://img.example.com/x.jpg","turl":"https://t.example.com/x.jpg","purl":"https://example.com/x","t":"An image"}'></a>"#;
        let parsed = BingImages
            .parse_response(body, &EngineParams::default())
            .unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].url, "https://example.com/x");
        assert_eq!(
            parsed.results[0].image_url.as_deref(),
            Some("https://img.example.com/x.jpg")
        );
    }

    #[test]
    fn time_range_maps_to_private_filters() {
        let mut params = EngineParams {
            time_range: TimeRange::Day,
            ..Default::default()
        };
        let req = Bing.build_request("x", &params).unwrap();
        assert!(req.url.contains("ez1"));

        params.time_range = TimeRange::Week;
        let req = BingImages.build_request("x", &params).unwrap();
        assert!(req.url.contains("age-lt10080"));

        let req = BingNews.build_request("x", &params).unwrap();
        assert!(req.url.contains("interval"));
    }
}
