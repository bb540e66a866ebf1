use scraper::{Html, Selector};

use crate::core::types::{Category, EngineParams, EngineResult, EngineResults, TimeRange};
use crate::extract;

use super::{Engine, EngineRequest};

fn normalize_href(href: &str) -> Option<String> {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    None
}

fn element_text(el: scraper::ElementRef<'_>) -> String {
    extract::collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

pub struct Brave;

impl Engine for Brave {
    fn name(&self) -> &'static str {
        "brave"
    }

    fn shortcut(&self) -> &'static str {
        "br"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::General]
    }

    fn max_page(&self) -> u32 {
        5
    }

    fn timeout_ms(&self) -> u64 {
        3_500
    }

    fn weight(&self) -> f64 {
        1.1
    }

    fn build_request(&self, query: &str, params: &EngineParams) -> anyhow::Result<EngineRequest> {
        let mut url = url::Url::parse("https://search.brave.com/search")?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("q", query);
            if params.page > 1 {
                qp.append_pair("offset", &(params.page - 1).to_string());
            }
            let tf = match params.time_range {
                TimeRange::Any => None,
                TimeRange::Day => Some("pd"),
                TimeRange::Week => Some("pw"),
                TimeRange::Month => Some("pm"),
                TimeRange::Year => Some("py"),
            };
            if let Some(tf) = tf {
                qp.append_pair("tf", tf);
            }
        }

        let safesearch = match params.safe_search {
            0 => "off",
            1 => "moderate",
            _ => "strict",
        };

        Ok(EngineRequest::get(url.to_string())
            .header("User-Agent", super::random_user_agent())
            .cookie("safesearch", safesearch))
    }

    fn parse_response(&self, body: &str, _params: &EngineParams) -> anyhow::Result<EngineResults> {
        let mut out = EngineResults::default();
        let doc = Html::parse_document(body);
        let (Ok(sel_item), Ok(sel_link)) =
            (Selector::parse("div.snippet"), Selector::parse("a"))
        else {
            return Ok(out);
        };
        let sel_title = Selector::parse("div.title, span.snippet-title, div.url").ok();
        let sel_desc = Selector::parse("div.snippet-description, p.snippet-description").ok();

        for item in doc.select(&sel_item) {
            let Some(link) = item
                .select(&sel_link)
                .find(|a| a.value().attr("href").is_some_and(|h| h.starts_with("http")))
            else {
                continue;
            };
            let Some(url) = normalize_href(link.value().attr("href").unwrap_or("")) else {
                continue;
            };

            let title = sel_title
                .as_ref()
                .and_then(|sel| item.select(sel).next())
                .map(element_text)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| element_text(link));
            if title.is_empty() {
                continue;
            }

            out.results.push(EngineResult {
                url,
                title,
                content: sel_desc
                    .as_ref()
                    .and_then(|sel| item.select(sel).next())
                    .map(element_text)
                    .unwrap_or_default(),
                category: Category::General,
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
    fn parses_snippet_containers() {
        let body = r#"<main>
<div class="snippet"><a href="https://example.com/a"><div class="title">Alpha</div></a>
<div class="snippet-description">First description.</div></div>
<div class="snippet"><a href="/internal"><div class="title">Skip me</div></a></div>
</main>"#;
        let parsed = Brave
            .parse_response(body, &EngineParams::default())
            .unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].title, "Alpha");
        assert_eq!(parsed.results[0].content, "First description.");
    }

    #[test]
    fn time_range_and_safesearch_map_to_brave_params() {
        let params = EngineParams {
            time_range: TimeRange::Month,
            safe_search: 2,
            ..Default::default()
        };
        let req = Brave.build_request("x", &params).unwrap();
        assert!(req.url.contains("tf=pm"));
        assert!(req
            .cookies
            .iter()
            .any(|(k, v)| k == "safesearch" && v == "strict"));
    }
}
