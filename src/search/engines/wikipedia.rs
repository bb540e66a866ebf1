use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::core::types::{Category, EngineParams, EngineResult, EngineResults};
use crate::extract;

use super::{Engine, EngineRequest};

/// Article titles keep the characters MediaWiki leaves readable.
const TITLE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'-')
    .remove(b'.')
    .remove(b'(')
    .remove(b')')
    .remove(b',');

fn wiki_lang(locale: &str) -> &str {
    if locale == "all" {
        return "en";
    }
    match locale.split('-').next() {
        Some(lang) if !lang.is_empty() => lang,
        _ => "en",
    }
}

fn article_url(lang: &str, title: &str) -> String {
    let slug = title.replace(' ', "_");
    format!(
        "https://{}.wikipedia.org/wiki/{}",
        lang,
        utf8_percent_encode(&slug, TITLE_SET)
    )
}

pub struct Wikipedia;

impl Engine for Wikipedia {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    fn shortcut(&self) -> &'static str {
        "wp"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::General, Category::Science]
    }

    fn build_request(&self, query: &str, params: &EngineParams) -> anyhow::Result<EngineRequest> {
        let lang = wiki_lang(&params.locale);
        let mut url = url::Url::parse(&format!("https://{}.wikipedia.org/w/api.php", lang))?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("action", "query");
            qp.append_pair("list", "search");
            qp.append_pair("srsearch", query);
            qp.append_pair("format", "json");
            qp.append_pair("srlimit", "10");
            qp.append_pair("sroffset", &((params.page - 1) * 10).to_string());
            qp.append_pair("srprop", "snippet|timestamp");
        }

        Ok(EngineRequest::get(url.to_string()).header("User-Agent", super::random_user_agent()))
    }

    fn parse_response(&self, body: &str, params: &EngineParams) -> anyhow::Result<EngineResults> {
        let lang = wiki_lang(&params.locale).to_string();
        let value: serde_json::Value = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(_) => return Ok(EngineResults::default()),
        };

        let mut out = EngineResults::default();
        let hits = value
            .pointer("/query/search")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        for hit in hits {
            let Some(title) = hit.get("title").and_then(|t| t.as_str()) else {
                continue;
            };
            let snippet = hit
                .get("snippet")
                .and_then(|s| s.as_str())
                .map(extract::extract_text)
                .unwrap_or_default();

            out.results.push(EngineResult {
                url: article_url(&lang, title),
                title: title.to_string(),
                content: snippet,
                category: Category::General,
                published_at: hit
                    .get("timestamp")
                    .and_then(|t| t.as_str())
                    .map(|t| t.to_string()),
                ..Default::default()
            });
        }

        // The API reports spelling rewrites under searchinfo.
        if let Some(sugg) = value
            .pointer("/query/searchinfo/suggestion")
            .and_then(|v| v.as_str())
        {
            out.corrections.push(sugg.to_string());
        }

        Ok(out)
    }
}
