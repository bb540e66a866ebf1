use crate::core::types::{Category, EngineParams, EngineResult, EngineResults, TimeRange};

use super::{Engine, EngineRequest};

const SELFTEXT_MAX: usize = 500;

/// Reddit uses placeholder strings where a post has no real thumbnail.
fn valid_thumbnail(thumb: &str) -> bool {
    if thumb.is_empty() {
        return false;
    }
    if matches!(thumb, "self" | "default" | "nsfw" | "spoiler" | "image") {
        return false;
    }
    thumb.starts_with("http://") || thumb.starts_with("https://")
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push('…');
    out
}

pub struct Reddit;

impl Engine for Reddit {
    fn name(&self) -> &'static str {
        "reddit"
    }

    fn shortcut(&self) -> &'static str {
        "re"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::Social]
    }

    fn supports_paging(&self) -> bool {
        // Cursor-based pagination upstream; we only take the first page.
        false
    }

    fn max_page(&self) -> u32 {
        1
    }

    fn weight(&self) -> f64 {
        0.9
    }

    fn build_request(&self, query: &str, params: &EngineParams) -> anyhow::Result<EngineRequest> {
        let mut url = url::Url::parse("https://www.reddit.com/search.json")?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("q", query);
            qp.append_pair("limit", "25");
            qp.append_pair("sort", "relevance");
            let t = match params.time_range {
                TimeRange::Any => "all",
                TimeRange::Day => "day",
                TimeRange::Week => "week",
                TimeRange::Month => "month",
                TimeRange::Year => "year",
            };
            qp.append_pair("t", t);
            if params.safe_search == 0 {
                qp.append_pair("include_over_18", "on");
            }
        }

        Ok(EngineRequest::get(url.to_string()).header("User-Agent", super::random_user_agent()))
    }

    fn parse_response(&self, body: &str, _params: &EngineParams) -> anyhow::Result<EngineResults> {
        let value: serde_json::Value = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(_) => return Ok(EngineResults::default()),
        };

        let mut out = EngineResults::default();
        let children = value
            .pointer("/data/children")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        for child in children {
            let Some(post) = child.get("data") else {
                continue;
            };
            let Some(permalink) = post.get("permalink").and_then(|p| p.as_str()) else {
                continue;
            };
            let title = post
                .get("title")
                .and_then(|t| t.as_str())
                .unwrap_or_default();
            if title.is_empty() {
                continue;
            }

            let selftext = post
                .get("selftext")
                .and_then(|t| t.as_str())
                .unwrap_or_default();
            let thumbnail = post
                .get("thumbnail")
                .and_then(|t| t.as_str())
                .filter(|t| valid_thumbnail(t))
                .map(|t| t.to_string());
            let published_at = post
                .get("created_utc")
                .and_then(|c| c.as_f64())
                .and_then(|epoch| chrono::DateTime::from_timestamp(epoch as i64, 0))
                .map(|dt| dt.to_rfc3339());

            out.results.push(EngineResult {
                url: format!("https://www.reddit.com{}", permalink),
                title: title.to_string(),
                content: truncate_chars(selftext, SELFTEXT_MAX),
                category: Category::Social,
                source: post
                    .get("subreddit_name_prefixed")
                    .and_then(|s| s.as_str())
                    .map(|s| s.to_string()),
                thumbnail_url: thumbnail,
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
    fn filters_placeholder_thumbnails() {
        for bad in ["self", "default", "nsfw", "spoiler", "", "relative.jpg"] {
            assert!(!valid_thumbnail(bad), "{:?} should be rejected", bad);
        }
        assert!(valid_thumbnail("https://b.thumbs.redditmedia.com/x.jpg"));
    }

    #[test]
    fn truncates_long_selftext() {
        let long = "x".repeat(1_000);
        let cut = truncate_chars(&long, SELFTEXT_MAX);
        assert_eq!(cut.chars().count(), SELFTEXT_MAX + 1);
        assert!(cut.ends_with('…'));
        assert_eq!(truncate_chars("short", SELFTEXT_MAX), "short");
    }

    #[test]
    fn parses_listing() {
        let body = r#"{"data":{"children":[
{"data":{"permalink":"/r/rust/comments/1/abc/","title":"Hello rust","selftext":"body text","thumbnail":"self","subreddit_name_prefixed":"r/rust","created_utc":1700000000.0}},
{"data":{"permalink":"/r/rust/comments/2/def/","title":"","selftext":""}}
]}}"#;
        let parsed = Reddit
            .parse_response(body, &EngineParams::default())
            .unwrap();
        assert_eq!(parsed.results.len(), 1);
        let r = &parsed.results[0];
        assert_eq!(r.url, "https://www.reddit.com/r/rust/comments/1/abc/");
        assert_eq!(r.source.as_deref(), Some("r/rust"));
        assert!(r.thumbnail_url.is_none());
    }
}
