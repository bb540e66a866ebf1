use crate::core::types::{Category, EngineParams, EngineResult, EngineResults, Template};

use super::{Engine, EngineRequest};

/// Slice the `ytInitialData` JSON blob out of the results page by balancing
/// braces (string- and escape-aware).
fn extract_initial_data(html: &str) -> Option<serde_json::Value> {
    let marker = html.find("ytInitialData")?;
    let start = html[marker..].find('{').map(|p| marker + p)?;

    let bytes = html.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (off, &b) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return serde_json::from_str(&html[start..start + off + 1]).ok();
                }
            }
            _ => {}
        }
    }
    None
}

fn runs_text(value: &serde_json::Value) -> String {
    value
        .get("runs")
        .and_then(|r| r.as_array())
        .map(|runs| {
            runs.iter()
                .filter_map(|r| r.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("")
        })
        .or_else(|| {
            value
                .get("simpleText")
                .and_then(|t| t.as_str())
                .map(|s| s.to_string())
        })
        .unwrap_or_default()
}

fn parse_view_count(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

fn video_renderers(data: &serde_json::Value) -> Vec<serde_json::Value> {
    let sections = data
        .pointer("/contents/twoColumnSearchResultsRenderer/primaryContents/sectionListRenderer/contents")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let mut out = Vec::new();
    for section in sections {
        let items = section
            .pointer("/itemSectionRenderer/contents")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        for item in items {
            if let Some(vr) = item.get("videoRenderer") {
                out.push(vr.clone());
            }
        }
    }
    out
}

pub struct YouTube;

impl Engine for YouTube {
    fn name(&self) -> &'static str {
        "youtube"
    }

    fn shortcut(&self) -> &'static str {
        "yt"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::Videos]
    }

    fn supports_paging(&self) -> bool {
        false
    }

    fn max_page(&self) -> u32 {
        1
    }

    fn build_request(&self, query: &str, _params: &EngineParams) -> anyhow::Result<EngineRequest> {
        let mut url = url::Url::parse("https://www.youtube.com/results")?;
        url.query_pairs_mut().append_pair("search_query", query);

        Ok(EngineRequest::get(url.to_string())
            .header("User-Agent", super::random_user_agent())
            .cookie("CONSENT", "YES+"))
    }

    fn parse_response(&self, body: &str, _params: &EngineParams) -> anyhow::Result<EngineResults> {
        let Some(data) = extract_initial_data(body) else {
            return Ok(EngineResults::default());
        };

        let mut out = EngineResults::default();
        for vr in video_renderers(&data) {
            let Some(video_id) = vr.get("videoId").and_then(|v| v.as_str()) else {
                continue;
            };
            let title = vr.get("title").map(runs_text).unwrap_or_default();
            if title.is_empty() {
                continue;
            }

            let description = vr
                .get("descriptionSnippet")
                .map(runs_text)
                .filter(|s| !s.is_empty())
                .or_else(|| {
                    vr.pointer("/detailedMetadataSnippets/0/snippetText")
                        .map(runs_text)
                })
                .unwrap_or_default();

            out.results.push(EngineResult {
                url: format!("https://www.youtube.com/watch?v={}", video_id),
                title,
                content: description,
                category: Category::Videos,
                template: Some(Template::Videos),
                duration: vr
                    .get("lengthText")
                    .map(runs_text)
                    .filter(|s| !s.is_empty()),
                embed_url: Some(format!("https://www.youtube.com/embed/{}", video_id)),
                channel: vr
                    .get("ownerText")
                    .map(runs_text)
                    .filter(|s| !s.is_empty()),
                views: vr
                    .get("viewCountText")
                    .map(runs_text)
                    .as_deref()
                    .and_then(parse_view_count),
                thumbnail_url: vr
                    .pointer("/thumbnail/thumbnails")
                    .and_then(|t| t.as_array())
                    .and_then(|arr| arr.last())
                    .and_then(|t| t.get("url"))
                    .and_then(|u| u.as_str())
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

    fn fixture() -> String {
        let data = serde_json::json!({
            "contents": {"twoColumnSearchResultsRenderer": {"primaryContents": {"sectionListRenderer": {"contents": [
                {"itemSectionRenderer": {"contents": [
                    {"videoRenderer": {
                        "videoId": "abc123",
                        "title": {"runs": [{"text": "Learn Rust"}]},
                        "descriptionSnippet": {"runs": [{"text": "A "}, {"text": "course"}]},
                        "lengthText": {"simpleText": "10:30"},
                        "ownerText": {"runs": [{"text": "RustChannel"}]},
                        "viewCountText": {"simpleText": "1,234,567 views"},
                        "thumbnail": {"thumbnails": [{"url": "https://i.ytimg.com/small.jpg"}, {"url": "https://i.ytimg.com/big.jpg"}]}
                    }},
                    {"radioRenderer": {"title": "mix, skipped"}}
                ]}}
            ]}}}}
        });
        format!(
            "<html><script>var ytInitialData = {};</script></html>",
            data
        )
    }

    #[test]
    fn walks_video_renderers() {
        let parsed = YouTube
            .parse_response(&fixture(), &EngineParams::default())
            .unwrap();
        assert_eq!(parsed.results.len(), 1);
        let r = &parsed.results[0];
        assert_eq!(r.url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(r.title, "Learn Rust");
        assert_eq!(r.content, "A course");
        assert_eq!(r.duration.as_deref(), Some("10:30"));
        assert_eq!(r.channel.as_deref(), Some("RustChannel"));
        assert_eq!(r.views, Some(1_234_567));
        assert_eq!(r.embed_url.as_deref(), Some("https://www.youtube.com/embed/abc123"));
        assert_eq!(r.thumbnail_url.as_deref(), Some("https://i.ytimg.com/big.jpg"));
    }

    #[test]
    fn brace_matching_survives_braces_in_strings() {
        let html = r#"var ytInitialData = {"a": "with } brace", "b": {"c": 1}}; more"#;
        let data = extract_initial_data(html).unwrap();
        assert_eq!(data["b"]["c"], 1);
    }

    #[test]
    fn missing_blob_yields_empty() {
        let parsed = YouTube
            .parse_response("<html></html>", &EngineParams::default())
            .unwrap();
        assert!(parsed.results.is_empty());
    }
}
