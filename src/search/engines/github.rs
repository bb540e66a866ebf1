use crate::core::types::{Category, EngineParams, EngineResult, EngineResults, Template};

use super::{Engine, EngineRequest};

fn format_stars(stars: u64) -> String {
    if stars >= 1_000_000 {
        format!("{:.1}M", stars as f64 / 1_000_000.0)
    } else if stars >= 1_000 {
        format!("{:.1}k", stars as f64 / 1_000.0)
    } else {
        stars.to_string()
    }
}

pub struct GitHub;

impl Engine for GitHub {
    fn name(&self) -> &'static str {
        "github"
    }

    fn shortcut(&self) -> &'static str {
        "gh"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::It]
    }

    fn build_request(&self, query: &str, params: &EngineParams) -> anyhow::Result<EngineRequest> {
        let mut url = url::Url::parse("https://api.github.com/search/repositories")?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("q", query);
            qp.append_pair("per_page", "10");
            qp.append_pair("page", &params.page.to_string());
        }

        Ok(EngineRequest::get(url.to_string())
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", super::random_user_agent()))
    }

    fn parse_response(&self, body: &str, _params: &EngineParams) -> anyhow::Result<EngineResults> {
        let value: serde_json::Value = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(_) => return Ok(EngineResults::default()),
        };

        let mut out = EngineResults::default();
        let items = value
            .get("items")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        for item in items {
            let Some(url) = item.get("html_url").and_then(|u| u.as_str()) else {
                continue;
            };
            let Some(name) = item.get("full_name").and_then(|n| n.as_str()) else {
                continue;
            };

            let description = item
                .get("description")
                .and_then(|d| d.as_str())
                .unwrap_or_default();
            let topics: Vec<String> = item
                .get("topics")
                .and_then(|t| t.as_array())
                .map(|arr| {
                    arr.iter()
                        .filter_map(|t| t.as_str())
                        .take(5)
                        .map(|t| t.to_string())
                        .collect()
                })
                .unwrap_or_default();
            let stars = item
                .get("stargazers_count")
                .and_then(|s| s.as_u64())
                .unwrap_or(0);

            let mut content = description.to_string();
            if !topics.is_empty() {
                if !content.is_empty() {
                    content.push_str(" · ");
                }
                content.push_str(&topics.join(", "));
            }

            out.results.push(EngineResult {
                url: url.to_string(),
                title: format!("{} ★ {}", name, format_stars(stars)),
                content,
                category: Category::It,
                template: Some(Template::Packages),
                stars: Some(stars),
                language: item
                    .get("language")
                    .and_then(|l| l.as_str())
                    .map(|l| l.to_string()),
                topics,
                published_at: item
                    .get("updated_at")
                    .and_then(|u| u.as_str())
                    .map(|u| u.to_string()),
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
    fn formats_star_counts() {
        assert_eq!(format_stars(950), "950");
        assert_eq!(format_stars(1_234), "1.2k");
        assert_eq!(format_stars(3_400_000), "3.4M");
    }

    #[test]
    fn parses_repository_items() {
        let body = r#"{"items":[{"html_url":"https://github.com/rust-lang/rust","full_name":"rust-lang/rust","description":"The Rust language","stargazers_count":95000,"language":"Rust","topics":["compiler","language","systems","safety","speed","extra-ignored"],"updated_at":"2024-05-01T00:00:00Z"}]}"#;
        let parsed = GitHub
            .parse_response(body, &EngineParams::default())
            .unwrap();
        assert_eq!(parsed.results.len(), 1);
        let r = &parsed.results[0];
        assert_eq!(r.title, "rust-lang/rust ★ 95.0k");
        assert_eq!(r.topics.len(), 5);
        assert!(r.content.contains("compiler, language"));
        assert_eq!(r.language.as_deref(), Some("Rust"));
    }

    #[test]
    fn error_payload_yields_empty() {
        let parsed = GitHub
            .parse_response(r#"{"message":"rate limited"}"#, &EngineParams::default())
            .unwrap();
        assert!(parsed.results.is_empty());
    }
}
