use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::core::types::Bang;
use crate::store::RecordStore;

/// Built-in trigger table: (trigger, name, url template, category).
/// Templates starting with `/` redirect internally with a category; the rest
/// substitute `{query}` and redirect externally.
const BUILTIN_BANGS: &[(&str, &str, &str, &str)] = &[
    ("g", "Google", "https://www.google.com/search?q={query}", "general"),
    ("b", "Bing", "https://www.bing.com/search?q={query}", "general"),
    ("br", "Brave", "https://search.brave.com/search?q={query}", "general"),
    ("d", "DuckDuckGo", "https://duckduckgo.com/?q={query}", "general"),
    ("w", "Wikipedia", "https://en.wikipedia.org/wiki/Special:Search?search={query}", "general"),
    ("gh", "GitHub", "https://github.com/search?q={query}", "it"),
    ("so", "Stack Overflow", "https://stackoverflow.com/search?q={query}", "it"),
    ("yt", "YouTube", "https://www.youtube.com/results?search_query={query}", "videos"),
    ("r", "Reddit", "https://www.reddit.com/search/?q={query}", "social"),
    ("a", "arXiv", "https://arxiv.org/search/?query={query}", "science"),
    ("mdn", "MDN Web Docs", "https://developer.mozilla.org/en-US/search?q={query}", "it"),
    ("npm", "npm", "https://www.npmjs.com/search?q={query}", "it"),
    ("crates", "crates.io", "https://crates.io/search?q={query}", "it"),
    ("docs", "Docs.rs", "https://docs.rs/releases/search?query={query}", "it"),
    ("maps", "OpenStreetMap", "https://www.openstreetmap.org/search?query={query}", "general"),
    ("wa", "Wolfram Alpha", "https://www.wolframalpha.com/input?i={query}", "science"),
    ("i", "Image search", "/images", "images"),
    ("v", "Video search", "/videos", "videos"),
    ("n", "News search", "/news", "news"),
];

pub fn is_builtin(trigger: &str) -> bool {
    let t = trigger.to_lowercase();
    BUILTIN_BANGS.iter().any(|(b, _, _, _)| *b == t)
}

pub fn builtin_bangs() -> Vec<Bang> {
    BUILTIN_BANGS
        .iter()
        .map(|(trigger, name, template, category)| Bang {
            trigger: trigger.to_string(),
            name: name.to_string(),
            url_template: template.to_string(),
            category: category.to_string(),
            is_builtin: true,
        })
        .collect()
}

fn lookup_builtin(trigger: &str) -> Option<Bang> {
    let t = trigger.to_lowercase();
    BUILTIN_BANGS
        .iter()
        .find(|(b, _, _, _)| *b == t)
        .map(|(trigger, name, template, category)| Bang {
            trigger: trigger.to_string(),
            name: name.to_string(),
            url_template: template.to_string(),
            category: category.to_string(),
            is_builtin: true,
        })
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct BangParseResult {
    /// The query with the bang token removed (or the original, untouched).
    pub query: String,
    pub bang: Option<String>,
    pub category: Option<String>,
    pub redirect: Option<String>,
}

/// Split `!trigger rest` / `rest !trigger` into (trigger, rest). A bang in
/// the middle of the query is not a bang; when both ends carry one, the
/// leading form wins.
fn split_bang(query: &str) -> Option<(String, String)> {
    let trimmed = query.trim();

    if let Some(rest) = trimmed.strip_prefix('!') {
        let (trigger, remainder) = match rest.find(char::is_whitespace) {
            Some(at) => (&rest[..at], rest[at..].trim_start()),
            None => (rest, ""),
        };
        if !trigger.is_empty() {
            return Some((trigger.to_lowercase(), remainder.to_string()));
        }
    }

    if let Some(at) = trimmed.rfind(char::is_whitespace) {
        let last = &trimmed[at..].trim_start();
        if let Some(trigger) = last.strip_prefix('!') {
            if !trigger.is_empty() {
                return Some((trigger.to_lowercase(), trimmed[..at].trim_end().to_string()));
            }
        }
    }

    None
}

pub async fn parse(query: &str, records: &RecordStore) -> BangParseResult {
    let passthrough = BangParseResult {
        query: query.to_string(),
        ..Default::default()
    };

    let Some((trigger, rest)) = split_bang(query) else {
        return passthrough;
    };

    let bang = match lookup_builtin(&trigger) {
        Some(b) => b,
        None => match records.get_bang(&trigger).await {
            Some(b) => b,
            None => return passthrough,
        },
    };

    let encoded = utf8_percent_encode(&rest, NON_ALPHANUMERIC).to_string();
    if let Some(path) = bang.url_template.strip_prefix('/') {
        return BangParseResult {
            query: rest,
            bang: Some(bang.trigger),
            category: Some(bang.category),
            redirect: Some(format!("/{}?q={}", path, encoded)),
        };
    }

    BangParseResult {
        query: rest,
        bang: Some(bang.trigger),
        category: Some(bang.category),
        redirect: Some(bang.url_template.replace("{query}", &encoded)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKv;
    use std::sync::Arc;

    fn records() -> RecordStore {
        RecordStore::new(Arc::new(MemoryKv::new()))
    }

    #[tokio::test]
    async fn leading_bang_redirects_externally() {
        let parsed = parse("!gh ripgrep", &records()).await;
        assert_eq!(parsed.bang.as_deref(), Some("gh"));
        assert_eq!(
            parsed.redirect.as_deref(),
            Some("https://github.com/search?q=ripgrep")
        );
        assert_eq!(parsed.query, "ripgrep");
    }

    #[tokio::test]
    async fn trailing_bang_also_matches() {
        let parsed = parse("rust tutorial !yt", &records()).await;
        assert_eq!(parsed.bang.as_deref(), Some("yt"));
        assert_eq!(parsed.query, "rust tutorial");
        assert!(parsed
            .redirect
            .as_deref()
            .unwrap()
            .contains("rust%20tutorial"));
    }

    #[tokio::test]
    async fn bang_in_the_middle_is_not_a_bang() {
        let parsed = parse("why is !g popular", &records()).await;
        assert!(parsed.bang.is_none());
        assert_eq!(parsed.query, "why is !g popular");
    }

    #[tokio::test]
    async fn leading_wins_over_trailing() {
        let parsed = parse("!g something !yt", &records()).await;
        assert_eq!(parsed.bang.as_deref(), Some("g"));
    }

    #[tokio::test]
    async fn unknown_trigger_passes_through() {
        let parsed = parse("!nosuchbang hello", &records()).await;
        assert!(parsed.bang.is_none());
        assert_eq!(parsed.query, "!nosuchbang hello");
    }

    #[tokio::test]
    async fn internal_bang_maps_to_category_path() {
        let parsed = parse("!i mountain sunset", &records()).await;
        assert_eq!(parsed.bang.as_deref(), Some("i"));
        assert_eq!(parsed.category.as_deref(), Some("images"));
        assert_eq!(
            parsed.redirect.as_deref(),
            Some("/images?q=mountain%20sunset")
        );
    }

    #[tokio::test]
    async fn trigger_match_is_case_insensitive() {
        let parsed = parse("!GH ripgrep", &records()).await;
        assert_eq!(parsed.bang.as_deref(), Some("gh"));
    }

    #[tokio::test]
    async fn custom_bangs_resolve_after_builtins() {
        let records = records();
        records
            .create_bang(
                "hn".into(),
                "Hacker News".into(),
                "https://hn.algolia.com/?q={query}".into(),
                "it".into(),
            )
            .await
            .unwrap();

        let parsed = parse("!hn zig", &records).await;
        assert_eq!(
            parsed.redirect.as_deref(),
            Some("https://hn.algolia.com/?q=zig")
        );
    }
}
