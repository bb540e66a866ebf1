pub mod engines;
pub mod executor;

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::core::types::{Category, EngineParams, EngineResult, EngineResults};
use crate::core::AppState;
use engines::Engine;
use executor::execute_engine;

/// One deduplicated hit plus every engine that corroborated it.
#[derive(Debug, Clone)]
pub struct MergedResult {
    pub hit: EngineResult,
    pub engines: Vec<String>,
}

/// Outcome of one category fan-out. Engine failures are data here, not
/// errors: an all-failed fan-out is an empty `MetaResult`.
#[derive(Debug, Default)]
pub struct MetaResult {
    pub results: Vec<MergedResult>,
    pub suggestions: Vec<String>,
    pub corrections: Vec<String>,
    pub total_engines: usize,
    pub successful_engines: usize,
    pub failed_engines: Vec<String>,
}

/// Fan out `query` to every enabled engine serving `category`, then merge.
pub async fn search(
    state: &AppState,
    query: &str,
    category: Category,
    params: &EngineParams,
) -> MetaResult {
    let selected: Vec<Arc<dyn Engine>> = state
        .engines
        .iter()
        .filter(|e| !e.disabled() && e.categories().contains(&category))
        .filter(|e| {
            // Engines that cannot serve the requested page are skipped rather
            // than asked for page 1 again.
            params.page == 1 || (e.supports_paging() && params.page <= e.max_page())
        })
        .cloned()
        .collect();

    let mut meta = MetaResult {
        total_engines: selected.len(),
        ..Default::default()
    };
    if selected.is_empty() {
        return meta;
    }

    // DuckDuckGo's JSON endpoints need a vqd token minted from a prior HTML
    // page; resolve it once per query before scheduling those engines.
    let needs_vqd = selected.iter().any(|e| e.name().starts_with("duckduckgo"));
    let vqd = if needs_vqd {
        resolve_vqd(state, query).await
    } else {
        None
    };

    let tasks = selected.iter().map(|engine| {
        let mut engine_params = params.clone();
        if engine.name().starts_with("duckduckgo") {
            if let Some(vqd) = &vqd {
                engine_params
                    .engine_data
                    .insert("vqd".to_string(), vqd.clone());
            }
        }
        let engine = engine.clone();
        let client = state.http_client.clone();
        async move {
            let outcome = execute_engine(&client, engine.as_ref(), query, &engine_params).await;
            (engine.name(), outcome)
        }
    });

    let mut raw: Vec<EngineResult> = Vec::new();
    for (name, outcome) in join_all(tasks).await {
        match outcome {
            Ok(EngineResults {
                results,
                suggestions,
                corrections,
                ..
            }) => {
                meta.successful_engines += 1;
                raw.extend(results);
                for s in suggestions {
                    if !meta.suggestions.contains(&s) {
                        meta.suggestions.push(s);
                    }
                }
                for c in corrections {
                    if !meta.corrections.contains(&c) {
                        meta.corrections.push(c);
                    }
                }
            }
            Err(e) => {
                warn!("{}", e);
                meta.failed_engines.push(format!("{}: {}", name, e.source));
            }
        }
    }

    meta.results = merge_results(raw);
    debug!(
        "metasearch '{}' ({}) -> {} results, {}/{} engines ok",
        query,
        category,
        meta.results.len(),
        meta.successful_engines,
        meta.total_engines
    );
    meta
}

async fn resolve_vqd(state: &AppState, query: &str) -> Option<String> {
    if let Some(vqd) = state.vqd_memo.get(query).await {
        return Some(vqd);
    }

    let url = engines::duckduckgo::vqd_bootstrap_url(query);
    let resp = state
        .http_client
        .get(&url)
        .header("User-Agent", engines::random_user_agent())
        .send()
        .await;
    let body = match resp {
        Ok(r) => r.text().await.unwrap_or_default(),
        Err(e) => {
            warn!("vqd bootstrap fetch failed: {}", e);
            return None;
        }
    };

    match engines::duckduckgo::extract_vqd(&body) {
        Some(vqd) => {
            state.vqd_memo.insert(query.to_string(), vqd.clone()).await;
            Some(vqd)
        }
        None => {
            warn!("vqd token not found in bootstrap page");
            None
        }
    }
}

/// Canonical form used only for dedup: lowercase host, `www.` stripped,
/// trailing slash trimmed, fragment dropped; scheme, port, path, and query
/// kept verbatim.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(parsed) = url::Url::parse(trimmed) else {
        return trimmed.to_ascii_lowercase();
    };

    let host = parsed.host_str().unwrap_or("").to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let mut path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }

    let mut out = format!("{}://{}", parsed.scheme(), host);
    if let Some(port) = parsed.port() {
        out.push(':');
        out.push_str(&port.to_string());
    }
    out.push_str(&path);
    if let Some(query) = parsed.query() {
        out.push('?');
        out.push_str(query);
    }
    out
}

/// Merge duplicates by normalized URL: scores add, the longest content wins,
/// title and thumbnail keep the first non-empty value, and the surviving
/// order is first arrival. The final list is sorted by score descending with
/// ties left in insertion order.
pub fn merge_results(raw: Vec<EngineResult>) -> Vec<MergedResult> {
    let mut order: Vec<MergedResult> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for result in raw {
        let key = normalize_url(&result.url);
        match index.get(&key) {
            Some(&at) => {
                let merged = &mut order[at];
                merged.hit.score += result.score;
                if result.content.len() > merged.hit.content.len() {
                    merged.hit.content = result.content;
                }
                if merged.hit.title.is_empty() && !result.title.is_empty() {
                    merged.hit.title = result.title;
                }
                if merged.hit.thumbnail_url.is_none() {
                    merged.hit.thumbnail_url = result.thumbnail_url;
                }
                if merged.hit.published_at.is_none() {
                    merged.hit.published_at = result.published_at;
                }
                if !merged.engines.contains(&result.engine) {
                    merged.engines.push(result.engine);
                }
            }
            None => {
                index.insert(key, order.len());
                let engines = vec![result.engine.clone()];
                order.push(MergedResult {
                    hit: result,
                    engines,
                });
            }
        }
    }

    // Vec::sort_by is stable, so equal scores keep first-seen order.
    order.sort_by(|a, b| {
        b.hit
            .score
            .partial_cmp(&a.hit.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(url: &str, engine: &str, score: f64) -> EngineResult {
        EngineResult {
            url: url.to_string(),
            title: format!("title from {}", engine),
            content: String::new(),
            engine: engine.to_string(),
            score,
            ..Default::default()
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        for u in [
            "https://Example.com/A/b/",
            "http://www.foo.org:8080/x?b=2&a=1#frag",
            "not a url AT ALL",
            "https://example.com/",
        ] {
            let once = normalize_url(u);
            assert_eq!(normalize_url(&once), once, "norm(norm({:?}))", u);
        }
    }

    #[test]
    fn normalization_strips_www_slash_and_fragment() {
        assert_eq!(
            normalize_url("https://www.Example.com/a/"),
            "https://example.com/a"
        );
        assert_eq!(
            normalize_url("https://example.com/a#section"),
            "https://example.com/a"
        );
        assert_eq!(normalize_url("https://example.com/"), "https://example.com/");
        assert_eq!(
            normalize_url("https://example.com/x?q=1"),
            "https://example.com/x?q=1"
        );
    }

    #[test]
    fn duplicate_urls_merge_with_score_sum() {
        let merged = merge_results(vec![
            hit("https://Example.com/a/", "bing", 1.0),
            hit("https://www.example.com/a", "google", 2.0),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].hit.score, 3.0);
        assert_eq!(merged[0].engines, vec!["bing", "google"]);
        // First arrival wins the title.
        assert_eq!(merged[0].hit.title, "title from bing");
    }

    #[test]
    fn longest_content_wins_regardless_of_order() {
        let mut a = hit("https://example.com/a", "bing", 1.0);
        a.content = "short".to_string();
        let mut b = hit("https://example.com/a", "google", 1.0);
        b.content = "a much longer snippet of text".to_string();

        let forward = merge_results(vec![a.clone(), b.clone()]);
        let reverse = merge_results(vec![b, a]);
        assert_eq!(forward[0].hit.content, reverse[0].hit.content);
        assert!(forward[0].hit.content.starts_with("a much longer"));
    }

    #[test]
    fn sorted_by_score_with_stable_ties() {
        let merged = merge_results(vec![
            hit("https://example.com/low", "bing", 1.0),
            hit("https://example.com/tie1", "bing", 2.0),
            hit("https://example.com/tie2", "google", 2.0),
            hit("https://example.com/high", "brave", 5.0),
        ]);
        let urls: Vec<_> = merged.iter().map(|m| m.hit.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/high",
                "https://example.com/tie1",
                "https://example.com/tie2",
                "https://example.com/low",
            ]
        );
    }

    #[test]
    fn unparseable_urls_dedupe_by_lowercased_raw() {
        let merged = merge_results(vec![
            hit("Not A Url", "bing", 1.0),
            hit("not a url", "google", 1.0),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].hit.score, 2.0);
    }
}
