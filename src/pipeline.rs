use std::time::Instant;

use tracing::{debug, info};

use crate::core::types::{
    Category, EngineParams, SearchOptions, SearchResponse, SearchResult,
};
use crate::core::AppState;
use crate::features::{bangs, instant, knowledge};
use crate::search::{self, MergedResult};

fn base36_u64(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn sanitize(opts: &SearchOptions) -> (u32, usize) {
    (opts.page.max(1), opts.per_page.max(1))
}

/// Composite cache key: every option that changes the result set is part of
/// the key, never the query alone.
fn composite_key(prefix: &str, query: &str, opts: &SearchOptions) -> String {
    let (page, per_page) = sanitize(opts);
    format!(
        "{}q={}|p={}|pp={}|t={}|r={}|l={}|s={}|site={}|lens={}",
        prefix,
        query,
        page,
        per_page,
        opts.time_range.as_str(),
        opts.region,
        opts.language,
        opts.safe_search,
        opts.site.as_deref().unwrap_or(""),
        opts.lens.as_deref().unwrap_or(""),
    )
}

fn empty_response(query: &str, opts: &SearchOptions, started: Instant) -> SearchResponse {
    let (page, per_page) = sanitize(opts);
    SearchResponse {
        query: query.to_string(),
        page,
        per_page,
        search_time_ms: started.elapsed().as_millis() as u64,
        ..Default::default()
    }
}

fn engine_params(opts: &SearchOptions) -> EngineParams {
    let locale = if opts.region.is_empty() {
        opts.language.clone()
    } else {
        format!("{}-{}", opts.language, opts.region)
    };
    EngineParams {
        page: opts.page.max(1),
        locale,
        time_range: opts.time_range,
        safe_search: opts.safe_search.min(2),
        engine_data: Default::default(),
    }
}

fn category_for(opts: &SearchOptions) -> Category {
    match opts.file_type.as_deref() {
        Some("image") => Category::Images,
        Some("video") => Category::Videos,
        Some("news") => Category::News,
        _ => Category::General,
    }
}

fn to_search_results(merged: Vec<MergedResult>) -> Vec<SearchResult> {
    let now = chrono::Utc::now();
    let stamp = base36_u64(now.timestamp_millis() as u64);

    merged
        .into_iter()
        .enumerate()
        .map(|(idx, m)| {
            let domain = url::Url::parse(&m.hit.url)
                .ok()
                .and_then(|u| u.host_str().map(|h| h.to_string()))
                .unwrap_or_default();
            SearchResult {
                id: format!("{}-{}", stamp, idx),
                domain,
                thumbnail: m.hit.thumbnail_url.or(m.hit.image_url),
                published: m.hit.published_at,
                url: m.hit.url,
                title: m.hit.title,
                snippet: m.hit.content,
                score: m.hit.score,
                crawled_at: now,
                engine: m.hit.engine,
                engines: m.engines,
            }
        })
        .collect()
}

fn domain_matches(result_domain: &str, domain: &str) -> bool {
    result_domain == domain || result_domain.ends_with(&format!(".{}", domain))
}

/// An enabled lens restricts results to its domain list.
async fn apply_lens(state: &AppState, lens_id: Option<&str>, results: &mut Vec<SearchResult>) {
    let Some(lens_id) = lens_id else {
        return;
    };
    let Some(lens) = state.records.get_lens(lens_id).await else {
        return;
    };
    if !lens.enabled || lens.domains.is_empty() {
        return;
    }
    results.retain(|r| lens.domains.iter().any(|d| domain_matches(&r.domain, d)));
}

/// Per-domain preferences: blocked domains disappear, boosted and lowered
/// domains get their score scaled, then the list is re-sorted (stable, so
/// equal scores keep their order).
async fn apply_preferences(state: &AppState, results: &mut Vec<SearchResult>) {
    let prefs = state.records.list_preferences().await;
    if prefs.is_empty() {
        return;
    }

    results.retain(|r| {
        !prefs
            .iter()
            .any(|p| p.action == "block" && domain_matches(&r.domain, &p.domain))
    });
    for r in results.iter_mut() {
        for p in &prefs {
            if !domain_matches(&r.domain, &p.domain) {
                continue;
            }
            let level = p.level.clamp(1, 5) as f64;
            match p.action.as_str() {
                "boost" => r.score *= 1.0 + 0.25 * level,
                "lower" => r.score /= 1.0 + 0.25 * level,
                _ => {}
            }
        }
    }
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// The composed search operation: bang parsing, cache lookup, parallel
/// instant/knowledge/metasearch, pagination, cache write, and an async
/// history append that can never affect the response.
pub async fn search(state: &AppState, query: &str, opts: &SearchOptions) -> SearchResponse {
    run(state, query, opts, None, "", true).await
}

pub async fn search_images(state: &AppState, query: &str, opts: &SearchOptions) -> SearchResponse {
    run(state, query, opts, Some(Category::Images), "img:", false).await
}

pub async fn search_videos(state: &AppState, query: &str, opts: &SearchOptions) -> SearchResponse {
    run(state, query, opts, Some(Category::Videos), "vid:", false).await
}

pub async fn search_news(state: &AppState, query: &str, opts: &SearchOptions) -> SearchResponse {
    run(state, query, opts, Some(Category::News), "news:", false).await
}

async fn run(
    state: &AppState,
    query: &str,
    opts: &SearchOptions,
    category_override: Option<Category>,
    cache_prefix: &str,
    with_widgets: bool,
) -> SearchResponse {
    let started = Instant::now();
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return empty_response(trimmed, opts, started);
    }
    let (page, per_page) = sanitize(opts);

    // Bangs short-circuit everything else.
    let parsed = bangs::parse(trimmed, &state.records).await;
    if let Some(redirect) = parsed.redirect {
        info!("bang '!{}' redirect", parsed.bang.as_deref().unwrap_or(""));
        let mut response = empty_response(trimmed, opts, started);
        response.redirect = Some(redirect);
        response.bang = parsed.bang;
        response.category = parsed.category;
        return response;
    }

    let key = composite_key(cache_prefix, trimmed, opts);
    if let Some(cached) = state.cache.get_search::<SearchResponse>(&key).await {
        // Cached responses keep their original search_time_ms on purpose.
        debug!("search cache hit");
        return cached;
    }

    let _permit = state
        .outbound_limit
        .acquire()
        .await
        .expect("semaphore closed");

    let category = category_override.unwrap_or_else(|| category_for(opts));
    let params = engine_params(opts);

    // A site restriction narrows the upstream query itself; widgets and the
    // knowledge panel still see the bare query.
    let upstream_query = match opts.site.as_deref() {
        Some(site) if !site.trim().is_empty() => format!("{} site:{}", trimmed, site.trim()),
        _ => trimmed.to_string(),
    };

    let instant_fut = async {
        if with_widgets {
            instant::detect(state, trimmed).await
        } else {
            None
        }
    };
    let knowledge_fut = async {
        if with_widgets && page == 1 {
            knowledge::get_panel_soft(state, trimmed).await
        } else {
            None
        }
    };
    let meta_fut = search::search(state, &upstream_query, category, &params);

    let (instant_answer, knowledge_panel, meta) =
        tokio::join!(instant_fut, knowledge_fut, meta_fut);

    let mut all_results = to_search_results(meta.results);
    apply_lens(state, opts.lens.as_deref(), &mut all_results).await;
    apply_preferences(state, &mut all_results).await;
    let total_results = all_results.len();
    let start = ((page - 1) as usize) * per_page;
    let end = (start + per_page).min(total_results);
    let results = if start < total_results {
        all_results[start..end].to_vec()
    } else {
        Vec::new()
    };

    let response = SearchResponse {
        query: trimmed.to_string(),
        corrected_query: meta.corrections.first().cloned(),
        total_results,
        results,
        suggestions: meta.suggestions,
        instant_answer,
        knowledge_panel,
        search_time_ms: started.elapsed().as_millis() as u64,
        page,
        per_page,
        has_more: page as usize * per_page < total_results,
        redirect: None,
        bang: None,
        category: category_override.map(|c| c.as_str().to_string()),
    };

    state.cache.put_search(&key, &response).await;

    // Fire-and-forget history append; failure never reaches the caller.
    let records = state.records.clone();
    let logged_query = trimmed.to_string();
    tokio::spawn(async move {
        records.add_history(&logged_query, total_results).await;
    });

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TimeRange;

    #[test]
    fn composite_key_covers_every_option() {
        let base = SearchOptions::default();
        let key = composite_key("", "rust", &base);

        let mut changed = base.clone();
        changed.page = 2;
        assert_ne!(key, composite_key("", "rust", &changed));

        let mut changed = base.clone();
        changed.time_range = TimeRange::Week;
        assert_ne!(key, composite_key("", "rust", &changed));

        let mut changed = base.clone();
        changed.lens = Some("dev".into());
        assert_ne!(key, composite_key("", "rust", &changed));

        // Same options, same key.
        assert_eq!(key, composite_key("", "rust", &SearchOptions::default()));
        // Vertical prefix separates cache spaces.
        assert_ne!(key, composite_key("img:", "rust", &base));
    }

    #[test]
    fn category_derives_from_file_type() {
        let mut opts = SearchOptions::default();
        assert_eq!(category_for(&opts), Category::General);
        opts.file_type = Some("image".into());
        assert_eq!(category_for(&opts), Category::Images);
        opts.file_type = Some("video".into());
        assert_eq!(category_for(&opts), Category::Videos);
        opts.file_type = Some("pdf".into());
        assert_eq!(category_for(&opts), Category::General);
    }

    #[test]
    fn domain_matching_is_suffix_aware() {
        assert!(domain_matches("example.com", "example.com"));
        assert!(domain_matches("docs.example.com", "example.com"));
        assert!(!domain_matches("notexample.com", "example.com"));
    }

    #[test]
    fn base36_encodes_timestamps() {
        assert_eq!(base36_u64(0), "0");
        assert_eq!(base36_u64(35), "z");
        assert_eq!(base36_u64(36 * 36), "100");
    }
}
