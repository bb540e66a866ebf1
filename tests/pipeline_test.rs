//! Pipeline behavior that needs no live upstreams: bang short-circuits,
//! empty queries, instant answers, and cache determinism.

use veilsearch::core::types::SearchOptions;
use veilsearch::{pipeline, AppState};

fn state() -> AppState {
    AppState::new(reqwest::Client::new())
}

#[tokio::test]
async fn empty_query_yields_well_formed_empty_response() {
    let state = state();
    let response = pipeline::search(&state, "   ", &SearchOptions::default()).await;

    assert_eq!(response.query, "");
    assert_eq!(response.total_results, 0);
    assert!(response.results.is_empty());
    assert!(!response.has_more);
    assert_eq!(response.page, 1);
    assert_eq!(response.per_page, 10);
    assert!(response.redirect.is_none());
}

#[tokio::test]
async fn external_bang_redirects_without_searching() {
    let state = state();
    let response = pipeline::search(&state, "!gh ripgrep", &SearchOptions::default()).await;

    assert!(response.results.is_empty());
    assert_eq!(
        response.redirect.as_deref(),
        Some("https://github.com/search?q=ripgrep")
    );
    assert_eq!(response.bang.as_deref(), Some("gh"));
    assert_eq!(response.category.as_deref(), Some("it"));
}

#[tokio::test]
async fn internal_bang_carries_category() {
    let state = state();
    let response = pipeline::search(&state, "!i mountain", &SearchOptions::default()).await;

    assert_eq!(response.redirect.as_deref(), Some("/images?q=mountain"));
    assert_eq!(response.category.as_deref(), Some("images"));
}

#[tokio::test]
async fn calculator_query_carries_instant_answer() {
    let state = state();
    let response = pipeline::search(&state, "2+2", &SearchOptions::default()).await;

    let instant = response.instant_answer.expect("calculator should fire");
    assert_eq!(instant.answer_type, "calculator");
    assert_eq!(instant.result, "4");
}

#[tokio::test]
async fn unit_conversion_query_carries_instant_answer() {
    let state = state();
    let response = pipeline::search(&state, "10 km to mi", &SearchOptions::default()).await;

    let instant = response.instant_answer.expect("unit widget should fire");
    assert_eq!(instant.answer_type, "unit_conversion");
    let to_value = instant.data["to_value"].as_f64().unwrap();
    assert!((to_value - 6.2137).abs() < 1e-3);
}

#[tokio::test]
async fn cached_response_preserves_original_search_time() {
    let state = state();
    let opts = SearchOptions::default();

    let first = pipeline::search(&state, "time in tokyo", &opts).await;
    let second = pipeline::search(&state, "time in tokyo", &opts).await;

    // The second call is a cache hit and returns the stored response,
    // including its original timing.
    assert_eq!(first.search_time_ms, second.search_time_ms);
    assert_eq!(first.total_results, second.total_results);
}

#[tokio::test]
async fn pagination_invariant_holds_even_when_empty() {
    let state = state();
    let opts = SearchOptions {
        page: 3,
        per_page: 20,
        ..Default::default()
    };
    let response = pipeline::search(&state, "!gh ripgrep", &opts).await;

    assert_eq!(response.page, 3);
    assert_eq!(response.per_page, 20);
    assert_eq!(
        response.has_more,
        (response.page as usize) * response.per_page < response.total_results
    );
}
