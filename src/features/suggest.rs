use tracing::warn;

use crate::core::types::{Suggestion, TrendingItem};
use crate::core::AppState;

/// Upstream autocomplete, cached for a minute. Failures yield an empty list.
pub async fn suggest(state: &AppState, query: &str) -> Vec<Suggestion> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    if let Some(cached) = state.cache.get_suggest::<Vec<Suggestion>>(query).await {
        return cached;
    }

    let suggestions = fetch_suggestions(state, query).await.unwrap_or_else(|e| {
        warn!("suggest upstream failed: {}", e);
        Vec::new()
    });

    if !suggestions.is_empty() {
        state.cache.put_suggest(query, &suggestions).await;
    }
    suggestions
}

async fn fetch_suggestions(state: &AppState, query: &str) -> anyhow::Result<Vec<Suggestion>> {
    let mut url = url::Url::parse("https://suggestqueries.google.com/complete/search")?;
    url.query_pairs_mut()
        .append_pair("client", "firefox")
        .append_pair("q", query);

    // Payload shape: [query, [suggestion, ...]]
    let body: serde_json::Value = state
        .http_client
        .get(url)
        .header(
            "User-Agent",
            crate::search::engines::random_user_agent(),
        )
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let list = body
        .get(1)
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    Ok(list
        .iter()
        .filter_map(|v| v.as_str())
        .map(|text| Suggestion {
            text: text.to_string(),
            kind: "query".to_string(),
        })
        .collect())
}

/// Static trending list; the frontend shows these on an empty search box.
pub fn trending() -> Vec<TrendingItem> {
    const TRENDING: &[(&str, u32)] = &[
        ("weather today", 95),
        ("news", 90),
        ("rust programming", 80),
        ("calculator", 75),
        ("translate", 70),
        ("time in tokyo", 60),
        ("currency converter", 55),
        ("open source projects", 50),
    ];

    TRENDING
        .iter()
        .map(|(text, frequency)| TrendingItem {
            text: text.to_string(),
            kind: "trending".to_string(),
            frequency: *frequency,
        })
        .collect()
}

/// Related searches: the suggestion list minus the query itself.
pub async fn related(state: &AppState, query: &str) -> Vec<Suggestion> {
    suggest(state, query)
        .await
        .into_iter()
        .filter(|s| !s.text.eq_ignore_ascii_case(query.trim()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trending_is_nonempty_and_ranked() {
        let items = trending();
        assert!(!items.is_empty());
        assert!(items.windows(2).all(|w| w[0].frequency >= w[1].frequency));
    }
}
