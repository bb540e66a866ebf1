use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::types::{KnowledgePanel, PanelFact, PanelLink};
use crate::core::AppState;

/// Minimum extract length for a summary to count as a real panel.
const MIN_EXTRACT: usize = 20;

/// Wikidata properties surfaced as facts, in display order. Only the first
/// claim of each property is used.
const FACT_PROPS: &[(&str, &str)] = &[
    ("P569", "Born"),
    ("P570", "Died"),
    ("P19", "Place of birth"),
    ("P27", "Nationality"),
    ("P106", "Occupation"),
    ("P17", "Country"),
    ("P36", "Capital"),
    ("P1082", "Population"),
    ("P571", "Founded"),
    ("P112", "Founded by"),
    ("P159", "Headquarters"),
    ("P452", "Industry"),
    ("P856", "Website"),
    ("P1448", "Official name"),
    ("P18", "Image"),
];

const TITLE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'-')
    .remove(b'.')
    .remove(b'(')
    .remove(b')')
    .remove(b',');

struct Summary {
    title: String,
    description: Option<String>,
    extract: String,
    image: Option<String>,
    page_url: Option<String>,
    disambiguation: bool,
}

async fn fetch_summary(state: &AppState, title: &str) -> Option<Summary> {
    let slug = title.trim().replace(' ', "_");
    let url = format!(
        "https://en.wikipedia.org/api/rest_v1/page/summary/{}",
        utf8_percent_encode(&slug, TITLE_SET)
    );

    let body: Value = state
        .http_client
        .get(&url)
        .header("Accept", "application/json")
        .send()
        .await
        .ok()?
        .error_for_status()
        .ok()?
        .json()
        .await
        .ok()?;

    Some(Summary {
        title: body.get("title")?.as_str()?.to_string(),
        description: body
            .get("description")
            .and_then(|d| d.as_str())
            .map(|d| d.to_string()),
        extract: body
            .get("extract")
            .and_then(|e| e.as_str())
            .unwrap_or_default()
            .to_string(),
        image: body
            .pointer("/thumbnail/source")
            .and_then(|s| s.as_str())
            .map(|s| s.to_string()),
        page_url: body
            .pointer("/content_urls/desktop/page")
            .and_then(|u| u.as_str())
            .map(|u| u.to_string()),
        disambiguation: body.get("type").and_then(|t| t.as_str()) == Some("disambiguation"),
    })
}

/// First search hit for `query` on the Wikipedia search API.
async fn search_title(state: &AppState, query: &str) -> Option<String> {
    let mut url = url::Url::parse("https://en.wikipedia.org/w/api.php").ok()?;
    url.query_pairs_mut()
        .append_pair("action", "query")
        .append_pair("list", "search")
        .append_pair("srsearch", query)
        .append_pair("format", "json")
        .append_pair("srlimit", "1");

    let body: Value = state
        .http_client
        .get(url)
        .send()
        .await
        .ok()?
        .json()
        .await
        .ok()?;
    body.pointer("/query/search/0/title")
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
}

const MONTHS: &[&str] = &[
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// `+1879-03-14T00:00:00Z` → `March 14, 1879`. Partial dates fall back to
/// the year alone.
fn format_wikidata_time(raw: &str) -> String {
    let cleaned = raw.trim_start_matches('+');
    let date = cleaned.split('T').next().unwrap_or(cleaned);
    let mut parts = date.split('-');
    let year = parts.next().unwrap_or_default();
    let month: usize = parts.next().and_then(|m| m.parse().ok()).unwrap_or(0);
    let day: usize = parts.next().and_then(|d| d.parse().ok()).unwrap_or(0);

    if (1..=12).contains(&month) && day >= 1 {
        format!("{} {}, {}", MONTHS[month - 1], day, year)
    } else {
        year.to_string()
    }
}

fn format_quantity(raw: &str) -> String {
    let cleaned = raw.trim_start_matches('+');
    let (int_part, frac) = match cleaned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (cleaned, None),
    };
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(d) => ("-", d),
        None => ("", int_part),
    };
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return cleaned.to_string();
    }

    let mut grouped = String::new();
    for (idx, c) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    match frac {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

/// Render one claim's datavalue as display text.
fn claim_value(claim: &Value) -> Option<String> {
    let datavalue = claim.pointer("/mainsnak/datavalue")?;
    let value = datavalue.get("value")?;
    match datavalue.get("type").and_then(|t| t.as_str())? {
        "string" => value.as_str().map(|s| s.to_string()),
        "monolingualtext" => value.get("text").and_then(|t| t.as_str()).map(String::from),
        "quantity" => value
            .get("amount")
            .and_then(|a| a.as_str())
            .map(format_quantity),
        "time" => value
            .get("time")
            .and_then(|t| t.as_str())
            .map(format_wikidata_time),
        "wikibase-entityid" => value.get("id").and_then(|i| i.as_str()).map(String::from),
        _ => Some(value.to_string()),
    }
}

async fn wikidata_facts(state: &AppState, title: &str) -> Vec<PanelFact> {
    let entity_id = async {
        let mut url = url::Url::parse("https://www.wikidata.org/w/api.php").ok()?;
        url.query_pairs_mut()
            .append_pair("action", "wbsearchentities")
            .append_pair("search", title)
            .append_pair("language", "en")
            .append_pair("format", "json")
            .append_pair("limit", "1");
        let body: Value = state.http_client.get(url).send().await.ok()?.json().await.ok()?;
        body.pointer("/search/0/id")
            .and_then(|i| i.as_str())
            .map(|i| i.to_string())
    }
    .await;

    let Some(entity_id) = entity_id else {
        return Vec::new();
    };

    let claims = async {
        let mut url = url::Url::parse("https://www.wikidata.org/w/api.php").ok()?;
        url.query_pairs_mut()
            .append_pair("action", "wbgetentities")
            .append_pair("ids", &entity_id)
            .append_pair("props", "claims")
            .append_pair("format", "json");
        let body: Value = state.http_client.get(url).send().await.ok()?.json().await.ok()?;
        body.pointer(&format!("/entities/{}/claims", entity_id))
            .cloned()
    }
    .await;

    let Some(claims) = claims else {
        return Vec::new();
    };

    let mut facts = Vec::new();
    for (prop, label) in FACT_PROPS {
        let Some(first) = claims.pointer(&format!("/{}/0", prop)) else {
            continue;
        };
        if let Some(value) = claim_value(first) {
            facts.push(PanelFact {
                label: label.to_string(),
                value,
            });
        }
    }
    facts
}

pub async fn get_panel(state: &AppState, query: &str) -> Option<KnowledgePanel> {
    let key = query.trim().to_lowercase();
    if key.is_empty() {
        return None;
    }

    if let Some(panel) = state.cache.get_knowledge::<KnowledgePanel>(&key).await {
        return Some(panel);
    }

    let mut summary = fetch_summary(state, query).await;
    let needs_fallback = match &summary {
        Some(s) => s.disambiguation || s.extract.len() < MIN_EXTRACT,
        None => true,
    };
    if needs_fallback {
        let title = search_title(state, query).await?;
        summary = fetch_summary(state, &title).await;
    }

    let summary = summary?;
    if summary.extract.len() < MIN_EXTRACT {
        debug!("knowledge extract too short for '{}'", query);
        return None;
    }

    let facts = wikidata_facts(state, &summary.title).await;
    let mut links = Vec::new();
    if let Some(website) = facts.iter().find(|f| f.label == "Website") {
        links.push(PanelLink {
            title: "Official Website".to_string(),
            url: website.value.clone(),
            icon: "globe".to_string(),
        });
    }
    if let Some(page) = &summary.page_url {
        links.push(PanelLink {
            title: "Wikipedia".to_string(),
            url: page.clone(),
            icon: "wikipedia".to_string(),
        });
    }

    let panel = KnowledgePanel {
        title: summary.title,
        subtitle: summary.description,
        description: summary.extract,
        image: summary.image,
        facts,
        links,
        source: "wikipedia".to_string(),
    };

    state.cache.put_knowledge(&key, &panel).await;
    Some(panel)
}

/// Soaked-error wrapper used by the pipeline: any upstream failure is a
/// missing panel, never an error.
pub async fn get_panel_soft(state: &AppState, query: &str) -> Option<KnowledgePanel> {
    match tokio::time::timeout(
        std::time::Duration::from_secs(5),
        get_panel(state, query),
    )
    .await
    {
        Ok(panel) => panel,
        Err(_) => {
            warn!("knowledge panel lookup timed out for '{}'", query);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wikidata_times_become_readable_dates() {
        assert_eq!(format_wikidata_time("+1879-03-14T00:00:00Z"), "March 14, 1879");
        assert_eq!(format_wikidata_time("+1991-00-00T00:00:00Z"), "1991");
    }

    #[test]
    fn quantities_drop_plus_and_group() {
        assert_eq!(format_quantity("+8336817"), "8,336,817");
        assert_eq!(format_quantity("-42"), "-42");
        assert_eq!(format_quantity("+3.14"), "3.14");
    }

    #[test]
    fn claim_values_cover_datavalue_types() {
        let string_claim = serde_json::json!({
            "mainsnak": {"datavalue": {"type": "string", "value": "https://example.com"}}
        });
        assert_eq!(claim_value(&string_claim).as_deref(), Some("https://example.com"));

        let mono = serde_json::json!({
            "mainsnak": {"datavalue": {"type": "monolingualtext", "value": {"text": "Bundesrepublik", "language": "de"}}}
        });
        assert_eq!(claim_value(&mono).as_deref(), Some("Bundesrepublik"));

        let quantity = serde_json::json!({
            "mainsnak": {"datavalue": {"type": "quantity", "value": {"amount": "+1082000", "unit": "1"}}}
        });
        assert_eq!(claim_value(&quantity).as_deref(), Some("1,082,000"));

        let time = serde_json::json!({
            "mainsnak": {"datavalue": {"type": "time", "value": {"time": "+1955-04-18T00:00:00Z"}}}
        });
        assert_eq!(claim_value(&time).as_deref(), Some("April 18, 1955"));

        let entity = serde_json::json!({
            "mainsnak": {"datavalue": {"type": "wikibase-entityid", "value": {"id": "Q64"}}}
        });
        assert_eq!(claim_value(&entity).as_deref(), Some("Q64"));

        let missing = serde_json::json!({"mainsnak": {}});
        assert_eq!(claim_value(&missing), None);
    }
}
