use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Coarse engine grouping used for fan-out selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    General,
    Images,
    Videos,
    News,
    Social,
    Science,
    It,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Images => "images",
            Category::Videos => "videos",
            Category::News => "news",
            Category::Social => "social",
            Category::Science => "science",
            Category::It => "it",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rendering hint for category-specific result cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    Images,
    Videos,
    News,
    Packages,
    Paper,
}

/// Upstream time-range filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    #[default]
    #[serde(rename = "")]
    Any,
    Day,
    Week,
    Month,
    Year,
}

impl TimeRange {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "d" => TimeRange::Day,
            "week" | "w" => TimeRange::Week,
            "month" | "m" => TimeRange::Month,
            "year" | "y" => TimeRange::Year,
            _ => TimeRange::Any,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Any => "",
            TimeRange::Day => "day",
            TimeRange::Week => "week",
            TimeRange::Month => "month",
            TimeRange::Year => "year",
        }
    }
}

/// A single upstream hit in the uniform shape every adapter emits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineResult {
    pub url: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub engine: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<Template>,
    // Category-dependent optional fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stars: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
}

/// Everything one adapter extracted from one upstream response.
#[derive(Debug, Clone, Default)]
pub struct EngineResults {
    pub results: Vec<EngineResult>,
    pub suggestions: Vec<String>,
    pub corrections: Vec<String>,
    /// Opaque per-engine payload carried across request builds (e.g. the
    /// DuckDuckGo vqd token).
    pub engine_data: HashMap<String, String>,
}

/// Request parameters handed to every adapter.
#[derive(Debug, Clone)]
pub struct EngineParams {
    /// 1-based page number.
    pub page: u32,
    /// BCP-47 locale or `all`.
    pub locale: String,
    pub time_range: TimeRange,
    /// 0 = off, 1 = moderate, 2 = strict.
    pub safe_search: u8,
    pub engine_data: HashMap<String, String>,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            page: 1,
            locale: "en-US".to_string(),
            time_range: TimeRange::Any,
            safe_search: 1,
            engine_data: HashMap::new(),
        }
    }
}

/// A user-visible hit after merging and mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    pub score: f64,
    pub crawled_at: chrono::DateTime<chrono::Utc>,
    pub engine: String,
    pub engines: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchResponse {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_query: Option<String>,
    pub total_results: usize,
    pub results: Vec<SearchResult>,
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instant_answer: Option<InstantAnswer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_panel: Option<KnowledgePanel>,
    pub search_time_ms: u64,
    pub page: u32,
    pub per_page: usize,
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Options accepted by the search pipeline.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub page: u32,
    pub per_page: usize,
    pub time_range: TimeRange,
    pub region: String,
    pub language: String,
    /// 0 = off, 1 = moderate, 2 = strict.
    pub safe_search: u8,
    pub site: Option<String>,
    pub lens: Option<String>,
    pub file_type: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
            time_range: TimeRange::Any,
            region: String::new(),
            language: "en".to_string(),
            safe_search: 1,
            site: None,
            lens: None,
            file_type: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bang {
    pub trigger: String,
    pub name: String,
    /// Contains the literal `{query}` placeholder, or starts with `/` for an
    /// internal category redirect.
    pub url_template: String,
    pub category: String,
    pub is_builtin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstantAnswer {
    #[serde(rename = "type")]
    pub answer_type: String,
    pub query: String,
    pub result: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelFact {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelLink {
    pub title: String,
    pub url: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgePanel {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub facts: Vec<PanelFact>,
    pub links: Vec<PanelLink>,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingItem {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub frequency: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub query: String,
    pub results: usize,
    pub searched_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lens {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Domains this lens restricts results to.
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub enabled: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Per-domain ranking preference: `boost`, `lower`, or `block`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preference {
    pub domain: String,
    pub action: String,
    #[serde(default)]
    pub level: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub safe_search: String,
    pub results_per_page: usize,
    pub region: String,
    pub language: String,
    pub theme: String,
    pub open_in_new_tab: bool,
    pub show_thumbnails: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            safe_search: "moderate".to_string(),
            results_per_page: 10,
            region: String::new(),
            language: "en".to_string(),
            theme: "system".to_string(),
            open_in_new_tab: false,
            show_thumbnails: true,
        }
    }
}

/// Partial settings update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsPatch {
    pub safe_search: Option<String>,
    pub results_per_page: Option<usize>,
    pub region: Option<String>,
    pub language: Option<String>,
    pub theme: Option<String>,
    pub open_in_new_tab: Option<bool>,
    pub show_thumbnails: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetSettings {
    pub calculator: bool,
    pub unit_converter: bool,
    pub currency: bool,
    pub weather: bool,
    pub dictionary: bool,
    pub time: bool,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            calculator: true,
            unit_converter: true,
            currency: true,
            weather: true,
            dictionary: true,
            time: true,
        }
    }
}

/// Partial widget-settings update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WidgetSettingsPatch {
    pub calculator: Option<bool>,
    pub unit_converter: Option<bool>,
    pub currency: Option<bool>,
    pub weather: Option<bool>,
    pub dictionary: Option<bool>,
    pub time: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
