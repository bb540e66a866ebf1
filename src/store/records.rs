use std::sync::Arc;

use anyhow::{bail, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::core::types::{
    Bang, HistoryEntry, Lens, Preference, Settings, SettingsPatch, WidgetSettings,
    WidgetSettingsPatch,
};

use super::KvStore;

/// History keeps only the newest entries.
pub const HISTORY_MAX: usize = 100;

const SETTINGS_KEY: &str = "settings:default";
const WIDGETS_KEY: &str = "widgets:settings";

/// Typed CRUD over the KV. Each keyed space maintains a `{space}:_index`
/// array for enumeration; custom bangs additionally track `bangs:_custom`.
/// Index updates are not atomic with record writes: `list` skips dangling
/// index entries instead of failing.
#[derive(Clone)]
pub struct RecordStore {
    kv: Arc<dyn KvStore>,
}

impl RecordStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.kv.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("corrupt record at {}: {}", key, e);
                None
            }
        }
    }

    async fn put_json<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.kv.put(key, raw, None).await,
            Err(e) => warn!("failed to encode record for {}: {}", key, e),
        }
    }

    async fn read_index(&self, space: &str) -> Vec<String> {
        self.get_json(&format!("{}:_index", space))
            .await
            .unwrap_or_default()
    }

    async fn write_index(&self, space: &str, ids: &[String]) {
        self.put_json(&format!("{}:_index", space), &ids).await;
    }

    // ── Settings ────────────────────────────────────────────────────────

    pub async fn settings(&self) -> Settings {
        self.get_json(SETTINGS_KEY).await.unwrap_or_default()
    }

    pub async fn update_settings(&self, patch: SettingsPatch) -> Settings {
        let mut s = self.settings().await;
        if let Some(v) = patch.safe_search {
            s.safe_search = v;
        }
        if let Some(v) = patch.results_per_page {
            s.results_per_page = v.max(1);
        }
        if let Some(v) = patch.region {
            s.region = v;
        }
        if let Some(v) = patch.language {
            s.language = v;
        }
        if let Some(v) = patch.theme {
            s.theme = v;
        }
        if let Some(v) = patch.open_in_new_tab {
            s.open_in_new_tab = v;
        }
        if let Some(v) = patch.show_thumbnails {
            s.show_thumbnails = v;
        }
        self.put_json(SETTINGS_KEY, &s).await;
        s
    }

    pub async fn widgets(&self) -> WidgetSettings {
        self.get_json(WIDGETS_KEY).await.unwrap_or_default()
    }

    pub async fn update_widgets(&self, patch: WidgetSettingsPatch) -> WidgetSettings {
        let mut w = self.widgets().await;
        if let Some(v) = patch.calculator {
            w.calculator = v;
        }
        if let Some(v) = patch.unit_converter {
            w.unit_converter = v;
        }
        if let Some(v) = patch.currency {
            w.currency = v;
        }
        if let Some(v) = patch.weather {
            w.weather = v;
        }
        if let Some(v) = patch.dictionary {
            w.dictionary = v;
        }
        if let Some(v) = patch.time {
            w.time = v;
        }
        self.put_json(WIDGETS_KEY, &w).await;
        w
    }

    // ── Preferences (keyed by domain) ───────────────────────────────────

    pub async fn list_preferences(&self) -> Vec<Preference> {
        let mut out = Vec::new();
        for domain in self.read_index("preferences").await {
            if let Some(p) = self
                .get_json::<Preference>(&format!("preferences:{}", domain))
                .await
            {
                out.push(p);
            }
        }
        out
    }

    pub async fn upsert_preference(&self, pref: Preference) {
        let mut index = self.read_index("preferences").await;
        if !index.contains(&pref.domain) {
            index.push(pref.domain.clone());
        }
        self.put_json(&format!("preferences:{}", pref.domain), &pref)
            .await;
        self.write_index("preferences", &index).await;
    }

    pub async fn delete_preference(&self, domain: &str) -> bool {
        let mut index = self.read_index("preferences").await;
        let existed = index.iter().any(|d| d == domain);
        index.retain(|d| d != domain);
        self.kv.delete(&format!("preferences:{}", domain)).await;
        self.write_index("preferences", &index).await;
        existed
    }

    // ── Lenses (keyed by id) ────────────────────────────────────────────

    pub async fn list_lenses(&self) -> Vec<Lens> {
        let mut out = Vec::new();
        for id in self.read_index("lenses").await {
            if let Some(lens) = self.get_json::<Lens>(&format!("lenses:{}", id)).await {
                out.push(lens);
            }
        }
        out
    }

    pub async fn get_lens(&self, id: &str) -> Option<Lens> {
        self.get_json(&format!("lenses:{}", id)).await
    }

    pub async fn create_lens(
        &self,
        name: String,
        description: String,
        domains: Vec<String>,
        enabled: bool,
    ) -> Lens {
        let lens = Lens {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            description,
            domains,
            enabled,
            created_at: chrono::Utc::now(),
        };
        let mut index = self.read_index("lenses").await;
        index.push(lens.id.clone());
        self.put_json(&format!("lenses:{}", lens.id), &lens).await;
        self.write_index("lenses", &index).await;
        lens
    }

    pub async fn update_lens(&self, id: &str, updated: Lens) -> Option<Lens> {
        let existing = self.get_lens(id).await?;
        let lens = Lens {
            id: existing.id,
            created_at: existing.created_at,
            ..updated
        };
        self.put_json(&format!("lenses:{}", id), &lens).await;
        Some(lens)
    }

    pub async fn delete_lens(&self, id: &str) -> bool {
        let mut index = self.read_index("lenses").await;
        let existed = index.iter().any(|x| x == id);
        index.retain(|x| x != id);
        self.kv.delete(&format!("lenses:{}", id)).await;
        self.write_index("lenses", &index).await;
        existed
    }

    // ── History (newest-first, bounded) ─────────────────────────────────

    pub async fn add_history(&self, query: &str, results: usize) -> HistoryEntry {
        let entry = HistoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            query: query.to_string(),
            results,
            searched_at: chrono::Utc::now(),
        };

        let mut index = self.read_index("history").await;
        index.insert(0, entry.id.clone());

        // Trim beyond the bound; drop records and index entries together.
        let evicted: Vec<String> = index.split_off(index.len().min(HISTORY_MAX));
        for id in &evicted {
            self.kv.delete(&format!("history:{}", id)).await;
        }

        self.put_json(&format!("history:{}", entry.id), &entry).await;
        self.write_index("history", &index).await;
        entry
    }

    pub async fn list_history(&self) -> Vec<HistoryEntry> {
        let mut out = Vec::new();
        for id in self.read_index("history").await {
            if let Some(entry) = self.get_json::<HistoryEntry>(&format!("history:{}", id)).await {
                out.push(entry);
            }
        }
        out
    }

    pub async fn delete_history(&self, id: &str) -> bool {
        let mut index = self.read_index("history").await;
        let existed = index.iter().any(|x| x == id);
        index.retain(|x| x != id);
        self.kv.delete(&format!("history:{}", id)).await;
        self.write_index("history", &index).await;
        existed
    }

    pub async fn clear_history(&self) {
        for id in self.read_index("history").await {
            self.kv.delete(&format!("history:{}", id)).await;
        }
        self.write_index("history", &[]).await;
    }

    // ── Custom bangs (keyed by trigger) ─────────────────────────────────

    pub async fn get_bang(&self, trigger: &str) -> Option<Bang> {
        self.get_json(&format!("bangs:{}", trigger)).await
    }

    pub async fn list_custom_bangs(&self) -> Vec<Bang> {
        let custom: Vec<String> = self.get_json("bangs:_custom").await.unwrap_or_default();
        let mut out = Vec::new();
        for trigger in custom {
            if let Some(bang) = self.get_bang(&trigger).await {
                out.push(bang);
            }
        }
        out
    }

    /// Built-in triggers are immutable: creating a bang that shadows one
    /// fails, as does re-creating an existing custom trigger.
    pub async fn create_bang(
        &self,
        trigger: String,
        name: String,
        url_template: String,
        category: String,
    ) -> Result<Bang> {
        let trigger = trigger.trim().trim_start_matches('!').to_lowercase();
        if trigger.is_empty() {
            bail!("bang trigger must not be empty");
        }
        if crate::features::bangs::is_builtin(&trigger) {
            bail!("cannot shadow built-in bang '!{}'", trigger);
        }
        if !url_template.starts_with('/') && !url_template.contains("{query}") {
            bail!("url_template must contain {{query}}");
        }
        if self.get_bang(&trigger).await.is_some() {
            bail!("bang '!{}' already exists", trigger);
        }

        let bang = Bang {
            trigger: trigger.clone(),
            name,
            url_template,
            category,
            is_builtin: false,
        };

        let mut index = self.read_index("bangs").await;
        if !index.contains(&trigger) {
            index.push(trigger.clone());
        }
        let mut custom: Vec<String> = self.get_json("bangs:_custom").await.unwrap_or_default();
        if !custom.contains(&trigger) {
            custom.push(trigger.clone());
        }

        self.put_json(&format!("bangs:{}", trigger), &bang).await;
        self.write_index("bangs", &index).await;
        self.put_json("bangs:_custom", &custom).await;
        Ok(bang)
    }

    pub async fn delete_bang(&self, trigger: &str) -> Result<bool> {
        let trigger = trigger.trim().trim_start_matches('!').to_lowercase();
        if crate::features::bangs::is_builtin(&trigger) {
            bail!("cannot delete built-in bang '!{}'", trigger);
        }

        let mut index = self.read_index("bangs").await;
        let existed = index.iter().any(|t| *t == trigger);
        index.retain(|t| *t != trigger);
        let mut custom: Vec<String> = self.get_json("bangs:_custom").await.unwrap_or_default();
        custom.retain(|t| *t != trigger);

        self.kv.delete(&format!("bangs:{}", trigger)).await;
        self.write_index("bangs", &index).await;
        self.put_json("bangs:_custom", &custom).await;
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKv;

    fn store() -> RecordStore {
        RecordStore::new(Arc::new(MemoryKv::new()))
    }

    #[tokio::test]
    async fn settings_patch_merges_over_defaults() {
        let store = store();
        let s = store
            .update_settings(SettingsPatch {
                theme: Some("dark".into()),
                results_per_page: Some(25),
                ..Default::default()
            })
            .await;
        assert_eq!(s.theme, "dark");
        assert_eq!(s.results_per_page, 25);
        assert_eq!(s.safe_search, "moderate");

        let again = store.settings().await;
        assert_eq!(again.theme, "dark");
    }

    #[tokio::test]
    async fn preferences_round_trip_through_index() {
        let store = store();
        store
            .upsert_preference(Preference {
                domain: "example.com".into(),
                action: "boost".into(),
                level: 2,
            })
            .await;
        store
            .upsert_preference(Preference {
                domain: "spam.example".into(),
                action: "block".into(),
                level: 0,
            })
            .await;

        let listed = store.list_preferences().await;
        assert_eq!(listed.len(), 2);
        assert!(store.delete_preference("spam.example").await);
        assert!(!store.delete_preference("spam.example").await);
        assert_eq!(store.list_preferences().await.len(), 1);
    }

    #[tokio::test]
    async fn lenses_crud() {
        let store = store();
        let lens = store
            .create_lens(
                "Dev".into(),
                "dev docs".into(),
                vec!["docs.rs".into()],
                true,
            )
            .await;
        assert_eq!(store.list_lenses().await.len(), 1);
        assert!(store.get_lens(&lens.id).await.is_some());

        let mut updated = lens.clone();
        updated.name = "Dev v2".into();
        let updated = store.update_lens(&lens.id, updated).await.unwrap();
        assert_eq!(updated.name, "Dev v2");
        assert_eq!(updated.id, lens.id);

        assert!(store.delete_lens(&lens.id).await);
        assert!(store.list_lenses().await.is_empty());
    }

    #[tokio::test]
    async fn history_is_bounded_and_newest_first() {
        let store = store();
        for i in 0..(HISTORY_MAX + 10) {
            store.add_history(&format!("query {}", i), i).await;
        }

        let listed = store.list_history().await;
        assert_eq!(listed.len(), HISTORY_MAX);
        assert_eq!(listed[0].query, format!("query {}", HISTORY_MAX + 9));
        assert_eq!(listed.last().unwrap().query, "query 10");
    }

    #[tokio::test]
    async fn history_delete_and_clear() {
        let store = store();
        let entry = store.add_history("keep me", 3).await;
        store.add_history("other", 1).await;

        assert!(store.delete_history(&entry.id).await);
        assert_eq!(store.list_history().await.len(), 1);

        store.clear_history().await;
        assert!(store.list_history().await.is_empty());
    }

    #[tokio::test]
    async fn custom_bangs_cannot_shadow_builtins() {
        let store = store();
        let err = store
            .create_bang(
                "g".into(),
                "My Google".into(),
                "https://example.com/?q={query}".into(),
                "general".into(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("built-in"));

        assert!(store.delete_bang("g").await.is_err());
    }

    #[tokio::test]
    async fn custom_bang_round_trip() {
        let store = store();
        let bang = store
            .create_bang(
                "!hn".into(),
                "Hacker News".into(),
                "https://hn.algolia.com/?q={query}".into(),
                "it".into(),
            )
            .await
            .unwrap();
        assert_eq!(bang.trigger, "hn");
        assert!(!bang.is_builtin);

        // Duplicate trigger is rejected.
        assert!(store
            .create_bang(
                "hn".into(),
                "dup".into(),
                "https://x.example/{query}".into(),
                "general".into(),
            )
            .await
            .is_err());

        assert_eq!(store.list_custom_bangs().await.len(), 1);
        assert!(store.delete_bang("hn").await.unwrap());
        assert!(store.list_custom_bangs().await.is_empty());
    }
}
