use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::routing::{delete, get};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::types::*;
use crate::core::{ApiError, AppState};
use crate::features::{bangs, instant, knowledge, suggest};
use crate::pipeline;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/search", get(search_general))
        .route("/api/search/images", get(search_images))
        .route("/api/search/videos", get(search_videos))
        .route("/api/search/news", get(search_news))
        .route("/api/suggest", get(suggest_handler))
        .route("/api/suggest/trending", get(trending_handler))
        .route("/api/related", get(related_handler))
        .route("/api/instant/{kind}", get(instant_handler))
        .route("/api/knowledge/{query}", get(knowledge_handler))
        .route(
            "/api/preferences",
            get(list_preferences).post(upsert_preference),
        )
        .route("/api/preferences/{domain}", delete(delete_preference))
        .route("/api/lenses", get(list_lenses).post(create_lens))
        .route(
            "/api/lenses/{id}",
            get(get_lens).put(update_lens).delete(delete_lens),
        )
        .route("/api/history", get(list_history).delete(clear_history))
        .route("/api/history/{id}", delete(delete_history))
        .route("/api/settings", get(get_settings).put(put_settings))
        .route("/api/bangs", get(list_bangs).post(create_bang))
        .route("/api/bangs/parse", get(parse_bang))
        .route("/api/bangs/{trigger}", delete(delete_bang))
        .route("/api/widgets", get(get_widgets).put(put_widgets))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Unknown paths get the same JSON error shape as everything else.
async fn not_found() -> ApiError {
    ApiError::NotFound("route".to_string())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "veilsearch",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Default, Deserialize)]
struct SearchQueryParams {
    q: Option<String>,
    page: Option<u32>,
    per_page: Option<usize>,
    time: Option<String>,
    region: Option<String>,
    lang: Option<String>,
    safe: Option<u8>,
    site: Option<String>,
    lens: Option<String>,
    file_type: Option<String>,
}

fn require_q(q: &Option<String>) -> Result<String, ApiError> {
    match q.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => Ok(q.to_string()),
        _ => Err(ApiError::MissingParam("q")),
    }
}

async fn build_options(state: &AppState, params: &SearchQueryParams) -> SearchOptions {
    let settings = state.records.settings().await;
    let default_safe = match settings.safe_search.as_str() {
        "off" => 0,
        "strict" => 2,
        _ => 1,
    };

    SearchOptions {
        page: params.page.unwrap_or(1).max(1),
        per_page: params
            .per_page
            .unwrap_or(settings.results_per_page)
            .clamp(1, 100),
        time_range: TimeRange::parse(params.time.as_deref().unwrap_or("")),
        region: params
            .region
            .clone()
            .unwrap_or_else(|| settings.region.clone()),
        language: params
            .lang
            .clone()
            .unwrap_or_else(|| settings.language.clone()),
        safe_search: params.safe.unwrap_or(default_safe).min(2),
        site: params.site.clone(),
        lens: params.lens.clone(),
        file_type: params.file_type.clone(),
    }
}

async fn search_general(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQueryParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let q = require_q(&params.q)?;
    let opts = build_options(&state, &params).await;
    Ok(Json(pipeline::search(&state, &q, &opts).await))
}

async fn search_images(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQueryParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let q = require_q(&params.q)?;
    let opts = build_options(&state, &params).await;
    Ok(Json(pipeline::search_images(&state, &q, &opts).await))
}

async fn search_videos(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQueryParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let q = require_q(&params.q)?;
    let opts = build_options(&state, &params).await;
    Ok(Json(pipeline::search_videos(&state, &q, &opts).await))
}

async fn search_news(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQueryParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let q = require_q(&params.q)?;
    let opts = build_options(&state, &params).await;
    Ok(Json(pipeline::search_news(&state, &q, &opts).await))
}

#[derive(Debug, Deserialize)]
struct QueryParam {
    q: Option<String>,
}

async fn suggest_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParam>,
) -> Result<Json<Vec<Suggestion>>, ApiError> {
    let q = require_q(&params.q)?;
    Ok(Json(suggest::suggest(&state, &q).await))
}

async fn trending_handler() -> Json<Vec<TrendingItem>> {
    Json(suggest::trending())
}

async fn related_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParam>,
) -> Result<Json<Vec<Suggestion>>, ApiError> {
    let q = require_q(&params.q)?;
    Ok(Json(suggest::related(&state, &q).await))
}

async fn instant_handler(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(params): Query<QueryParam>,
) -> Result<Json<Value>, ApiError> {
    let q = require_q(&params.q)?;

    let answer = match kind.as_str() {
        "calculate" => {
            let value = instant::calc::evaluate(&q)
                .map_err(|e| ApiError::Validation(e.to_string()))?;
            json!({
                "expression": q.clone(),
                "result": instant::calc::format_number(value),
                "value": value,
            })
        }
        "convert" => {
            let (value, from, to) = instant::units::detect(&q).ok_or_else(|| {
                ApiError::Validation("expected a query like '10 km to mi'".to_string())
            })?;
            let converted = instant::units::convert(value, from, to)
                .map_err(|e| ApiError::Validation(e.to_string()))?;
            json!({
                "from_value": value,
                "from_unit": from.symbol,
                "to_value": converted,
                "to_unit": to.symbol,
                "category": from.category.to_string(),
            })
        }
        "currency" => {
            let (amount, from, to) = instant::currency::detect(&q).ok_or_else(|| {
                ApiError::Validation("expected a query like '100 usd to eur'".to_string())
            })?;
            let answer = instant::currency::convert(&state, amount, &from, &to)
                .await
                .map_err(|_| ApiError::NotFound("exchange rate".to_string()))?;
            serde_json::to_value(&answer).unwrap_or_default()
        }
        "weather" => {
            let location = instant::weather::detect(&q).unwrap_or(q.clone());
            let answer = instant::weather::lookup(&state, &location)
                .await
                .map_err(|_| ApiError::NotFound("weather".to_string()))?;
            serde_json::to_value(&answer).unwrap_or_default()
        }
        "define" => {
            let word = instant::dictionary::detect(&q).unwrap_or(q.clone());
            let answer = instant::dictionary::lookup(&state, &word)
                .await
                .map_err(|_| ApiError::NotFound("definition".to_string()))?;
            serde_json::to_value(&answer).unwrap_or_default()
        }
        "time" => {
            let location = instant::timezone::detect(&q).unwrap_or(q.clone());
            let answer = instant::timezone::lookup(&location)
                .map_err(|e| ApiError::Validation(e.to_string()))?;
            serde_json::to_value(&answer).unwrap_or_default()
        }
        other => {
            return Err(ApiError::NotFound(format!("instant widget '{}'", other)));
        }
    };

    Ok(Json(json!({ "type": kind, "query": q, "answer": answer })))
}

async fn knowledge_handler(
    State(state): State<Arc<AppState>>,
    Path(query): Path<String>,
) -> Result<Json<KnowledgePanel>, ApiError> {
    knowledge::get_panel(&state, &query)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("knowledge panel for '{}'", query)))
}

// ── Preferences ────────────────────────────────────────────────────────

async fn list_preferences(State(state): State<Arc<AppState>>) -> Json<Vec<Preference>> {
    Json(state.records.list_preferences().await)
}

#[derive(Debug, Deserialize)]
struct PreferenceBody {
    domain: String,
    action: String,
    #[serde(default)]
    level: i32,
}

async fn upsert_preference(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PreferenceBody>,
) -> Result<Json<Value>, ApiError> {
    if body.domain.trim().is_empty() {
        return Err(ApiError::Validation("domain must not be empty".to_string()));
    }
    if !matches!(body.action.as_str(), "boost" | "lower" | "block") {
        return Err(ApiError::Validation(
            "action must be one of boost, lower, block".to_string(),
        ));
    }
    state
        .records
        .upsert_preference(Preference {
            domain: body.domain.trim().to_lowercase(),
            action: body.action,
            level: body.level,
        })
        .await;
    Ok(Json(json!({ "success": true })))
}

async fn delete_preference(
    State(state): State<Arc<AppState>>,
    Path(domain): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if state.records.delete_preference(&domain).await {
        Ok(Json(json!({ "success": true })))
    } else {
        Err(ApiError::NotFound(format!("preference for '{}'", domain)))
    }
}

// ── Lenses ─────────────────────────────────────────────────────────────

async fn list_lenses(State(state): State<Arc<AppState>>) -> Json<Vec<Lens>> {
    Json(state.records.list_lenses().await)
}

#[derive(Debug, Deserialize)]
struct LensBody {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    domains: Vec<String>,
    #[serde(default = "default_true")]
    enabled: bool,
}

fn default_true() -> bool {
    true
}

async fn create_lens(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LensBody>,
) -> Result<Json<Lens>, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::Validation("name must not be empty".to_string()));
    }
    Ok(Json(
        state
            .records
            .create_lens(body.name, body.description, body.domains, body.enabled)
            .await,
    ))
}

async fn get_lens(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Lens>, ApiError> {
    state
        .records
        .get_lens(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("lens '{}'", id)))
}

async fn update_lens(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<LensBody>,
) -> Result<Json<Lens>, ApiError> {
    let updated = Lens {
        id: id.clone(),
        name: body.name,
        description: body.description,
        domains: body.domains,
        enabled: body.enabled,
        created_at: chrono::Utc::now(),
    };
    state
        .records
        .update_lens(&id, updated)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("lens '{}'", id)))
}

async fn delete_lens(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if state.records.delete_lens(&id).await {
        Ok(Json(json!({ "success": true })))
    } else {
        Err(ApiError::NotFound(format!("lens '{}'", id)))
    }
}

// ── History ────────────────────────────────────────────────────────────

async fn list_history(State(state): State<Arc<AppState>>) -> Json<Vec<HistoryEntry>> {
    Json(state.records.list_history().await)
}

async fn clear_history(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.records.clear_history().await;
    Json(json!({ "success": true }))
}

async fn delete_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if state.records.delete_history(&id).await {
        Ok(Json(json!({ "success": true })))
    } else {
        Err(ApiError::NotFound(format!("history entry '{}'", id)))
    }
}

// ── Settings & widgets ─────────────────────────────────────────────────

async fn get_settings(State(state): State<Arc<AppState>>) -> Json<Settings> {
    Json(state.records.settings().await)
}

async fn put_settings(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<SettingsPatch>,
) -> Json<Settings> {
    Json(state.records.update_settings(patch).await)
}

async fn get_widgets(State(state): State<Arc<AppState>>) -> Json<WidgetSettings> {
    Json(state.records.widgets().await)
}

async fn put_widgets(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<WidgetSettingsPatch>,
) -> Json<WidgetSettings> {
    Json(state.records.update_widgets(patch).await)
}

// ── Bangs ──────────────────────────────────────────────────────────────

async fn list_bangs(State(state): State<Arc<AppState>>) -> Json<Vec<Bang>> {
    let mut all = bangs::builtin_bangs();
    all.extend(state.records.list_custom_bangs().await);
    Json(all)
}

async fn parse_bang(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParam>,
) -> Result<Json<bangs::BangParseResult>, ApiError> {
    let q = require_q(&params.q)?;
    Ok(Json(bangs::parse(&q, &state.records).await))
}

#[derive(Debug, Deserialize)]
struct BangBody {
    trigger: String,
    name: String,
    url_template: String,
    #[serde(default)]
    category: String,
}

async fn create_bang(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BangBody>,
) -> Result<Json<Bang>, ApiError> {
    state
        .records
        .create_bang(body.trigger, body.name, body.url_template, body.category)
        .await
        .map(Json)
        .map_err(|e| ApiError::Validation(e.to_string()))
}

async fn delete_bang(
    State(state): State<Arc<AppState>>,
    Path(trigger): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.records.delete_bang(&trigger).await {
        Ok(true) => Ok(Json(json!({ "success": true }))),
        Ok(false) => Err(ApiError::NotFound(format!("bang '{}'", trigger))),
        Err(e) => Err(ApiError::Validation(e.to_string())),
    }
}
