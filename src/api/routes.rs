use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::{AnalysisReport, AnalysisService};
use crate::api::health::HealthState;
use crate::assumption_refresh::AssumptionRefresher;
use crate::db::EntryStore;
use crate::error::AppError;
use crate::types::{
    Currency, EntryFields, Niche, NicheAnalysis, SweetSpotAssumption, SweetSpotEntry,
    SweetSpotRanking, SweetSpotResult,
};

#[derive(Clone)]
pub struct ApiState {
    pub refresher: AssumptionRefresher,
    pub store: EntryStore,
    pub service: AnalysisService,
    pub health: Arc<HealthState>,
    pub default_currency: Currency,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/entries", get(list_entries).post(create_entry))
        .route("/entries/:id", get(get_entry).put(update_entry).delete(delete_entry))
        .route("/entries/:id/funnel", get(get_entry_funnel))
        .route("/analysis", get(get_analysis))
        .route("/analysis/niches", get(get_niche_analysis))
        .route("/analysis/ranking", get(get_ranking))
        .route("/analysis/preview", axum::routing::post(preview_analysis))
        .route("/assumptions", get(list_assumptions))
        .route("/assumptions/:niche", axum::routing::put(put_assumption))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query / body structs
// ---------------------------------------------------------------------------

#[derive(Deserialize, Default)]
pub struct NicheQuery {
    pub niche: Option<String>,
}

impl NicheQuery {
    fn niche(&self) -> Option<Niche> {
        self.niche
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(Niche::from)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssumptionRates {
    pub engagement_rate: f64,
    pub conversion_rate: f64,
    pub buyer_rate: f64,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub entries: i64,
    pub assumptions: u64,
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub refresh_failures: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Result<Json<HealthResponse>, AppError> {
    let entries = state.store.count().await?;
    let last_ns = state.health.last_refresh_at_ns();
    let last_refresh_at = (last_ns > 0).then(|| DateTime::<Utc>::from_timestamp_nanos(last_ns as i64));

    Ok(Json(HealthResponse {
        status: "ok",
        entries,
        assumptions: state.health.assumption_count(),
        last_refresh_at,
        refresh_failures: state.health.refresh_failures(),
    }))
}

async fn list_entries(
    State(state): State<ApiState>,
    Query(params): Query<NicheQuery>,
) -> Result<Json<Vec<SweetSpotEntry>>, AppError> {
    let entries = match params.niche() {
        Some(niche) => state.store.list_entries_by_niche(&niche).await?,
        None => state.store.list_entries().await?,
    };
    Ok(Json(entries))
}

async fn create_entry(
    State(state): State<ApiState>,
    Json(fields): Json<EntryFields>,
) -> Result<(StatusCode, Json<SweetSpotEntry>), AppError> {
    let entry = state.store.create_entry(fields, state.default_currency).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn get_entry(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<SweetSpotEntry>, AppError> {
    Ok(Json(state.store.get_entry(&id).await?))
}

async fn update_entry(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(fields): Json<EntryFields>,
) -> Result<Json<SweetSpotEntry>, AppError> {
    Ok(Json(state.store.update_entry(&id, fields, state.default_currency).await?))
}

async fn delete_entry(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.store.delete_entry(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_entry_funnel(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<SweetSpotResult>, AppError> {
    Ok(Json(state.service.funnel_for(&id).await?))
}

async fn get_analysis(
    State(state): State<ApiState>,
    Query(params): Query<NicheQuery>,
) -> Result<Json<AnalysisReport>, AppError> {
    let niche = params.niche();
    Ok(Json(state.service.analyze(niche.as_ref()).await?))
}

async fn get_niche_analysis(
    State(state): State<ApiState>,
) -> Result<Json<Vec<NicheAnalysis>>, AppError> {
    Ok(Json(state.service.analyze_by_niche().await?))
}

async fn get_ranking(State(state): State<ApiState>) -> Result<Json<Vec<SweetSpotRanking>>, AppError> {
    Ok(Json(state.service.ranking().await?))
}

async fn preview_analysis(
    State(state): State<ApiState>,
    Json(fields): Json<EntryFields>,
) -> Result<Json<AnalysisReport>, AppError> {
    Ok(Json(state.service.preview(fields)?))
}

async fn list_assumptions(State(state): State<ApiState>) -> Json<Vec<SweetSpotAssumption>> {
    Json(state.service.registry().snapshot())
}

async fn put_assumption(
    State(state): State<ApiState>,
    Path(niche): Path<String>,
    Json(rates): Json<AssumptionRates>,
) -> Result<Json<SweetSpotAssumption>, AppError> {
    let assumption = SweetSpotAssumption {
        niche: Niche::from(niche),
        engagement_rate: rates.engagement_rate,
        conversion_rate: rates.conversion_rate,
        buyer_rate: rates.buyer_rate,
    };
    let count = state.refresher.upsert(&assumption).await?;
    info!(niche = %assumption.niche, registered = count, "Assumption updated");
    Ok(Json(assumption))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
