use axum::{
    Json,
    extract::{Query, State},
};
use serde_json::Value;
use tracing::instrument;

use crate::AppState;
use crate::analysis::breakdown::breakdown;
use crate::api::models::analysis::{AggregateSummary, AnalysisBreakdown, IndividualAnalysis};
use crate::api::models::records::RecordQuery;
use crate::errors::{Error, Result};
use crate::store::StoreKey;
use crate::types::AnalysisKind;

// GET /api/fetch-individual-analyses - Recent records joined with their cached analysis
#[instrument(skip_all)]
pub async fn fetch_individual_analyses(State(state): State<AppState>) -> Result<Json<Vec<IndividualAnalysis>>> {
    let individual = state.aggregator.collect_individual().await?;
    Ok(Json(individual))
}

// GET /api/aggregate-analysis-openai - Recompute, store and return the aggregate summary
#[instrument(skip_all)]
pub async fn aggregate_analysis(State(state): State<AppState>) -> Result<Json<AggregateSummary>> {
    let (_, summary) = state.aggregator.build_individual_and_aggregate().await?;
    Ok(Json(summary))
}

// GET /api/analysis-breakdown - Chart data over the individual list
#[instrument(skip_all)]
pub async fn analysis_breakdown(State(state): State<AppState>) -> Result<Json<AnalysisBreakdown>> {
    let individual = state.aggregator.collect_individual().await?;
    Ok(Json(breakdown(&individual)))
}

async fn fetch_analysis(state: &AppState, query: &RecordQuery, kind: AnalysisKind) -> Result<Json<Value>> {
    let record_id = query.record_id().ok_or_else(|| Error::BadRequest {
        message: "transcriptionSid not provided".to_string(),
    })?;

    let payload = state
        .store
        .get(&StoreKey::Record(record_id.to_string()), kind)
        .await
        .map_err(|e| Error::Upstream {
            operation: format!("fetch {kind} analysis"),
            message: format!("{e:#}"),
        })?;

    payload.map(Json).ok_or_else(|| Error::NotFound {
        resource: format!("{kind} analysis"),
        id: record_id.to_string(),
    })
}

// GET /api/fetch-analysis-openai?transcriptionSid=
#[instrument(skip_all)]
pub async fn fetch_analysis_openai(
    State(state): State<AppState>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<Value>> {
    fetch_analysis(&state, &query, AnalysisKind::OpenAi).await
}

// GET /api/fetch-analysis-humeai?transcriptionSid=
#[instrument(skip_all)]
pub async fn fetch_analysis_humeai(
    State(state): State<AppState>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<Value>> {
    fetch_analysis(&state, &query, AnalysisKind::HumeAi).await
}
