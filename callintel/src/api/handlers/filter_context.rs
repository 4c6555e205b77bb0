use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use crate::AppState;
use crate::api::models::filter_context::{FilterContext, FilterContextCreated};
use crate::errors::{Error, Result};

// POST /api/filter-context - Store a chart selection for the list view
#[instrument(skip_all)]
pub async fn create_filter_context(
    State(state): State<AppState>,
    Json(context): Json<FilterContext>,
) -> Result<(StatusCode, Json<FilterContextCreated>)> {
    if context.record_ids.is_empty() {
        return Err(Error::BadRequest {
            message: "recordIds cannot be empty".to_string(),
        });
    }

    let created = state.filter_contexts.create(context).await;
    Ok((StatusCode::CREATED, Json(created)))
}

// GET /api/filter-context/{token} - Read and delete a stored selection
#[instrument(skip_all)]
pub async fn take_filter_context(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<FilterContext>> {
    state
        .filter_contexts
        .take(&token)
        .await
        .map(Json)
        .ok_or_else(|| Error::NotFound {
            resource: "Filter context".to_string(),
            id: token,
        })
}

#[cfg(test)]
mod tests {
    use crate::test_utils::create_test_app;
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    #[tokio::test]
    async fn test_context_round_trip_is_one_shot() {
        let app = create_test_app().await;

        let response = app
            .server
            .post("/api/filter-context")
            .json(&json!({ "label": "refund", "recordIds": ["GT1", "GT2"] }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: Value = response.json();
        let token = created["token"].as_str().unwrap().to_string();
        assert_eq!(created["expires_in_seconds"], 600);

        let response = app.server.get(&format!("/api/filter-context/{token}")).await;
        response.assert_status_ok();
        assert_eq!(
            response.json::<Value>(),
            json!({ "label": "refund", "recordIds": ["GT1", "GT2"] })
        );

        let response = app.server.get(&format!("/api/filter-context/{token}")).await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_selection_is_rejected() {
        let app = create_test_app().await;

        let response = app
            .server
            .post("/api/filter-context")
            .json(&json!({ "label": "refund", "recordIds": [] }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
