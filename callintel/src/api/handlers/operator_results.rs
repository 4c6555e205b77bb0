use axum::{
    Json,
    extract::{Query, State},
};
use tracing::instrument;

use crate::AppState;
use crate::api::models::operator_results::OperatorResult;
use crate::api::models::records::RecordQuery;
use crate::errors::{Error, Result};

// GET /api/fetch-operator-results?transcriptionSid=
#[instrument(skip_all)]
pub async fn fetch_operator_results(
    State(state): State<AppState>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<Vec<OperatorResult>>> {
    let record_id = query.record_id().ok_or_else(|| Error::BadRequest {
        message: "transcriptionSid not provided".to_string(),
    })?;

    let results = state.transcripts.operator_results(record_id).await?;
    Ok(Json(results))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::create_test_app;
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    #[tokio::test]
    async fn test_operator_results_are_returned_flat() {
        let app = create_test_app().await;
        Mock::given(method("GET"))
            .and(path("/v2/Transcripts/GT001/OperatorResults"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "operator_results": [{
                    "name": "Call Reason",
                    "operator_sid": "LY001",
                    "transcript_sid": "GT001",
                    "operator_type": "conversation-classify",
                    "predicted_label": "billing",
                    "label_probabilities": { "billing": 0.9, "support": 0.1 },
                }],
                "meta": { "page": 0 },
            })))
            .mount(&app.intelligence)
            .await;

        let response = app
            .server
            .get("/api/fetch-operator-results")
            .add_query_param("transcriptionSid", "GT001")
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body[0]["name"], "Call Reason");
        assert_eq!(body[0]["predicted_label"], "billing");
        assert_eq!(body[0]["label_probabilities"]["support"], 0.1);
    }

    #[tokio::test]
    async fn test_operator_results_require_record_id() {
        let app = create_test_app().await;

        let response = app
            .server
            .get("/api/fetch-operator-results")
            .add_query_param("transcriptionSid", "  ")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_operator_results_upstream_failure() {
        let app = create_test_app().await;
        Mock::given(method("GET"))
            .and(path("/v2/Transcripts/GT001/OperatorResults"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&app.intelligence)
            .await;

        let response = app
            .server
            .get("/api/fetch-operator-results")
            .add_query_param("transcriptionSid", "GT001")
            .await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.json::<Value>()["error"], "Unable to fetch operator results");
    }
}
