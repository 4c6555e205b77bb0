use axum::{Json, extract::State};
use serde_json::Value;
use tracing::instrument;

use crate::AppState;
use crate::api::models::tokens::ViewTokenRequest;
use crate::errors::{Error, Result};

// POST /api/view-token - Annotator token for one transcript
#[instrument(skip_all)]
pub async fn create_view_token(
    State(state): State<AppState>,
    Json(request): Json<ViewTokenRequest>,
) -> Result<Json<Value>> {
    let record_id = request.record_id().ok_or_else(|| Error::BadRequest {
        message: "transcriptionSid not provided".to_string(),
    })?;

    let token = state.transcripts.view_token(record_id).await?;
    Ok(Json(token))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::create_test_app;
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, ResponseTemplate};

    #[tokio::test]
    async fn test_view_token_is_proxied() {
        let app = create_test_app().await;
        Mock::given(method("POST"))
            .and(path("/v1/Tokens"))
            .and(body_partial_json(json!({ "grants": [{ "transcript_sid": "GT001" }] })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "token": "abc" })))
            .expect(1)
            .mount(&app.intelligence)
            .await;

        let response = app
            .server
            .post("/api/view-token")
            .json(&json!({ "transcriptionSid": "GT001" }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>(), json!({ "token": "abc" }));
    }

    #[tokio::test]
    async fn test_view_token_requires_record_id() {
        let app = create_test_app().await;

        let response = app.server.post("/api/view-token").json(&json!({})).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["error"], "transcriptionSid not provided");
    }
}
