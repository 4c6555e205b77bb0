use axum::{
    Json,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use tracing::{debug, instrument};

use crate::AppState;
use crate::api::models::pagination::{ExportQuery, TranscriptionsRequest, TranscriptionsResponse};
use crate::api::models::records::Record;
use crate::errors::{Error, Result};
use crate::export::records_to_csv;
use crate::listing::{PageRequest, SearchFilters, enrich, paginate};

/// Fetch the search window and keep the records matching the filters.
///
/// The filter context, if any, is redeemed only once the search has succeeded, so a failed
/// listing leaves the token usable for a retry.
async fn fetch_filtered(
    state: &AppState,
    search_value: Option<String>,
    filter_from: Option<String>,
    filter_token: Option<String>,
) -> Result<Vec<Record>> {
    let records = state.records.fetch_recent(state.config.search.over_fetch_limit).await?;
    let filters = SearchFilters::new(search_value, filter_from);

    let Some(token) = filter_token.filter(|token| !token.trim().is_empty()) else {
        return Ok(filters.apply(records));
    };

    match state.filter_contexts.take(&token).await {
        Some(context) => {
            debug!(label = %context.label, records = context.record_ids.len(), "Applying filter context");
            Ok(filters.restrict_to(context.record_ids).apply(records))
        }
        None => Err(Error::NotFound {
            resource: "Filter context".to_string(),
            id: token,
        }),
    }
}

// POST /api/transcriptions - One page of filtered, enriched records
#[instrument(skip_all)]
pub async fn list_transcriptions(
    State(state): State<AppState>,
    Json(request): Json<TranscriptionsRequest>,
) -> Result<Json<TranscriptionsResponse>> {
    let search = &state.config.search;
    let page = PageRequest::new(request.page, request.limit, search.default_limit, search.over_fetch_limit)?;

    let records = fetch_filtered(&state, request.search_value, request.filter_from, request.filter_token).await?;
    let (records, meta) = paginate(records, page);
    let conversations = enrich(records, state.transcripts.as_ref(), search.enrichment_concurrency).await;

    Ok(Json(TranscriptionsResponse { conversations, meta }))
}

// GET /api/transcriptions/export - Every filtered record as CSV, unpaginated
#[instrument(skip_all)]
pub async fn export_transcriptions(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse> {
    let records = fetch_filtered(&state, query.search_value, query.filter_from, query.filter_token).await?;
    let records = enrich(
        records,
        state.transcripts.as_ref(),
        state.config.search.enrichment_concurrency,
    )
    .await;
    let body = records_to_csv(&records)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"transcriptions.csv\""),
        ],
        body,
    ))
}

#[cfg(test)]
mod tests {
    use crate::api::models::filter_context::FilterContext;
    use crate::test_utils::{conversation, create_test_app, mock_details, mock_search};
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    fn five_conversations() -> Value {
        json!([
            conversation("GT105", "2024-05-05T10:00:00Z", "+15551110005"),
            conversation("GT104", "2024-05-04T10:00:00Z", "+15552220004"),
            conversation("GT103", "2024-05-03T10:00:00Z", "+15551110003"),
            conversation("GT102", "2024-05-02T10:00:00Z", "+15552220002"),
            conversation("GT101", "2024-05-01T10:00:00Z", "+15551110001"),
        ])
    }

    #[test_log::test(tokio::test)]
    async fn test_list_filters_then_paginates_then_enriches() {
        let app = create_test_app().await;
        mock_search(&app.intelligence, five_conversations()).await;
        mock_details(&app.intelligence, "GT101", "completed", "RE101").await;

        let response = app
            .server
            .post("/api/transcriptions")
            .json(&json!({ "page": 2, "limit": 2, "filterFrom": "555111" }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["meta"], json!({ "page_count": 2, "page": 2, "total_matched": 3 }));

        let conversations = body["conversations"].as_array().unwrap();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0]["sid"], "GT101");
        assert_eq!(conversations[0]["status"], "complete");
        assert_eq!(conversations[0]["recording_sid"], "RE101");

        // only the page that is returned gets enriched
        let detail_calls = app
            .intelligence
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|request| request.url.path().starts_with("/v2/Transcripts/"))
            .count();
        assert_eq!(detail_calls, 1);
    }

    #[tokio::test]
    async fn test_list_keeps_records_whose_enrichment_fails() {
        let app = create_test_app().await;
        mock_search(&app.intelligence, five_conversations()).await;
        // no details mocks: every details lookup returns 404

        let response = app
            .server
            .post("/api/transcriptions")
            .json(&json!({ "searchValue": "GT10", "limit": 10 }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["meta"]["total_matched"], 5);
        assert_eq!(body["meta"]["page_count"], 1);
        let conversations = body["conversations"].as_array().unwrap();
        assert_eq!(conversations.len(), 5);
        assert!(conversations.iter().all(|c| c.get("status").is_none()));
    }

    #[tokio::test]
    async fn test_list_with_no_matches() {
        let app = create_test_app().await;
        mock_search(&app.intelligence, five_conversations()).await;

        let response = app
            .server
            .post("/api/transcriptions")
            .json(&json!({ "searchValue": "nothing-matches" }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["meta"], json!({ "page_count": 0, "page": 1, "total_matched": 0 }));
        assert_eq!(body["conversations"], json!([]));
    }

    #[tokio::test]
    async fn test_list_rejects_invalid_page() {
        let app = create_test_app().await;

        let response = app
            .server
            .post("/api/transcriptions")
            .json(&json!({ "page": 0 }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["code"], "bad_request");
    }

    #[tokio::test]
    async fn test_list_search_failure_is_500() {
        let app = create_test_app().await;
        // no search mock: upstream answers 404

        let response = app.server.post("/api/transcriptions").json(&json!({})).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.json::<Value>()["code"], "search_failure");
    }

    #[tokio::test]
    async fn test_list_consumes_filter_context() {
        let app = create_test_app().await;
        mock_search(&app.intelligence, five_conversations()).await;

        let created = app
            .state
            .filter_contexts
            .create(FilterContext {
                label: "negative".to_string(),
                record_ids: vec!["GT102".to_string(), "GT104".to_string(), "GT105".to_string()],
            })
            .await;

        let response = app
            .server
            .post("/api/transcriptions")
            .json(&json!({ "filterFrom": "555222", "filterToken": created.token }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        let ids: Vec<&str> = body["conversations"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|c| c["sid"].as_str())
            .collect();
        assert_eq!(ids, ["GT104", "GT102"]);

        // second use of the same token
        let response = app
            .server
            .post("/api/transcriptions")
            .json(&json!({ "filterToken": created.token }))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_failed_listing_keeps_filter_context() {
        let app = create_test_app().await;
        let created = app
            .state
            .filter_contexts
            .create(FilterContext {
                label: "negative".to_string(),
                record_ids: vec!["GT103".to_string()],
            })
            .await;

        // no search mock yet: upstream answers 404
        let response = app
            .server
            .post("/api/transcriptions")
            .json(&json!({ "filterToken": created.token }))
            .await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        mock_search(&app.intelligence, five_conversations()).await;
        let response = app
            .server
            .post("/api/transcriptions")
            .json(&json!({ "filterToken": created.token }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["meta"]["total_matched"], 1);
        assert_eq!(body["conversations"][0]["sid"], "GT103");
    }

    #[tokio::test]
    async fn test_failed_export_keeps_filter_context() {
        let app = create_test_app().await;
        let created = app
            .state
            .filter_contexts
            .create(FilterContext {
                label: "refund".to_string(),
                record_ids: vec!["GT101".to_string(), "GT105".to_string()],
            })
            .await;

        let response = app
            .server
            .get("/api/transcriptions/export")
            .add_query_param("filterToken", &created.token)
            .await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        mock_search(&app.intelligence, five_conversations()).await;
        let response = app
            .server
            .get("/api/transcriptions/export")
            .add_query_param("filterToken", &created.token)
            .await;
        response.assert_status_ok();
        assert_eq!(response.text().lines().count(), 3);
    }

    #[tokio::test]
    async fn test_export_returns_all_matches_as_csv() {
        let app = create_test_app().await;
        mock_search(&app.intelligence, five_conversations()).await;
        mock_details(&app.intelligence, "GT103", "completed", "RE103").await;

        let response = app
            .server
            .get("/api/transcriptions/export")
            .add_query_param("filterFrom", "555111")
            .await;
        response.assert_status_ok();
        assert_eq!(
            response.header("content-type").to_str().unwrap(),
            "text/csv; charset=utf-8"
        );

        let text = response.text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "sid,date_created,from_number,to_number,status,recording_sid");
        assert!(lines[1].starts_with("GT105,"));
        assert!(lines[2].starts_with("GT103,") && lines[2].ends_with(",complete,RE103"));
        assert!(lines[3].starts_with("GT101,"));
    }
}
