//! Listing request and response types for `POST /api/transcriptions` and the CSV export.

use serde::{Deserialize, Serialize};

use super::records::Record;

/// Body of `POST /api/transcriptions`.
///
/// Every field is optional; `page` defaults to 1 and `limit` to the configured page size.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionsRequest {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Substring of the record id
    pub search_value: Option<String>,
    /// Substring of the caller number
    pub filter_from: Option<String>,
    /// One-shot filter context restricting the listing to a set of record ids
    pub filter_token: Option<String>,
}

/// Query of `GET /api/transcriptions/export`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    pub search_value: Option<String>,
    pub filter_from: Option<String>,
    pub filter_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageMeta {
    /// `ceil(total_matched / limit)`
    pub page_count: u64,
    pub page: u64,
    /// Matches after filtering, before pagination
    pub total_matched: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionsResponse {
    pub conversations: Vec<Record>,
    pub meta: PageMeta,
}
