use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

use crate::types::{AnalysisKind, RecordId};

#[derive(ThisError, Debug)]
pub enum Error {
    /// Missing or invalid request parameter
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Upstream record listing unreachable or returned a malformed body
    #[error("Record search failed: {message}")]
    SearchFailure { message: String },

    /// The record source returned nothing to analyse
    #[error("No transcripts found")]
    NoRecordsFound,

    /// Records exist but none of them has a cached analysis
    #[error("No analysis data found")]
    NoAnalysisData,

    /// Text-generation output was not valid JSON after cleanup
    #[error("Unable to parse analysis JSON: {message}")]
    AggregateParseFailure { message: String },

    /// Writing to the analysis store failed
    #[error("Failed to write {kind} analysis for {key}: {message}")]
    StoreWriteFailure {
        key: String,
        kind: AnalysisKind,
        message: String,
    },

    /// Any other outbound call failed (details, operator results, tokens, completion)
    #[error("Failed to {operation}: {message}")]
    Upstream { operation: String, message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::SearchFailure { .. }
            | Error::NoRecordsFound
            | Error::NoAnalysisData
            | Error::AggregateParseFailure { .. }
            | Error::StoreWriteFailure { .. }
            | Error::Upstream { .. }
            | Error::Internal { .. }
            | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error kind returned alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            Error::BadRequest { .. } => "bad_request",
            Error::NotFound { .. } => "not_found",
            Error::SearchFailure { .. } => "search_failure",
            Error::NoRecordsFound => "no_records_found",
            Error::NoAnalysisData => "no_analysis_data",
            Error::AggregateParseFailure { .. } => "aggregate_parse_failure",
            Error::StoreWriteFailure { .. } => "store_write_failure",
            Error::Upstream { .. } => "upstream_failure",
            Error::Internal { .. } | Error::Other(_) => "internal",
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::BadRequest { message } => message.clone(),
            Error::NotFound { resource, id } => format!("{resource} with ID {id} not found"),
            Error::SearchFailure { .. } => "Unable to fetch transcriptions".to_string(),
            Error::NoRecordsFound => "No transcripts found".to_string(),
            Error::NoAnalysisData => "No analysis data found".to_string(),
            Error::AggregateParseFailure { .. } => "Unable to perform aggregated analysis".to_string(),
            Error::StoreWriteFailure { .. } => "Unable to store analysis".to_string(),
            Error::Upstream { operation, .. } => format!("Unable to {operation}"),
            Error::Internal { .. } | Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Internal { .. } | Error::Other(_) | Error::StoreWriteFailure { .. } => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::SearchFailure { .. } | Error::Upstream { .. } | Error::AggregateParseFailure { .. } => {
                tracing::error!("Upstream error: {}", self);
            }
            Error::NoRecordsFound | Error::NoAnalysisData => {
                tracing::warn!("Nothing to analyse: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let body = json!({
            "error": self.user_message(),
            "code": self.code(),
        });
        (self.status_code(), Json(body)).into_response()
    }
}

/// Per-record details lookup failed.
///
/// Never surfaces in a response: the record is returned without the supplementary fields.
#[derive(ThisError, Debug)]
#[error("Failed to enrich record {record_id}: {message}")]
pub struct EnrichmentFailure {
    pub record_id: RecordId,
    pub message: String,
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_status_codes() {
        let missing = Error::BadRequest {
            message: "transcriptionSid not provided".to_string(),
        };
        assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);

        let miss = Error::NotFound {
            resource: "openai analysis".to_string(),
            id: "GT123".to_string(),
        };
        assert_eq!(miss.status_code(), StatusCode::NOT_FOUND);

        for err in [
            Error::NoRecordsFound,
            Error::NoAnalysisData,
            Error::SearchFailure { message: "boom".into() },
            Error::AggregateParseFailure { message: "eof".into() },
        ] {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_distinct_codes_for_empty_inputs() {
        assert_eq!(Error::NoRecordsFound.code(), "no_records_found");
        assert_eq!(Error::NoAnalysisData.code(), "no_analysis_data");
        assert_ne!(Error::NoRecordsFound.code(), Error::NoAnalysisData.code());
    }

    #[test]
    fn test_user_message_hides_upstream_details() {
        let err = Error::SearchFailure {
            message: "connection refused (os error 111) at 10.0.0.4".to_string(),
        };
        assert!(!err.user_message().contains("10.0.0.4"));

        let err = Error::Other(anyhow::anyhow!("secret token leaked"));
        assert_eq!(err.user_message(), "Internal server error");
    }

    #[tokio::test]
    async fn test_response_body_carries_code() {
        let response = Error::NoAnalysisData.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "no_analysis_data");
        assert_eq!(body["error"], "No analysis data found");
    }
}
