//! Call records as listed by the upstream search service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::RecordId;

/// Transcription lifecycle as reported by the per-transcript details endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Queued,
    #[serde(alias = "in-progress", alias = "in_progress")]
    Processing,
    #[serde(alias = "completed")]
    Complete,
    #[serde(alias = "canceled")]
    Failed,
}

/// One transcribed call.
///
/// Serialized in the upstream field naming so clients see the same shape the search service
/// returns, plus the enrichment fields. Unknown upstream fields are passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "sid")]
    pub id: RecordId,
    #[serde(rename = "date_created")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "from_number", default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(rename = "to_number", default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, deserialize_with = "lenient_status", skip_serializing_if = "Option::is_none")]
    pub status: Option<RecordStatus>,
    #[serde(rename = "recording_sid", default, skip_serializing_if = "Option::is_none")]
    pub recording_reference: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    /// Apply a successful details lookup.
    pub fn enrich(mut self, details: RecordDetails) -> Self {
        self.status = details.status;
        self.recording_reference = details.recording_reference;
        self
    }
}

/// Unknown status strings are treated as absent rather than failing the whole record.
fn lenient_status<'de, D>(deserializer: D) -> Result<Option<RecordStatus>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| serde_json::from_value(value).ok()))
}

/// Supplementary fields fetched per record from the details endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordDetails {
    pub status: Option<RecordStatus>,
    pub recording_reference: Option<String>,
}

/// `?transcriptionSid=` query used by the per-record endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordQuery {
    pub transcription_sid: Option<String>,
}

impl RecordQuery {
    /// The requested record id; blank values count as missing.
    pub fn record_id(&self) -> Option<&str> {
        self.transcription_sid.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
pub(crate) fn record(id: &str, created_at: &str, from: &str) -> Record {
    Record {
        id: id.to_string(),
        created_at: created_at.parse().expect("valid RFC 3339 timestamp"),
        from: Some(from.to_string()),
        to: Some("+15550000000".to_string()),
        status: None,
        recording_reference: None,
        extra: Map::new(),
    }
}
