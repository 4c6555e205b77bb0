//! Derived analysis payloads, the aggregate summary and the deterministic breakdown.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::types::RecordId;

/// The "openai" analysis payload cached per record.
///
/// The pipeline that writes these is loose about types, so scores are accepted as numbers or
/// numeric strings. Fields this service doesn't interpret are carried through in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenAiAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_score", skip_serializing_if = "Option::is_none")]
    pub nps_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_score", skip_serializing_if = "Option::is_none")]
    pub csat_score: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OpenAiAnalysis {
    /// Validate a raw store payload.
    pub fn from_payload(payload: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(payload)
    }
}

fn lenient_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("score '{s}' is not a number"))),
        Some(other) => Err(serde::de::Error::custom(format!("score must be a number, got {other}"))),
    }
}

/// One entry of the individual list: record metadata joined with its cached payload.
///
/// Serialises flat, `{...payload, date_created, transcription_sid}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndividualAnalysis {
    #[serde(rename = "transcription_sid")]
    pub record_id: RecordId,
    #[serde(rename = "date_created")]
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: OpenAiAnalysis,
}

impl IndividualAnalysis {
    pub fn new(record_id: RecordId, created_at: DateTime<Utc>, mut payload: OpenAiAnalysis) -> Self {
        // record metadata wins over anything the payload happens to carry under the same names
        payload.extra.remove("transcription_sid");
        payload.extra.remove("date_created");
        Self {
            record_id,
            created_at,
            payload,
        }
    }
}

/// Cross-call summary produced by the text-generation capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSummary {
    pub average_nps_score: f64,
    pub average_csat_score: f64,
    pub sentiment_summary: String,
    pub business_outcome_summary: String,
}

/// Count of records sharing a label, with the ids so a chart selection can be turned into a
/// filter context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelBucket {
    pub label: String,
    pub count: usize,
    pub record_ids: Vec<RecordId>,
}

/// Sentiment counts for one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentDay {
    pub date: NaiveDate,
    pub sentiments: Vec<LabelBucket>,
}

/// Response body of `GET /api/analysis-breakdown`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisBreakdown {
    pub analysed_records: usize,
    pub sentiment_by_day: Vec<SentimentDay>,
    pub business_outcomes: Vec<LabelBucket>,
    pub average_nps_score: Option<f64>,
    pub average_csat_score: Option<f64>,
}
