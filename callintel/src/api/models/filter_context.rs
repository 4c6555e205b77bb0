//! One-shot filter contexts passed from an aggregate chart to the record list.

use serde::{Deserialize, Serialize};

use crate::types::RecordId;

/// Body of `POST /api/filter-context`, also the body returned when the context is consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterContext {
    /// What the selection was, e.g. `"2024-05-01 negative"`
    pub label: String,
    pub record_ids: Vec<RecordId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterContextCreated {
    pub token: String,
    pub expires_in_seconds: u64,
}
