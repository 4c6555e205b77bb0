//! Common type definitions shared across the API, store and analysis layers.
//!
//! # ID Types
//!
//! Records are identified by the opaque transcript SID issued upstream (e.g. `GT0123...`).
//! The alias exists so signatures read as what they carry:
//!
//! - [`RecordId`]: transcript / call identifier
//!
//! # Analysis kinds
//!
//! [`AnalysisKind`] is the single canonical list of derived-analysis namespaces. Only the
//! kinds produced by the analysis pipeline are listed; nothing else is accepted.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type RecordId = String;

/// Store namespace prefix for per-record analysis maps (`RECORD_<id>`).
pub const RECORD_NAMESPACE_PREFIX: &str = "RECORD_";

/// Fixed store namespace that holds the singleton aggregate summary.
pub const AGGREGATE_NAMESPACE: &str = "AGGREGATED_ANALYSIS";

/// The kind of derived analysis stored for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalysisKind {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "humeai")]
    HumeAi,
}

impl AnalysisKind {
    /// Store sub-key for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::OpenAi => "openai",
            AnalysisKind::HumeAi => "humeai",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store namespace holding every analysis kind for one record.
pub fn record_namespace(record_id: &str) -> String {
    format!("{RECORD_NAMESPACE_PREFIX}{record_id}")
}
