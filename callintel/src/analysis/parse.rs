//! Parsing the text-generation reply into an [`AggregateSummary`].

use crate::api::models::analysis::AggregateSummary;
use crate::errors::{Error, Result};

/// Remove markdown code fences (```` ```json ```` and ```` ``` ````) and surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Strict parse: all four fields must be present with the right types.
pub fn parse_summary(raw: &str) -> Result<AggregateSummary> {
    let cleaned = strip_code_fences(raw);
    serde_json::from_str(&cleaned).map_err(|e| Error::AggregateParseFailure { message: e.to_string() })
}
