//! API request and response data models.
//!
//! Wire types are kept apart from the upstream clients and the store so each can evolve
//! independently. Field names follow what the dashboard already consumes: upstream snake_case
//! for records and analyses, camelCase for request bodies.
//!
//! - [`records`]: call records as listed and enriched
//! - [`analysis`]: per-record analysis payloads, aggregate summary, breakdown
//! - [`operator_results`]: typed operator outputs
//! - [`pagination`]: listing request/response
//! - [`filter_context`]: one-shot cross-view filters
//! - [`tokens`]: annotator view tokens

pub mod analysis;
pub mod filter_context;
pub mod operator_results;
pub mod pagination;
pub mod records;
pub mod tokens;
