//! HTTP request handlers for all API endpoints.
//!
//! Handlers validate the request, call the collaborators held in [`crate::AppState`] and
//! serialise the result. Errors are returned as [`crate::errors::Error`], which maps itself to
//! a status code and a `{error, code}` JSON body.
//!
//! # Handler Modules
//!
//! - [`transcriptions`]: filtered, paginated, enriched record listing and CSV export
//! - [`analyses`]: individual analyses, aggregate summary, breakdown, single-record analysis
//! - [`operator_results`]: typed operator results for one record
//! - [`view_token`]: annotator view tokens
//! - [`filter_context`]: one-shot cross-view filter contexts

pub mod analyses;
pub mod filter_context;
pub mod operator_results;
pub mod transcriptions;
pub mod view_token;
