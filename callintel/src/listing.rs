//! Record listing: local filtering, pagination and per-page enrichment.
//!
//! The search service is asked for one large window of records (the over-fetch limit), the
//! filters are applied here, and only the requested page is enriched with per-record details.

use futures::StreamExt;
use futures::stream;
use metrics::counter;
use std::collections::HashSet;
use tracing::{instrument, warn};

use crate::api::models::pagination::PageMeta;
use crate::api::models::records::Record;
use crate::errors::{Error, Result};
use crate::types::RecordId;
use crate::upstream::TranscriptService;

/// Conjunctive record filters. Blank strings are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    /// Substring of the record id
    pub text_contains: Option<String>,
    /// Substring of the caller number
    pub from_contains: Option<String>,
    /// Only these ids (from a consumed filter context)
    pub record_ids: Option<HashSet<RecordId>>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl SearchFilters {
    pub fn new(search_value: Option<String>, filter_from: Option<String>) -> Self {
        Self {
            text_contains: non_blank(search_value),
            from_contains: non_blank(filter_from),
            record_ids: None,
        }
    }

    pub fn restrict_to(mut self, ids: impl IntoIterator<Item = RecordId>) -> Self {
        self.record_ids = Some(ids.into_iter().collect());
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        if let Some(text) = &self.text_contains
            && !record.id.contains(text.as_str())
        {
            return false;
        }

        if let Some(from) = &self.from_contains
            && !record.from.as_deref().is_some_and(|number| number.contains(from.as_str()))
        {
            return false;
        }

        if let Some(ids) = &self.record_ids
            && !ids.contains(&record.id)
        {
            return false;
        }

        true
    }

    /// Keep matching records, preserving upstream order.
    pub fn apply(&self, records: Vec<Record>) -> Vec<Record> {
        records.into_iter().filter(|record| self.matches(record)).collect()
    }
}

/// Validated 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Apply defaults and bounds. `page` and `limit` below 1 are rejected; `limit` above
    /// `max_limit` is clamped.
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: u32, max_limit: u32) -> Result<Self> {
        let page = page.unwrap_or(1);
        if page < 1 {
            return Err(Error::BadRequest {
                message: format!("page must be at least 1, got {page}"),
            });
        }

        let limit = limit.unwrap_or(i64::from(default_limit));
        if limit < 1 {
            return Err(Error::BadRequest {
                message: format!("limit must be at least 1, got {limit}"),
            });
        }

        Ok(Self {
            page: page as u64,
            limit: (limit as u64).min(u64::from(max_limit)),
        })
    }
}

/// Slice one page out of the filtered set.
///
/// `page_count` is `ceil(total / limit)`; a page past the end is empty.
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> (Vec<T>, PageMeta) {
    let total = items.len() as u64;
    let meta = PageMeta {
        page_count: total.div_ceil(request.limit),
        page: request.page,
        total_matched: total,
    };

    let start = (request.page - 1).saturating_mul(request.limit);
    let page = items
        .into_iter()
        .skip(usize::try_from(start).unwrap_or(usize::MAX))
        .take(usize::try_from(request.limit).unwrap_or(usize::MAX))
        .collect();

    (page, meta)
}

/// Add status and recording reference to each record, with at most `concurrency` lookups in
/// flight.
///
/// Order is preserved. A failed lookup is logged and the record is returned as it was.
#[instrument(skip_all, fields(records = records.len()))]
pub async fn enrich(records: Vec<Record>, details: &dyn TranscriptService, concurrency: usize) -> Vec<Record> {
    stream::iter(records)
        .map(|record| async move {
            match details.details(&record.id).await {
                Ok(found) => record.enrich(found),
                Err(failure) => {
                    warn!(record_id = %failure.record_id, error = %failure.message, "Enrichment failed");
                    counter!("callintel_enrichment_failures_total").increment(1);
                    record
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}
