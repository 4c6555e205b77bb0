//! Cache-aside aggregation of per-record analyses.
//!
//! [`AnalysisAggregator`] reads a bounded window of recent records, joins each one against its
//! cached "openai" analysis and skips records that have none yet. The analysis pipeline that
//! writes those payloads runs elsewhere and asynchronously, so this is a read-mostly view over
//! whatever has completed so far. The joined payloads are summarised with a single
//! text-generation call and the summary is written back under the aggregate namespace.

pub mod breakdown;
pub mod parse;
pub mod prompt;

use futures::StreamExt;
use futures::stream;
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::api::models::analysis::{AggregateSummary, IndividualAnalysis, OpenAiAnalysis};
use crate::api::models::records::Record;
use crate::config::AggregationConfig;
use crate::errors::{Error, Result};
use crate::store::{AnalysisStore, StoreKey};
use crate::types::{AGGREGATE_NAMESPACE, AnalysisKind};
use crate::upstream::{RecordSource, TextGeneration};

pub struct AnalysisAggregator {
    records: Arc<dyn RecordSource>,
    store: Arc<dyn AnalysisStore>,
    generator: Arc<dyn TextGeneration>,
    max_records: usize,
    lookup_concurrency: usize,
}

impl AnalysisAggregator {
    pub fn new(
        records: Arc<dyn RecordSource>,
        store: Arc<dyn AnalysisStore>,
        generator: Arc<dyn TextGeneration>,
        config: &AggregationConfig,
    ) -> Self {
        Self {
            records,
            store,
            generator,
            max_records: config.max_records.max(1),
            lookup_concurrency: config.lookup_concurrency.max(1),
        }
    }

    /// Cached analysis for one record, or `None` for a miss.
    ///
    /// Store errors and payloads that fail validation are logged and count as misses.
    async fn lookup(&self, record: Record) -> Option<IndividualAnalysis> {
        let key = StoreKey::Record(record.id.clone());
        let payload = match self.store.get(&key, AnalysisKind::OpenAi).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!(record_id = %record.id, kind = %AnalysisKind::OpenAi, "No cached analysis");
                counter!("callintel_analysis_lookups_total", "outcome" => "miss").increment(1);
                return None;
            }
            Err(e) => {
                warn!(record_id = %record.id, kind = %AnalysisKind::OpenAi, error = %e, "Analysis lookup failed");
                counter!("callintel_analysis_lookups_total", "outcome" => "error").increment(1);
                return None;
            }
        };

        match OpenAiAnalysis::from_payload(payload) {
            Ok(analysis) => {
                counter!("callintel_analysis_lookups_total", "outcome" => "hit").increment(1);
                Some(IndividualAnalysis::new(record.id, record.created_at, analysis))
            }
            Err(e) => {
                warn!(record_id = %record.id, kind = %AnalysisKind::OpenAi, error = %e, "Cached analysis is invalid");
                counter!("callintel_analysis_lookups_total", "outcome" => "invalid").increment(1);
                None
            }
        }
    }

    /// Recent records joined with their cached analyses, newest first.
    ///
    /// Fails with [`Error::NoRecordsFound`] when the source has no records. Records without an
    /// analysis are skipped, so the result may be empty.
    #[instrument(skip(self))]
    pub async fn collect_individual(&self) -> Result<Vec<IndividualAnalysis>> {
        let limit = u32::try_from(self.max_records).unwrap_or(u32::MAX);
        let records = self.records.fetch_recent(limit).await?;
        if records.is_empty() {
            return Err(Error::NoRecordsFound);
        }

        let fetched = records.len();
        // buffered (not buffer_unordered) keeps the newest-first order
        let individual: Vec<IndividualAnalysis> = stream::iter(records)
            .map(|record| self.lookup(record))
            .buffered(self.lookup_concurrency)
            .filter_map(|entry| async move { entry })
            .take(self.max_records)
            .collect()
            .await;

        debug!(fetched, hits = individual.len(), "Joined records with cached analyses");
        Ok(individual)
    }

    /// Summarise `individual` with one text-generation call and store the result.
    #[instrument(skip_all, fields(entries = individual.len()))]
    pub async fn summarize(&self, individual: &[IndividualAnalysis]) -> Result<AggregateSummary> {
        if individual.is_empty() {
            return Err(Error::NoAnalysisData);
        }

        let payloads: Vec<&OpenAiAnalysis> = individual.iter().map(|entry| &entry.payload).collect();
        let messages = prompt::aggregate_messages(&payloads).map_err(|e| Error::Other(e.into()))?;

        let reply = self.generator.complete(&messages).await.map_err(|e| Error::Upstream {
            operation: "generate aggregate summary".to_string(),
            message: format!("{e:#}"),
        })?;

        let summary = match parse::parse_summary(&reply) {
            Ok(summary) => summary,
            Err(e) => {
                debug!("Unparseable summary reply: {}", reply);
                return Err(e);
            }
        };

        let document = serde_json::to_value(&summary).map_err(|e| Error::Other(e.into()))?;
        self.store
            .upsert(&StoreKey::Aggregate, AnalysisKind::OpenAi, document)
            .await
            .map_err(|e| Error::StoreWriteFailure {
                key: AGGREGATE_NAMESPACE.to_string(),
                kind: AnalysisKind::OpenAi,
                message: format!("{e:#}"),
            })?;

        counter!("callintel_aggregate_runs_total").increment(1);
        info!(entries = individual.len(), "Aggregate summary updated");
        Ok(summary)
    }

    /// The individual list and a freshly computed aggregate over it.
    pub async fn build_individual_and_aggregate(&self) -> Result<(Vec<IndividualAnalysis>, AggregateSummary)> {
        let individual = self.collect_individual().await?;
        let summary = self.summarize(&individual).await?;
        Ok((individual, summary))
    }
}
