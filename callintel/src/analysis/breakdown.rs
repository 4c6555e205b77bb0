//! Deterministic chart data computed from the individual list, without text generation.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use crate::api::models::analysis::{AnalysisBreakdown, IndividualAnalysis, LabelBucket, SentimentDay};
use crate::types::RecordId;

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn label(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn bucket(label: String, record_ids: Vec<RecordId>) -> LabelBucket {
    LabelBucket {
        label,
        count: record_ids.len(),
        record_ids,
    }
}

/// Sentiment per UTC day (ascending), business outcomes by frequency, and local score averages.
///
/// Sentiment labels are lowercased; outcomes are kept as written. Entries without a label are
/// left out of that chart but still count towards `analysed_records`.
pub fn breakdown(individual: &[IndividualAnalysis]) -> AnalysisBreakdown {
    let mut by_day: BTreeMap<NaiveDate, BTreeMap<String, Vec<RecordId>>> = BTreeMap::new();
    let mut outcomes: HashMap<&str, Vec<RecordId>> = HashMap::new();

    for entry in individual {
        if let Some(sentiment) = label(entry.payload.sentiment.as_deref()) {
            by_day
                .entry(entry.created_at.date_naive())
                .or_default()
                .entry(sentiment.to_lowercase())
                .or_default()
                .push(entry.record_id.clone());
        }

        if let Some(outcome) = label(entry.payload.business_outcome.as_deref()) {
            outcomes.entry(outcome).or_default().push(entry.record_id.clone());
        }
    }

    let sentiment_by_day = by_day
        .into_iter()
        .map(|(date, sentiments)| SentimentDay {
            date,
            sentiments: sentiments.into_iter().map(|(label, ids)| bucket(label, ids)).collect(),
        })
        .collect();

    let mut business_outcomes: Vec<LabelBucket> = outcomes
        .into_iter()
        .map(|(label, ids)| bucket(label.to_string(), ids))
        .collect();
    business_outcomes.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));

    AnalysisBreakdown {
        analysed_records: individual.len(),
        sentiment_by_day,
        business_outcomes,
        average_nps_score: mean(individual.iter().filter_map(|e| e.payload.nps_score)),
        average_csat_score: mean(individual.iter().filter_map(|e| e.payload.csat_score)),
    }
}
