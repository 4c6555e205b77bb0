//! Operator results attached to a transcript by the intelligence service.
//!
//! Upstream returns one flat object per operator whose optional fields depend on
//! `operator_type`. Here the output is parsed into [`OperatorOutput`] so consumers match on a
//! variant instead of probing for fields; the flat shape is restored on serialisation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::types::RecordId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawOperatorResult", into = "RawOperatorResult")]
pub struct OperatorResult {
    pub name: String,
    pub operator_sid: String,
    pub transcript_sid: RecordId,
    pub operator_type: String,
    pub output: OperatorOutput,
    /// Fields outside the operator output (urls, account ids, ...)
    pub extra: Map<String, Value>,
}

/// Operator output, one variant per family of operator types.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorOutput {
    ConversationClassify {
        predicted_label: Option<String>,
        label_probabilities: BTreeMap<String, f64>,
        predicted_probability: Option<f64>,
    },
    UtteranceClassify {
        match_probability: Option<f64>,
        utterance_results: Vec<UtteranceResult>,
    },
    Extract {
        extract_results: Map<String, Value>,
        utterance_results: Vec<UtteranceResult>,
    },
    TextGeneration {
        result: String,
        format: Option<String>,
    },
    /// Unrecognised operator type; output fields kept verbatim.
    Other(Map<String, Value>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtteranceResult {
    #[serde(default)]
    pub utterance_parts: Vec<UtterancePart>,
    pub utterance_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_probabilities: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtterancePart {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TextGenerationResults {
    result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    format: Option<String>,
}

/// Upstream wire shape.
#[derive(Debug, Serialize, Deserialize)]
struct RawOperatorResult {
    name: String,
    operator_sid: String,
    transcript_sid: String,
    operator_type: String,
    #[serde(flatten)]
    output: RawOutput,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    predicted_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label_probabilities: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    predicted_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    match_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    extract_results: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    utterance_results: Option<Vec<UtteranceResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text_generation_results: Option<TextGenerationResults>,
}

impl RawOutput {
    fn into_map(self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

impl OperatorOutput {
    fn from_raw(operator_type: &str, raw: RawOutput) -> Self {
        match operator_type {
            "conversation-classify" => OperatorOutput::ConversationClassify {
                predicted_label: raw.predicted_label,
                label_probabilities: raw.label_probabilities.unwrap_or_default(),
                predicted_probability: raw.predicted_probability,
            },
            "utterance-classify" => OperatorOutput::UtteranceClassify {
                match_probability: raw.match_probability,
                utterance_results: raw.utterance_results.unwrap_or_default(),
            },
            "extract" | "extract-normalize" | "pii-extract" => OperatorOutput::Extract {
                extract_results: raw.extract_results.unwrap_or_default(),
                utterance_results: raw.utterance_results.unwrap_or_default(),
            },
            "text-generation" => match raw.text_generation_results {
                Some(TextGenerationResults { result, format }) => OperatorOutput::TextGeneration { result, format },
                None => OperatorOutput::Other(raw.into_map()),
            },
            _ => OperatorOutput::Other(raw.into_map()),
        }
    }

    /// Restore the flat field set. `Other` returns its map as passthrough fields.
    fn into_raw(self) -> (RawOutput, Map<String, Value>) {
        match self {
            OperatorOutput::ConversationClassify {
                predicted_label,
                label_probabilities,
                predicted_probability,
            } => (
                RawOutput {
                    predicted_label,
                    label_probabilities: Some(label_probabilities),
                    predicted_probability,
                    ..Default::default()
                },
                Map::new(),
            ),
            OperatorOutput::UtteranceClassify {
                match_probability,
                utterance_results,
            } => (
                RawOutput {
                    match_probability,
                    utterance_results: Some(utterance_results),
                    ..Default::default()
                },
                Map::new(),
            ),
            OperatorOutput::Extract {
                extract_results,
                utterance_results,
            } => (
                RawOutput {
                    extract_results: Some(extract_results),
                    utterance_results: Some(utterance_results),
                    ..Default::default()
                },
                Map::new(),
            ),
            OperatorOutput::TextGeneration { result, format } => (
                RawOutput {
                    text_generation_results: Some(TextGenerationResults { result, format }),
                    ..Default::default()
                },
                Map::new(),
            ),
            OperatorOutput::Other(map) => (RawOutput::default(), map),
        }
    }
}

impl From<RawOperatorResult> for OperatorResult {
    fn from(raw: RawOperatorResult) -> Self {
        let output = OperatorOutput::from_raw(&raw.operator_type, raw.output);
        Self {
            name: raw.name,
            operator_sid: raw.operator_sid,
            transcript_sid: raw.transcript_sid,
            operator_type: raw.operator_type,
            output,
            extra: raw.extra,
        }
    }
}

impl From<OperatorResult> for RawOperatorResult {
    fn from(result: OperatorResult) -> Self {
        let (output, passthrough) = result.output.into_raw();
        let mut extra = result.extra;
        extra.extend(passthrough);
        Self {
            name: result.name,
            operator_sid: result.operator_sid,
            transcript_sid: result.transcript_sid,
            operator_type: result.operator_type,
            output,
            extra,
        }
    }
}
