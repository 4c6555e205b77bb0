//! Prompt for the aggregate summary.

use crate::api::models::analysis::OpenAiAnalysis;
use crate::upstream::ChatMessage;

const AGGREGATE_INSTRUCTIONS: &str = r#"You are given a JSON array of analyses of individual customer service calls.
Summarise them across all calls. Reply with a single JSON object and nothing else, using exactly these keys:

{
    "average_nps_score": <number, mean NPS across the calls>,
    "average_csat_score": <number, mean CSAT across the calls>,
    "sentiment_summary": "<plain text summary of sentiment trends>",
    "business_outcome_summary": "<plain text summary of recurring business outcome themes>"
}"#;

/// One system message with the instructions, one user message with the serialised payloads.
pub fn aggregate_messages(payloads: &[&OpenAiAnalysis]) -> serde_json::Result<Vec<ChatMessage>> {
    Ok(vec![
        ChatMessage::system(AGGREGATE_INSTRUCTIONS),
        ChatMessage::user(serde_json::to_string(payloads)?),
    ])
}
