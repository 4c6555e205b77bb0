//! Annotator view tokens.

use serde::Deserialize;

/// Body of `POST /api/view-token`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewTokenRequest {
    pub transcription_sid: Option<String>,
}

impl ViewTokenRequest {
    pub fn record_id(&self) -> Option<&str> {
        self.transcription_sid.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }
}
