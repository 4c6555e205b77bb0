//! Outbound HTTP clients.
//!
//! Each external capability sits behind an async trait so handlers and the aggregator can be
//! exercised against stubs; the reqwest implementations live next to the trait.
//!
//! - [`intelligence`]: transcript search, per-transcript details, operator results, view tokens
//! - [`completion`]: chat-completion text generation
//!
//! No call is retried. Every client is built with an explicit request timeout.

pub mod completion;
pub mod intelligence;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub use completion::{ChatCompletions, ChatMessage, ChatRole, TextGeneration};
pub use intelligence::{IntelligenceClient, RecordSource, TranscriptService};

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("error decoding response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(String),
}

impl UpstreamError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, UpstreamError::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

pub(crate) fn http_client(timeout: Duration) -> anyhow::Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Check the status, then decode the body, logging it when it doesn't parse.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, UpstreamError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(UpstreamError::Status { status, body });
    }

    let body_text = response.text().await?;
    serde_json::from_str(&body_text).map_err(|e| {
        tracing::debug!("Response body was: {}", body_text);
        UpstreamError::Decode(e)
    })
}

/// `base` with `segments` appended as escaped path segments.
pub(crate) fn join_segments<'a>(
    base: &Url,
    segments: impl IntoIterator<Item = &'a str>,
) -> Result<Url, UpstreamError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| UpstreamError::Url(format!("{base} cannot be a base url")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
