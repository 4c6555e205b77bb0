//! Client for the transcript intelligence service.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};
use url::Url;

use super::{UpstreamError, http_client, join_segments, read_json};
use crate::api::models::operator_results::OperatorResult;
use crate::api::models::records::{Record, RecordDetails, RecordStatus};
use crate::config::IntelligenceConfig;
use crate::errors::{EnrichmentFailure, Error, Result};

/// Source of call records, newest first.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Up to `limit` records for the configured account and service, ordered by creation time
    /// descending. Transport and format errors surface as [`Error::SearchFailure`].
    async fn fetch_recent(&self, limit: u32) -> Result<Vec<Record>>;
}

/// Per-transcript lookups.
#[async_trait]
pub trait TranscriptService: Send + Sync {
    /// Status and recording reference for one transcript.
    async fn details(&self, record_id: &str) -> std::result::Result<RecordDetails, EnrichmentFailure>;

    async fn operator_results(&self, record_id: &str) -> Result<Vec<OperatorResult>>;

    /// Mint an annotator view token; the upstream JSON is returned untouched.
    async fn view_token(&self, record_id: &str) -> Result<Value>;
}

/// reqwest implementation of both [`RecordSource`] and [`TranscriptService`].
pub struct IntelligenceClient {
    client: Client,
    search_url: Url,
    transcripts_url: Url,
    tokens_url: Url,
    account_sid: String,
    auth_token: Option<String>,
    service_sid: String,
}

impl IntelligenceClient {
    pub fn new(config: &IntelligenceConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(config.request_timeout)?,
            search_url: config.search_url.clone(),
            transcripts_url: config.transcripts_url.clone(),
            tokens_url: config.tokens_url.clone(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            service_sid: config.service_sid.clone(),
        })
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .basic_auth(&self.account_sid, self.auth_token.as_ref())
    }

    fn post(&self, url: Url) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .basic_auth(&self.account_sid, self.auth_token.as_ref())
    }

    fn search_body(&self, limit: u32) -> Value {
        json!({
            "search_fields": [
                { "field": "account_sid", "eq": self.account_sid },
                { "field": "service_sid", "eq": self.service_sid },
            ],
            "ordering": { "field": "date_created", "order": "desc" },
            "page": 1,
            "limit": limit,
        })
    }

    async fn fetch_details(&self, record_id: &str) -> std::result::Result<RecordDetails, UpstreamError> {
        let url = join_segments(&self.transcripts_url, [record_id])?;
        let response = self.get(url).send().await?;
        let details: DetailsResponse = read_json(response).await?;
        Ok(details.into())
    }

    async fn fetch_operator_results(&self, record_id: &str) -> std::result::Result<Vec<OperatorResult>, UpstreamError> {
        let url = join_segments(&self.transcripts_url, [record_id, "OperatorResults"])?;
        let response = self.get(url).send().await?;
        let body: OperatorResultsResponse = read_json(response).await?;
        Ok(body.operator_results)
    }

    async fn request_token(&self, body: &Value) -> std::result::Result<Value, UpstreamError> {
        let response = self.post(self.tokens_url.clone()).json(body).send().await?;
        read_json(response).await
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    conversations: Option<Vec<Record>>,
    meta: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    channel: Option<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default)]
    media_properties: Option<MediaProperties>,
}

#[derive(Debug, Deserialize)]
struct MediaProperties {
    #[serde(default)]
    source_sid: Option<String>,
}

impl From<DetailsResponse> for RecordDetails {
    fn from(details: DetailsResponse) -> Self {
        let status = details
            .status
            .and_then(|status| serde_json::from_value::<RecordStatus>(Value::String(status)).ok());
        let recording_reference = details
            .channel
            .and_then(|channel| channel.media_properties)
            .and_then(|media| media.source_sid);
        Self {
            status,
            recording_reference,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OperatorResultsResponse {
    #[serde(default)]
    operator_results: Vec<OperatorResult>,
}

#[async_trait]
impl RecordSource for IntelligenceClient {
    #[instrument(skip(self))]
    async fn fetch_recent(&self, limit: u32) -> Result<Vec<Record>> {
        let response = self
            .post(self.search_url.clone())
            .json(&self.search_body(limit))
            .send()
            .await
            .map_err(|e| Error::SearchFailure { message: e.to_string() })?;

        let body: SearchResponse = read_json(response)
            .await
            .map_err(|e| Error::SearchFailure { message: e.to_string() })?;

        match body {
            SearchResponse {
                conversations: Some(conversations),
                meta: Some(_),
            } => {
                debug!("Search returned {} records", conversations.len());
                Ok(conversations)
            }
            _ => Err(Error::SearchFailure {
                message: "Invalid response format: missing conversations or meta".to_string(),
            }),
        }
    }
}

#[async_trait]
impl TranscriptService for IntelligenceClient {
    #[instrument(skip(self))]
    async fn details(&self, record_id: &str) -> std::result::Result<RecordDetails, EnrichmentFailure> {
        self.fetch_details(record_id).await.map_err(|e| EnrichmentFailure {
            record_id: record_id.to_string(),
            message: e.to_string(),
        })
    }

    #[instrument(skip(self))]
    async fn operator_results(&self, record_id: &str) -> Result<Vec<OperatorResult>> {
        self.fetch_operator_results(record_id).await.map_err(|e| {
            if e.is_not_found() {
                Error::NotFound {
                    resource: "Operator results".to_string(),
                    id: record_id.to_string(),
                }
            } else {
                Error::Upstream {
                    operation: "fetch operator results".to_string(),
                    message: e.to_string(),
                }
            }
        })
    }

    #[instrument(skip(self))]
    async fn view_token(&self, record_id: &str) -> Result<Value> {
        let body = json!({
            "grants": [{
                "product": "annotator",
                "service_sid": self.service_sid,
                "transcript_sid": record_id,
                "metadata": { "isDownloadButtonVisible": true },
            }],
        });

        self.request_token(&body).await.map_err(|e| Error::Upstream {
            operation: "create view token".to_string(),
            message: e.to_string(),
        })
    }
}
