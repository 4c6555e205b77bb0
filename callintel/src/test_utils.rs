//! Test utilities: configuration, stub collaborators and a wiremock-backed test app.

use async_trait::async_trait;
use axum_test::TestServer;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::api::models::records::Record;
use crate::config::Config;
use crate::errors::Result;
use crate::store::InMemoryStore;
use crate::upstream::{ChatMessage, IntelligenceClient, RecordSource, TextGeneration};
use crate::{AppState, Application};

/// A fenced summary reply, the way chat models tend to answer.
pub const VALID_SUMMARY: &str = r#"```json
{
  "average_nps_score": 7,
  "average_csat_score": 6.5,
  "sentiment_summary": "Mostly positive",
  "business_outcome_summary": "Most calls ended in a refund"
}
```"#;

/// Config with the intelligence endpoints pointed at `intelligence_uri` and metrics off.
pub fn test_config(intelligence_uri: &str) -> Config {
    let base = intelligence_uri.trim_end_matches('/');
    let mut config = Config::default();
    config.intelligence.search_url = Url::parse(&format!("{base}/v1/Search")).expect("search url");
    config.intelligence.transcripts_url = Url::parse(&format!("{base}/v2/Transcripts")).expect("transcripts url");
    config.intelligence.tokens_url = Url::parse(&format!("{base}/v1/Tokens")).expect("tokens url");
    config.intelligence.account_sid = "ACtest".to_string();
    config.intelligence.auth_token = Some("secret".to_string());
    config.intelligence.service_sid = "GAtest".to_string();
    config.enable_metrics = false;
    config
}

/// Fixed record list that remembers which limits it was asked for.
pub struct StubRecords {
    records: Vec<Record>,
    limits: Mutex<Vec<u32>>,
}

impl StubRecords {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            limits: Mutex::new(Vec::new()),
        }
    }

    pub fn requested_limits(&self) -> Vec<u32> {
        self.limits.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSource for StubRecords {
    async fn fetch_recent(&self, limit: u32) -> Result<Vec<Record>> {
        self.limits.lock().unwrap().push(limit);
        Ok(self.records.iter().take(limit as usize).cloned().collect())
    }
}

/// Canned text generation that records every prompt it receives.
pub struct StubCompletion {
    reply: Option<String>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl StubCompletion {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGeneration for StubCompletion {
    async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        self.calls.lock().unwrap().push(messages.to_vec());
        self.reply
            .clone()
            .ok_or_else(|| anyhow::anyhow!("completion endpoint unavailable"))
    }
}

/// A search hit in the upstream wire shape.
pub fn conversation(sid: &str, date_created: &str, from: &str) -> Value {
    json!({
        "sid": sid,
        "date_created": date_created,
        "from_number": from,
        "to_number": "+15550000000",
    })
}

pub async fn mock_search(server: &MockServer, conversations: Value) {
    Mock::given(method("POST"))
        .and(path("/v1/Search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversations": conversations,
            "meta": { "page": 1 },
        })))
        .mount(server)
        .await;
}

pub async fn mock_details(server: &MockServer, sid: &str, status: &str, recording: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/v2/Transcripts/{sid}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sid": sid,
            "status": status,
            "channel": { "media_properties": { "source_sid": recording } },
        })))
        .mount(server)
        .await;
}

pub struct TestApp {
    pub server: TestServer,
    pub intelligence: MockServer,
    pub store: Arc<InMemoryStore>,
    pub completion: Arc<StubCompletion>,
    pub state: AppState,
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(StubCompletion::new(VALID_SUMMARY)).await
}

/// Full router over a wiremock intelligence service, an in-memory store and `completion`.
pub async fn create_test_app_with(completion: StubCompletion) -> TestApp {
    let intelligence = MockServer::start().await;
    let config = test_config(&intelligence.uri());

    let client = Arc::new(IntelligenceClient::new(&config.intelligence).expect("Failed to create intelligence client"));
    let store = Arc::new(InMemoryStore::new());
    let completion = Arc::new(completion);

    let state = AppState::assemble(config, client.clone(), client, store.clone(), completion.clone());
    let server = Application::with_state(state.clone())
        .expect("Failed to build application")
        .into_test_server();

    TestApp {
        server,
        intelligence,
        store,
        completion,
        state,
    }
}
