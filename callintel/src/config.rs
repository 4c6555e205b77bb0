//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `CALLINTEL_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `CALLINTEL_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `CALLINTEL_INTELLIGENCE__AUTH_TOKEN=...` sets the `intelligence.auth_token` field.
//!
//! ## Configuration Structure
//!
//! - **Server**: `host`, `port`
//! - **Intelligence**: `intelligence.*` - transcript search, details, operator results and tokens
//! - **Store**: `store.type` (`memory` or `sync`) - where derived analyses are cached
//! - **Completion**: `completion.*` - chat-completion endpoint used for aggregate summaries
//! - **Search / Aggregation**: over-fetch window, page size defaults, aggregation caps
//! - **Filter contexts**: TTL and capacity of one-shot cross-view filters
//! - **CORS**: allowed origins
//! - **Features**: `enable_metrics`, `enable_otel_export`
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! CALLINTEL_PORT=8080
//! CALLINTEL_INTELLIGENCE__ACCOUNT_SID=AC...
//! CALLINTEL_INTELLIGENCE__AUTH_TOKEN=...
//! CALLINTEL_COMPLETION__API_KEY=sk-...
//! CALLINTEL_STORE__TYPE=sync
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "CALLINTEL_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// All fields have defaults, so an empty YAML file yields a runnable (in-memory store) setup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Transcript intelligence service (search, details, operator results, tokens)
    pub intelligence: IntelligenceConfig,
    /// Derived analysis store
    pub store: StoreConfig,
    /// Text-generation endpoint used for aggregate summaries
    pub completion: CompletionConfig,
    /// Listing / search behaviour
    pub search: SearchConfig,
    /// Aggregate analysis behaviour
    pub aggregation: AggregationConfig,
    /// One-shot cross-view filter contexts
    pub filter_context: FilterContextConfig,
    /// CORS settings
    pub cors: CorsConfig,
    /// Enable Prometheus metrics endpoint at `/internal/metrics`
    pub enable_metrics: bool,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

/// Upstream transcript intelligence service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntelligenceConfig {
    /// Search endpoint (POST) returning `{conversations, meta}`
    pub search_url: Url,
    /// Base URL for per-transcript resources (`<base>/<sid>`, `<base>/<sid>/OperatorResults`)
    pub transcripts_url: Url,
    /// Token endpoint used to mint annotator view tokens
    pub tokens_url: Url,
    /// Account identifier (basic-auth user and search scope)
    pub account_sid: String,
    /// Account secret (basic-auth password)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Intelligence service identifier (search scope and token grant)
    pub service_sid: String,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

/// Where derived analyses live.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Process-local store (development, tests)
    #[default]
    Memory,
    /// Remote sync-map service
    Sync {
        /// Base URL of the sync API (e.g. `https://sync.twilio.com/v1`)
        base_url: Url,
        /// Sync service identifier
        service_sid: String,
        /// Basic-auth user
        account_sid: String,
        /// Basic-auth password
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auth_token: Option<String>,
        /// Per-request timeout
        #[serde(default = "default_store_timeout", with = "humantime_serde")]
        request_timeout: Duration,
    },
}

fn default_store_timeout() -> Duration {
    Duration::from_secs(15)
}

/// Chat-completion endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompletionConfig {
    /// OpenAI-compatible base URL (`<base>/chat/completions` is called)
    pub base_url: Url,
    /// Bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model name sent with every request
    pub model: String,
    /// Sampling temperature
    pub temperature: f64,
    /// Timeout for the single aggregate call
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

/// Listing / search configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Number of records fetched from upstream per listing before local filtering
    pub over_fetch_limit: u32,
    /// Page size used when the request doesn't specify one
    pub default_limit: u32,
    /// Number of per-record detail lookups in flight at once
    pub enrichment_concurrency: usize,
}

/// Aggregate analysis configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AggregationConfig {
    /// Maximum number of records joined into the individual list (bounds LLM cost)
    pub max_records: usize,
    /// Number of store lookups in flight at once
    pub lookup_concurrency: usize,
}

/// One-shot filter context configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterContextConfig {
    /// How long an unconsumed context survives
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// Maximum number of live contexts
    pub max_capacity: u64,
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// CORS origin configuration.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            intelligence: IntelligenceConfig::default(),
            store: StoreConfig::default(),
            completion: CompletionConfig::default(),
            search: SearchConfig::default(),
            aggregation: AggregationConfig::default(),
            filter_context: FilterContextConfig::default(),
            cors: CorsConfig::default(),
            enable_metrics: true,
            enable_otel_export: false,
        }
    }
}

impl Default for IntelligenceConfig {
    fn default() -> Self {
        Self {
            search_url: Url::parse("https://ai.twilio.com/v1/Search").expect("static url"),
            transcripts_url: Url::parse("https://intelligence.twilio.com/v2/Transcripts").expect("static url"),
            tokens_url: Url::parse("https://ai.twilio.com/v1/Tokens").expect("static url"),
            account_sid: String::new(),
            auth_token: None,
            service_sid: String::new(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://api.openai.com/v1").expect("static url"),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            over_fetch_limit: 1000,
            default_limit: 10,
            enrichment_concurrency: 8,
        }
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            max_records: 50,
            lookup_concurrency: 8,
        }
    }
}

impl Default for FilterContextConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10 * 60),
            max_capacity: 10_000,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            max_age: Some(3600),
        }
    }
}

impl Config {
    /// Load configuration from the file named in `args`, with env overrides, then validate.
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            // CALLINTEL_CONFIG names the file itself, it is not a config key
            .merge(Env::prefixed("CALLINTEL_").ignore(&["config"]).split("__"))
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.aggregation.max_records == 0 {
            return Err(Error::Internal {
                operation: "Config validation: aggregation.max_records must be at least 1".to_string(),
            });
        }

        if self.aggregation.lookup_concurrency == 0 {
            return Err(Error::Internal {
                operation: "Config validation: aggregation.lookup_concurrency must be at least 1".to_string(),
            });
        }

        if self.search.enrichment_concurrency == 0 {
            return Err(Error::Internal {
                operation: "Config validation: search.enrichment_concurrency must be at least 1".to_string(),
            });
        }

        if self.search.over_fetch_limit == 0 {
            return Err(Error::Internal {
                operation: "Config validation: search.over_fetch_limit must be at least 1".to_string(),
            });
        }

        if self.search.default_limit == 0 || self.search.default_limit > self.search.over_fetch_limit {
            return Err(Error::Internal {
                operation: format!(
                    "Config validation: search.default_limit ({}) must be between 1 and search.over_fetch_limit ({})",
                    self.search.default_limit, self.search.over_fetch_limit
                ),
            });
        }

        if self.completion.model.trim().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: completion.model cannot be empty".to_string(),
            });
        }

        if self.cors.allowed_origins.is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: CORS allowed_origins cannot be empty. Add at least one allowed origin.".to_string(),
            });
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args(path: &str) -> Args {
        Args {
            config: path.to_string(),
            validate: false,
        }
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "")?;

            let config = Config::load(&args("test.yaml"))?;
            assert_eq!(config.port, 3001);
            assert_eq!(config.search.over_fetch_limit, 1000);
            assert_eq!(config.search.default_limit, 10);
            assert_eq!(config.search.enrichment_concurrency, 8);
            assert_eq!(config.aggregation.max_records, 50);
            assert!(matches!(config.store, StoreConfig::Memory));
            assert!(matches!(config.cors.allowed_origins[..], [CorsOrigin::Wildcard]));
            Ok(())
        });
    }

    #[test]
    fn test_sync_store_and_durations() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
intelligence:
  account_sid: AC123
  service_sid: GA456
  request_timeout: 5s
store:
  type: sync
  base_url: https://sync.example.com/v1
  service_sid: IS789
  account_sid: AC123
completion:
  model: gpt-4o
  request_timeout: 2m
filter_context:
  ttl: 30s
"#,
            )?;

            let config = Config::load(&args("test.yaml"))?;
            assert_eq!(config.intelligence.account_sid, "AC123");
            assert_eq!(config.intelligence.request_timeout, Duration::from_secs(5));
            assert_eq!(config.completion.request_timeout, Duration::from_secs(120));
            assert_eq!(config.filter_context.ttl, Duration::from_secs(30));
            match config.store {
                StoreConfig::Sync {
                    base_url,
                    service_sid,
                    request_timeout,
                    ..
                } => {
                    assert_eq!(base_url.as_str(), "https://sync.example.com/v1");
                    assert_eq!(service_sid, "IS789");
                    assert_eq!(request_timeout, Duration::from_secs(15));
                }
                StoreConfig::Memory => panic!("expected sync store"),
            }
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_yaml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
port: 4000
completion:
  model: gpt-4o
"#,
            )?;
            jail.set_env("CALLINTEL_PORT", "5000");
            jail.set_env("CALLINTEL_COMPLETION__API_KEY", "sk-test");

            let config = Config::load(&args("test.yaml"))?;
            assert_eq!(config.port, 5000);
            assert_eq!(config.completion.model, "gpt-4o");
            assert_eq!(config.completion.api_key.as_deref(), Some("sk-test"));
            Ok(())
        });
    }

    #[test]
    fn test_specific_cors_origin() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
cors:
  allowed_origins:
    - https://dashboard.example.com
"#,
            )?;

            let config = Config::load(&args("test.yaml"))?;
            match &config.cors.allowed_origins[..] {
                [CorsOrigin::Url(url)] => assert_eq!(url.as_str(), "https://dashboard.example.com/"),
                other => panic!("unexpected origins: {other:?}"),
            }
            Ok(())
        });
    }

    #[test]
    fn test_unknown_field_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "not_a_field: true\n")?;
            assert!(Config::load(&args("test.yaml")).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_validation_rejects_bad_limits() {
        let mut config = Config::default();
        config.aggregation.max_records = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.search.default_limit = 2000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.search.enrichment_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cors.allowed_origins.clear();
        assert!(config.validate().is_err());

        assert!(Config::default().validate().is_ok());
    }
}
