//! One-shot filter contexts.
//!
//! A chart selection (a set of record ids) is stored under an opaque token that the list view
//! redeems exactly once. Reading a context deletes it; unread contexts expire after the
//! configured TTL.

use moka::future::Cache;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

use crate::api::models::filter_context::{FilterContext, FilterContextCreated};
use crate::config::FilterContextConfig;

#[derive(Debug, Clone)]
struct StoredContext {
    context: FilterContext,
    created_at: Instant,
}

#[derive(Clone)]
pub struct FilterContexts {
    cache: Cache<String, StoredContext>,
    ttl: Duration,
}

impl FilterContexts {
    pub fn new(config: &FilterContextConfig) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(config.ttl)
                .build(),
            ttl: config.ttl,
        }
    }

    pub async fn create(&self, context: FilterContext) -> FilterContextCreated {
        let token = Uuid::new_v4().simple().to_string();
        debug!(label = %context.label, records = context.record_ids.len(), "Created filter context");
        self.cache
            .insert(
                token.clone(),
                StoredContext {
                    context,
                    created_at: Instant::now(),
                },
            )
            .await;

        FilterContextCreated {
            token,
            expires_in_seconds: self.ttl.as_secs(),
        }
    }

    /// Peek-and-delete. `None` if the token is unknown, already used or expired.
    pub async fn take(&self, token: &str) -> Option<FilterContext> {
        let stored = self.cache.remove(token).await?;
        // eviction of expired entries is lazy, so check the age here as well
        (stored.created_at.elapsed() < self.ttl).then_some(stored.context)
    }
}
