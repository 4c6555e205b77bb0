//! [`AnalysisStore`] backed by a remote sync-map service.
//!
//! Each store namespace is a map (`UniqueName` = namespace) and each analysis kind an item
//! key inside it. Item data is a JSON document; writes are form-encoded with `Data` carrying the
//! serialized JSON.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::{AnalysisStore, StoreKey};
use crate::upstream::{UpstreamError, http_client, join_segments, read_json};
use crate::types::AnalysisKind;

pub struct SyncMapStore {
    client: Client,
    maps_url: Url,
    account_sid: String,
    auth_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MapItem {
    data: Value,
}

impl SyncMapStore {
    pub fn new(
        base_url: &Url,
        service_sid: &str,
        account_sid: &str,
        auth_token: Option<String>,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(request_timeout)?,
            maps_url: join_segments(base_url, ["Services", service_sid, "Maps"])?,
            account_sid: account_sid.to_string(),
            auth_token,
        })
    }

    fn map_url(&self, namespace: &str) -> Result<Url, UpstreamError> {
        join_segments(&self.maps_url, [namespace])
    }

    fn items_url(&self, namespace: &str) -> Result<Url, UpstreamError> {
        join_segments(&self.maps_url, [namespace, "Items"])
    }

    fn item_url(&self, namespace: &str, kind: AnalysisKind) -> Result<Url, UpstreamError> {
        join_segments(&self.maps_url, [namespace, "Items", kind.as_str()])
    }

    /// GET returning `false` on 404.
    async fn exists(&self, url: Url) -> Result<bool, UpstreamError> {
        let response = self
            .client
            .get(url)
            .basic_auth(&self.account_sid, self.auth_token.as_ref())
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(UpstreamError::Status {
                status,
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn post_form(&self, url: Url, form: &[(&str, &str)]) -> Result<StatusCode, UpstreamError> {
        let response = self
            .client
            .post(url)
            .basic_auth(&self.account_sid, self.auth_token.as_ref())
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::CONFLICT {
            return Ok(status);
        }
        Err(UpstreamError::Status {
            status,
            body: response.text().await.unwrap_or_default(),
        })
    }

    async fn ensure_map(&self, namespace: &str) -> Result<(), UpstreamError> {
        if self.exists(self.map_url(namespace)?).await? {
            return Ok(());
        }

        // 409 means another writer created it first
        let status = self.post_form(self.maps_url.clone(), &[("UniqueName", namespace)]).await?;
        debug!(namespace, %status, "Created sync map");
        Ok(())
    }
}

#[async_trait]
impl AnalysisStore for SyncMapStore {
    #[instrument(skip(self), fields(namespace = %key), err)]
    async fn get(&self, key: &StoreKey, kind: AnalysisKind) -> anyhow::Result<Option<Value>> {
        let response = self
            .client
            .get(self.item_url(&key.namespace(), kind)?)
            .basic_auth(&self.account_sid, self.auth_token.as_ref())
            .send()
            .await?;

        // missing map and missing item both come back as 404
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let item: MapItem = read_json(response).await?;
        Ok(Some(item.data))
    }

    #[instrument(skip(self, payload), fields(namespace = %key), err)]
    async fn upsert(&self, key: &StoreKey, kind: AnalysisKind, payload: Value) -> anyhow::Result<()> {
        let namespace = key.namespace();
        let data = serde_json::to_string(&payload)?;

        self.ensure_map(&namespace).await?;

        if self.exists(self.item_url(&namespace, kind)?).await? {
            self.post_form(self.item_url(&namespace, kind)?, &[("Data", data.as_str())])
                .await?;
            debug!(%kind, "Updated sync map item");
            return Ok(());
        }

        let status = self
            .post_form(self.items_url(&namespace)?, &[("Key", kind.as_str()), ("Data", data.as_str())])
            .await?;
        if status == StatusCode::CONFLICT {
            // created concurrently between the check and the create; overwrite it
            self.post_form(self.item_url(&namespace, kind)?, &[("Data", data.as_str())])
                .await?;
        }
        debug!(%kind, "Created sync map item");
        Ok(())
    }
}
