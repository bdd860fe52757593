//! # rajni-store
//!
//! REST gateway to the external keyed-record service (PostgREST-style API).
//!
//! One storage-shape record per (table, user key), unique on `user_id`.
//! Conflict on upsert resolves by overwrite; "no rows for this key" is a
//! distinct, non-fatal outcome surfaced as `Ok(None)`.

use async_trait::async_trait;
use chrono::Utc;
use rajni_core::{error::RajniError, lenient, traits::KeyedStore};
use serde_json::Value;
use tracing::{debug, warn};

/// Column holding the user key in every table.
const USER_KEY_COLUMN: &str = "user_id";

/// Keyed-record store backed by a hosted REST service.
#[derive(Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl RestStore {
    /// Create from the service URL and access key.
    pub fn new(base_url: String, service_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            service_key,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url.trim_end_matches('/'))
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }
}

/// Build the full upsert body: the coerced record plus the user key and a
/// fresh `updated_at` stamp. `created_at` is never sent — the store's insert
/// default sets it exactly once.
fn upsert_body(user_key: &str, record: Value) -> Value {
    let mut body = match lenient::as_record(Some(&record)) {
        Value::Object(map) => map,
        _ => unreachable!("as_record always yields an object"),
    };
    body.insert(USER_KEY_COLUMN.to_string(), Value::String(user_key.to_string()));
    body.insert(
        "updated_at".to_string(),
        Value::String(Utc::now().to_rfc3339()),
    );
    Value::Object(body)
}

#[async_trait]
impl KeyedStore for RestStore {
    async fn fetch(&self, table: &str, user_key: &str) -> Result<Option<Value>, RajniError> {
        let url = format!(
            "{}?select=*&{}=eq.{}",
            self.table_url(table),
            USER_KEY_COLUMN,
            urlencoding::encode(user_key)
        );
        debug!("store: GET {url}");

        let resp = self
            .authed(self.client.get(&url))
            .send()
            .await
            .map_err(|e| RajniError::Store(format!("record fetch failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RajniError::Store(format!(
                "store returned {status}: {body}"
            )));
        }

        let mut rows: Vec<Value> = resp
            .json()
            .await
            .map_err(|e| RajniError::Store(format!("store response parse failed: {e}")))?;

        // Zero rows for this key: not a failure.
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    async fn upsert(
        &self,
        table: &str,
        user_key: &str,
        record: Value,
    ) -> Result<Value, RajniError> {
        let url = self.table_url(table);
        let body = upsert_body(user_key, record);
        debug!("store: POST {url} key={user_key} (upsert)");

        let resp = self
            .authed(self.client.post(&url))
            .query(&[("on_conflict", USER_KEY_COLUMN)])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&body)
            .send()
            .await
            .map_err(|e| RajniError::Store(format!("record upsert failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(RajniError::Store(format!(
                "store returned {status}: {text}"
            )));
        }

        let mut rows: Vec<Value> = resp.json().await.unwrap_or_default();
        if rows.is_empty() {
            // Store honored the write but returned no representation.
            warn!("store: upsert on {table} returned no rows, echoing sent record");
            Ok(body)
        } else {
            Ok(rows.swap_remove(0))
        }
    }
}
