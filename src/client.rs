use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Client, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::models::event::deserialize_id;
use crate::models::{DerivedTransaction, SplitPatch, TransactionRecord};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The ledger REST API as consumed by the reconciliation engine
///
/// Implementations own transport only; they never retry. Non-2xx responses
/// surface as `RelayError::Api`.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    /// Create a single-split transaction group; returns the new group id
    async fn create_transaction(&self, draft: &DerivedTransaction) -> Result<u64>;

    /// Fetch a transaction group with its splits
    async fn get_transaction(&self, id: u64) -> Result<TransactionRecord>;

    /// Whole-group update: every named journal id has the fields present on
    /// its patch replaced
    async fn update_transaction(
        &self,
        id: u64,
        group_title: Option<&str>,
        splits: &[SplitPatch],
    ) -> Result<()>;
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct CreatedData {
    #[serde(deserialize_with = "deserialize_id")]
    id: u64,
}

/// Bearer-authenticated reqwest client for the ledger service
pub struct HttpLedgerClient {
    api_url: String,
    token: String,
    client: Client,
}

impl HttpLedgerClient {
    pub fn new(config: &RelayConfig) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            api_url: format!("{}/api/v1", config.base_url),
            token: config.token.clone(),
            client,
        })
    }

    fn get(&self, endpoint: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{endpoint}", self.api_url))
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/vnd.api+json")
    }

    fn post(&self, endpoint: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{endpoint}", self.api_url))
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/vnd.api+json")
    }

    fn put(&self, endpoint: &str) -> reqwest::RequestBuilder {
        self.client
            .put(format!("{}{endpoint}", self.api_url))
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/vnd.api+json")
    }
}

/// Map a non-2xx response to an error, logging the offending payload
async fn check(response: Response, payload: Option<&serde_json::Value>) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if let Some(payload) = payload {
        warn!(%status, payload = %payload, "ledger rejected request");
    }
    let body = response.text().await.unwrap_or_default();
    Err(RelayError::Api {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl LedgerApi for HttpLedgerClient {
    async fn create_transaction(&self, draft: &DerivedTransaction) -> Result<u64> {
        let payload = json!({
            "error_if_duplicate_hash": true,
            "apply_rules": false,
            "fire_webhooks": false,
            "group_title": draft.title,
            "transactions": [{
                "type": draft.tx_type,
                "date": Utc::now().to_rfc3339(),
                "amount": draft.amount,
                "description": draft.description,
                "order": 0,
                "currency_code": draft.currency_code,
                "source_id": draft.source_id.to_string(),
                "destination_id": draft.destination_id.to_string(),
                "reconciled": false,
                "notes": draft.notes,
            }],
        });

        let response = self.post("/transactions").json(&payload).send().await?;
        let envelope: Envelope<CreatedData> =
            check(response, Some(&payload)).await?.json().await?;
        debug!(id = envelope.data.id, "transaction created");
        Ok(envelope.data.id)
    }

    async fn get_transaction(&self, id: u64) -> Result<TransactionRecord> {
        debug!(id, "fetching transaction");
        let response = self.get(&format!("/transactions/{id}")).send().await?;
        let envelope: Envelope<TransactionRecord> = check(response, None).await?.json().await?;
        Ok(envelope.data)
    }

    async fn update_transaction(
        &self,
        id: u64,
        group_title: Option<&str>,
        splits: &[SplitPatch],
    ) -> Result<()> {
        debug!(id, "updating transaction");
        let payload = json!({
            "apply_rules": false,
            "fire_webhooks": false,
            "group_title": group_title,
            "transactions": splits,
        });

        let response = self
            .put(&format!("/transactions/{id}"))
            .json(&payload)
            .send()
            .await?;
        check(response, Some(&payload)).await?;
        Ok(())
    }
}
