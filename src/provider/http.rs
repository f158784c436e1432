//! HTTP implementation of the SMM provider gateway.
//!
//! Speaks the de-facto standard SMM panel API dialect: every call is a POST
//! of a JSON body `{"key": ..., "action": ..., ...}` to a single endpoint.
//! An `"error"` field in the response body is a provider-side failure even
//! when the HTTP status is 200.
//!
//! Providers are sloppy about number formatting and return order ids and
//! counts as either JSON numbers or strings, so the response is parsed
//! leniently from `serde_json::Value`.

use super::{OrderStatusInfo, ProviderError, ProviderService, SmmProvider};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

/// Default per-request timeout for provider calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Reqwest-backed provider client.
pub struct HttpProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl HttpProvider {
    /// Creates a client for the given endpoint and API key.
    ///
    /// # Errors
    /// Returns `Unreachable` if the underlying HTTP client cannot be built.
    pub fn new(api_url: String, api_key: String) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Unreachable(e.to_string()))?;

        Ok(Self {
            client,
            api_url,
            api_key,
        })
    }

    /// Sends one API request and returns the parsed response body.
    async fn request(&self, mut params: Value) -> Result<Value, ProviderError> {
        params["key"] = Value::String(self.api_key.clone());

        let response = self
            .client
            .post(&self.api_url)
            .json(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::Unreachable(e.to_string())
                }
            })?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Api(format!("invalid response body: {e}")))?;

        if let Some(error) = body.get("error").and_then(Value::as_str) {
            return Err(ProviderError::Api(error.to_string()));
        }

        Ok(body)
    }
}

/// Reads a field the provider may encode as a number or a string.
fn lenient_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Same leniency for identifiers, normalized to a string.
fn lenient_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Rates and balances arrive as numbers or as strings like `"12.34"`.
fn lenient_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl SmmProvider for HttpProvider {
    async fn create_order(
        &self,
        provider_service_id: &str,
        link: &str,
        quantity: i64,
    ) -> Result<String, ProviderError> {
        let body = self
            .request(json!({
                "action": "add",
                "service": provider_service_id,
                "link": link,
                "quantity": quantity,
            }))
            .await?;

        lenient_string(body.get("order"))
            .ok_or_else(|| ProviderError::Api("response missing order id".to_string()))
    }

    async fn order_status(
        &self,
        provider_order_id: &str,
    ) -> Result<OrderStatusInfo, ProviderError> {
        let body = self
            .request(json!({
                "action": "status",
                "order": provider_order_id,
            }))
            .await?;

        let status = body
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::Api("response missing status".to_string()))?
            .to_string();

        Ok(OrderStatusInfo {
            status,
            start_count: lenient_i64(body.get("start_count")),
            remains: lenient_i64(body.get("remains")),
        })
    }

    async fn cancel_order(&self, provider_order_id: &str) -> Result<(), ProviderError> {
        self.request(json!({
            "action": "cancel",
            "order": provider_order_id,
        }))
        .await
        .map(|_| ())
    }

    async fn refill_order(&self, provider_order_id: &str) -> Result<(), ProviderError> {
        self.request(json!({
            "action": "refill",
            "order": provider_order_id,
        }))
        .await
        .map(|_| ())
    }

    async fn list_services(&self) -> Result<Vec<ProviderService>, ProviderError> {
        let body = self.request(json!({"action": "services"})).await?;

        let entries = body
            .as_array()
            .ok_or_else(|| ProviderError::Api("service list is not an array".to_string()))?;

        // Entries with a missing or unparseable id are dropped, not fatal
        Ok(entries
            .iter()
            .filter_map(|entry| {
                Some(ProviderService {
                    service: lenient_string(entry.get("service"))?,
                    name: lenient_string(entry.get("name")).unwrap_or_default(),
                    category: lenient_string(entry.get("category")).unwrap_or_default(),
                    rate: lenient_f64(entry.get("rate")).unwrap_or(0.0),
                    min: lenient_i64(entry.get("min")).unwrap_or(1),
                    max: lenient_i64(entry.get("max")).unwrap_or(i64::MAX),
                })
            })
            .collect())
    }

    async fn balance(&self) -> Result<f64, ProviderError> {
        let body = self.request(json!({"action": "balance"})).await?;

        lenient_f64(body.get("balance"))
            .ok_or_else(|| ProviderError::Api("response missing balance".to_string()))
    }
}
