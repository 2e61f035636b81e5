use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("payment gateway rejected the call ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Order object as returned by the gateway's `POST /orders`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GatewayOrder {
    pub id: String,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError>;

    async fn fetch_payment(&self, payment_id: &str) -> Result<Value, GatewayError>;

    /// `amount` in minor units; `None` refunds in full.
    async fn refund(
        &self,
        payment_id: &str,
        amount: Option<i64>,
        notes: Option<&Value>,
    ) -> Result<Value, GatewayError>;
}

/// REST client for a Razorpay-compatible API using key id/secret basic auth.
pub struct RazorpayClient {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(
        base_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, GatewayError> {
        let resp = request
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "payment gateway call failed");
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        let body = json!({ "amount": amount, "currency": currency, "receipt": receipt });
        let value = self
            .send(self.http.post(format!("{}/orders", self.base_url)).json(&body))
            .await?;
        serde_json::from_value(value.clone()).map_err(|_| GatewayError::Rejected {
            status: 200,
            body: value.to_string(),
        })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<Value, GatewayError> {
        self.send(
            self.http
                .get(format!("{}/payments/{payment_id}", self.base_url)),
        )
        .await
    }

    async fn refund(
        &self,
        payment_id: &str,
        amount: Option<i64>,
        notes: Option<&Value>,
    ) -> Result<Value, GatewayError> {
        let mut body = json!({ "notes": notes.cloned().unwrap_or_else(|| json!({})) });
        if let Some(amount) = amount {
            body["amount"] = Value::from(amount);
        }
        self.send(
            self.http
                .post(format!("{}/payments/{payment_id}/refund", self.base_url))
                .json(&body),
        )
        .await
    }
}
