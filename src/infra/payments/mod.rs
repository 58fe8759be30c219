//! Payment gateway clients and the traits the payment service talks to.

pub mod mobile_money;
pub mod paypal;

pub use mobile_money::MobileMoneyClient;
pub use paypal::{PaypalClient, PaypalWebhook};

use crate::domain::money::Money;
use crate::domain::payment::RemoteStatus;
use crate::error::Result;
use async_trait::async_trait;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

/// What a gateway says about one payment.
#[derive(Debug, Clone)]
pub struct RemoteReport {
    pub status: RemoteStatus,
    /// Gateway-side transaction id (mobile money financial id, PayPal capture id).
    pub provider_transaction_id: Option<String>,
    pub amount: Option<Money>,
    pub reason: Option<String>,
    /// Our payment id echoed back (`externalId` / `custom_id`).
    pub external_id: Option<String>,
}

impl RemoteReport {
    pub fn external_payment_id(&self) -> Option<Uuid> {
        self.external_id
            .as_deref()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
    }
}

#[derive(Debug, Clone)]
pub struct RequestToPay {
    /// `X-Reference-Id`; becomes the payment's provider reference.
    pub reference: String,
    pub amount: Money,
    pub payer_msisdn: String,
    pub external_id: String,
    pub payer_message: String,
    pub payee_note: String,
}

#[derive(Debug, Clone)]
pub struct CreatedOrder {
    pub order_id: String,
    pub approval_url: Option<String>,
}

/// PayPal webhook transmission headers needed for verification.
#[derive(Debug, Clone, Default)]
pub struct PaypalWebhookHeaders {
    pub auth_algo: String,
    pub cert_url: String,
    pub transmission_id: String,
    pub transmission_sig: String,
    pub transmission_time: String,
}

#[async_trait]
pub trait MobileMoneyGateway: Send + Sync {
    async fn request_to_pay(&self, request: &RequestToPay) -> Result<()>;
    async fn request_status(&self, reference: &str) -> Result<RemoteReport>;
    /// Shared secret for callback signatures, if callbacks are signed.
    fn webhook_secret(&self) -> Option<&str>;
    async fn health(&self) -> Result<()>;
}

#[async_trait]
pub trait PaypalGateway: Send + Sync {
    async fn create_order(
        &self,
        payment_id: Uuid,
        amount: &Money,
        description: &str,
    ) -> Result<CreatedOrder>;
    async fn capture_order(&self, order_id: &str) -> Result<RemoteReport>;
    async fn get_order(&self, order_id: &str) -> Result<RemoteReport>;
    /// `Ok(true)` when verification is disabled or PayPal accepts the signature.
    async fn verify_webhook(
        &self,
        headers: &PaypalWebhookHeaders,
        event: &serde_json::Value,
    ) -> Result<bool>;
    async fn health(&self) -> Result<()>;
}

/// OAuth access token cached until shortly before it expires.
pub(crate) struct TokenCache {
    slot: Mutex<Option<(String, Instant)>>,
}

/// Tokens are refreshed this long before the gateway's stated expiry.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

impl TokenCache {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// `fetch` returns `(token, expires_in_seconds)`.
    pub(crate) async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(String, u64)>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some((token, valid_until)) = slot.as_ref() {
            if Instant::now() < *valid_until {
                return Ok(token.clone());
            }
        }
        let (token, expires_in) = fetch().await?;
        let lifetime = Duration::from_secs(expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *slot = Some((token.clone(), Instant::now() + lifetime));
        Ok(token)
    }
}
