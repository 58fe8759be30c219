//! Shared fixtures: in-memory store, fake gateways and a token-map auth provider.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use musicstream_api::domain::model::{Profile, Role};
use musicstream_api::domain::money::Money;
use musicstream_api::domain::payment::RemoteStatus;
use musicstream_api::error::{AppError, Result};
use musicstream_api::infra::baas::{AuthProvider, AuthUser};
use musicstream_api::infra::config::BillingConfig;
use musicstream_api::infra::payments::{
    CreatedOrder, MobileMoneyGateway, PaypalGateway, PaypalWebhookHeaders, RemoteReport,
    RequestToPay,
};
use musicstream_api::{AppState, MemoryStore, Store};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub fn report(status: RemoteStatus, amount: Option<Money>) -> RemoteReport {
    RemoteReport {
        status,
        provider_transaction_id: Some(format!("txn-{}", Uuid::new_v4().simple())),
        amount,
        reason: match status {
            RemoteStatus::Failed => Some("APPROVAL_REJECTED".to_string()),
            _ => None,
        },
        external_id: None,
    }
}

pub fn usd(minor: i64) -> Money {
    Money::new(minor, "USD").unwrap()
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Default)]
pub struct StaticAuth {
    users: Mutex<HashMap<String, AuthUser>>,
}

impl StaticAuth {
    pub fn register(&self, token: &str, id: Uuid) {
        self.users.lock().unwrap().insert(
            token.to_string(),
            AuthUser {
                id,
                email: Some(format!("{}@example.test", id.simple())),
            },
        );
    }
}

#[async_trait]
impl AuthProvider for StaticAuth {
    async fn user_from_token(&self, access_token: &str) -> Result<AuthUser> {
        self.users
            .lock()
            .unwrap()
            .get(access_token)
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

// =============================================================================
// Mobile money
// =============================================================================

pub struct FakeMobileMoney {
    pub requests: Mutex<Vec<RequestToPay>>,
    pub status: Mutex<RemoteReport>,
    pub status_calls: AtomicUsize,
    pub refuse: AtomicBool,
    pub secret: Option<String>,
}

impl FakeMobileMoney {
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            status: Mutex::new(report(RemoteStatus::Pending, None)),
            status_calls: AtomicUsize::new(0),
            refuse: AtomicBool::new(false),
            secret: secret.map(str::to_string),
        }
    }

    pub fn set_status(&self, report: RemoteReport) {
        *self.status.lock().unwrap() = report;
    }

    pub fn last_request(&self) -> RequestToPay {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl MobileMoneyGateway for FakeMobileMoney {
    async fn request_to_pay(&self, request: &RequestToPay) -> Result<()> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(AppError::gateway("mobile money", "PAYER_NOT_FOUND"));
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn request_status(&self, _reference: &str) -> Result<RemoteReport> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.status.lock().unwrap().clone())
    }

    fn webhook_secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// PayPal
// =============================================================================

pub struct FakePaypal {
    pub orders: Mutex<Vec<(Uuid, String)>>,
    pub capture: Mutex<RemoteReport>,
    pub order: Mutex<RemoteReport>,
    pub captures: AtomicUsize,
    pub accept_webhooks: AtomicBool,
}

impl Default for FakePaypal {
    fn default() -> Self {
        Self {
            orders: Mutex::new(Vec::new()),
            capture: Mutex::new(report(RemoteStatus::Pending, None)),
            order: Mutex::new(report(RemoteStatus::Pending, None)),
            captures: AtomicUsize::new(0),
            accept_webhooks: AtomicBool::new(true),
        }
    }
}

impl FakePaypal {
    pub fn set_capture(&self, report: RemoteReport) {
        *self.capture.lock().unwrap() = report;
    }

    pub fn set_order(&self, report: RemoteReport) {
        *self.order.lock().unwrap() = report;
    }
}

#[async_trait]
impl PaypalGateway for FakePaypal {
    async fn create_order(
        &self,
        payment_id: Uuid,
        _amount: &Money,
        _description: &str,
    ) -> Result<CreatedOrder> {
        let mut orders = self.orders.lock().unwrap();
        let order_id = format!("ORDER-{}", orders.len() + 1);
        orders.push((payment_id, order_id.clone()));
        Ok(CreatedOrder {
            approval_url: Some(format!("https://paypal.test/checkoutnow?token={}", order_id)),
            order_id,
        })
    }

    async fn capture_order(&self, _order_id: &str) -> Result<RemoteReport> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        Ok(self.capture.lock().unwrap().clone())
    }

    async fn get_order(&self, _order_id: &str) -> Result<RemoteReport> {
        Ok(self.order.lock().unwrap().clone())
    }

    async fn verify_webhook(
        &self,
        _headers: &PaypalWebhookHeaders,
        _event: &serde_json::Value,
    ) -> Result<bool> {
        Ok(self.accept_webhooks.load(Ordering::SeqCst))
    }

    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub auth: Arc<StaticAuth>,
    pub momo: Arc<FakeMobileMoney>,
    pub paypal: Arc<FakePaypal>,
    pub state: AppState,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_momo_secret(None)
    }

    pub fn with_momo_secret(secret: Option<&str>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let auth = Arc::new(StaticAuth::default());
        let momo = Arc::new(FakeMobileMoney::new(secret));
        let paypal = Arc::new(FakePaypal::default());
        let state = AppState::new(
            store.clone() as Arc<dyn Store>,
            auth.clone(),
            Some(momo.clone() as Arc<dyn MobileMoneyGateway>),
            Some(paypal.clone() as Arc<dyn PaypalGateway>),
            None,
            BillingConfig::default(),
        );
        Self {
            store,
            auth,
            momo,
            paypal,
            state,
        }
    }

    /// Creates a profile and registers `token-<id>` for it.
    pub async fn user(&self, role: Role, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.store
            .upsert_profile(&Profile {
                id,
                role,
                display_name: name.to_string(),
                bio: None,
                avatar_url: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        self.auth.register(&token(id), id);
        id
    }
}

pub fn token(id: Uuid) -> String {
    format!("token-{}", id.simple())
}
