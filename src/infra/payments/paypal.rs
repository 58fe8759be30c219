//! PayPal REST client (Orders v2, webhook signature verification).

use super::{CreatedOrder, PaypalGateway, PaypalWebhookHeaders, RemoteReport, TokenCache};
use crate::domain::money::Money;
use crate::domain::payment::RemoteStatus;
use crate::error::{AppError, Result};
use crate::infra::config::PaypalConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

const PROVIDER: &str = "paypal";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
    rel: String,
}

#[derive(Debug, Deserialize)]
struct Amount {
    currency_code: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct Capture {
    id: String,
    status: String,
    #[serde(default)]
    amount: Option<Amount>,
}

#[derive(Debug, Default, Deserialize)]
struct Payments {
    #[serde(default)]
    captures: Vec<Capture>,
}

#[derive(Debug, Deserialize)]
struct PurchaseUnit {
    #[serde(default)]
    custom_id: Option<String>,
    #[serde(default)]
    amount: Option<Amount>,
    #[serde(default)]
    payments: Option<Payments>,
}

/// The subset of an order (create/get/capture responses share this shape).
#[derive(Debug, Deserialize)]
pub struct Order {
    id: String,
    status: String,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
    #[serde(default)]
    links: Vec<Link>,
}

impl Order {
    fn approval_url(&self) -> Option<String> {
        self.links
            .iter()
            .find(|l| l.rel == "approve" || l.rel == "payer-action")
            .map(|l| l.href.clone())
    }

    /// Collapses an order into a report. Once captured, the capture's status wins.
    fn into_report(self) -> RemoteReport {
        let unit = self.purchase_units.into_iter().next();
        let external_id = unit.as_ref().and_then(|u| u.custom_id.clone());
        let capture = unit
            .as_ref()
            .and_then(|u| u.payments.as_ref())
            .and_then(|p| p.captures.first());

        let status = match capture {
            Some(c) => RemoteStatus::from_paypal_capture(&c.status),
            None => RemoteStatus::from_paypal_order(&self.status),
        };
        let amount = capture
            .and_then(|c| c.amount.as_ref())
            .or_else(|| unit.as_ref().and_then(|u| u.amount.as_ref()))
            .and_then(|a| Money::parse_decimal(&a.value, &a.currency_code).ok());
        let reason = match status {
            RemoteStatus::Failed => Some(format!(
                "order {} is {}",
                self.id,
                capture.map(|c| c.status.as_str()).unwrap_or(self.status.as_str())
            )),
            _ => None,
        };

        RemoteReport {
            status,
            provider_transaction_id: capture.map(|c| c.id.clone()),
            amount,
            reason,
            external_id,
        }
    }
}

/// A webhook event, reduced to what settlement needs.
#[derive(Debug)]
pub enum PaypalWebhook {
    /// `PAYMENT.CAPTURE.COMPLETED` / `DENIED` / `PENDING`.
    Capture {
        order_id: Option<String>,
        report: RemoteReport,
    },
    CaptureRefunded { capture_id: String },
    /// Buyer approved; the order still has to be captured.
    OrderApproved {
        order_id: String,
        custom_id: Option<String>,
    },
    Other(String),
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    event_type: String,
    #[serde(default)]
    resource: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RelatedIds {
    #[serde(default)]
    order_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SupplementaryData {
    #[serde(default)]
    related_ids: Option<RelatedIds>,
}

#[derive(Debug, Deserialize)]
struct CaptureResource {
    id: String,
    status: String,
    #[serde(default)]
    custom_id: Option<String>,
    #[serde(default)]
    amount: Option<Amount>,
    #[serde(default)]
    supplementary_data: Option<SupplementaryData>,
    #[serde(default)]
    status_details: Option<serde_json::Value>,
}

pub fn parse_webhook(event: &serde_json::Value) -> Result<PaypalWebhook> {
    let envelope: WebhookEnvelope = serde_json::from_value(event.clone())
        .map_err(|e| AppError::Validation(format!("malformed paypal event: {}", e)))?;
    let malformed =
        |e: serde_json::Error| AppError::Validation(format!("malformed {} resource: {}", envelope.event_type, e));

    match envelope.event_type.as_str() {
        "PAYMENT.CAPTURE.COMPLETED" | "PAYMENT.CAPTURE.DENIED" | "PAYMENT.CAPTURE.PENDING" => {
            let capture: CaptureResource =
                serde_json::from_value(envelope.resource.clone()).map_err(malformed)?;
            let status = RemoteStatus::from_paypal_capture(&capture.status);
            let reason = match status {
                RemoteStatus::Failed => Some(
                    capture
                        .status_details
                        .as_ref()
                        .and_then(|d| d.get("reason"))
                        .and_then(|r| r.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("capture {} is {}", capture.id, capture.status)),
                ),
                _ => None,
            };
            let order_id = capture
                .supplementary_data
                .and_then(|d| d.related_ids)
                .and_then(|r| r.order_id);
            Ok(PaypalWebhook::Capture {
                order_id,
                report: RemoteReport {
                    status,
                    provider_transaction_id: Some(capture.id),
                    amount: capture
                        .amount
                        .and_then(|a| Money::parse_decimal(&a.value, &a.currency_code).ok()),
                    reason,
                    external_id: capture.custom_id,
                },
            })
        }
        "PAYMENT.CAPTURE.REFUNDED" => {
            let capture_id = envelope
                .resource
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            Ok(PaypalWebhook::CaptureRefunded { capture_id })
        }
        "CHECKOUT.ORDER.APPROVED" => {
            let order: Order =
                serde_json::from_value(envelope.resource.clone()).map_err(malformed)?;
            let custom_id = order
                .purchase_units
                .into_iter()
                .next()
                .and_then(|u| u.custom_id);
            Ok(PaypalWebhook::OrderApproved {
                order_id: order.id,
                custom_id,
            })
        }
        _ => Ok(PaypalWebhook::Other(envelope.event_type.clone())),
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    issue: String,
}

impl ErrorBody {
    fn has_issue(&self, issue: &str) -> bool {
        self.details.iter().any(|d| d.issue == issue)
    }
}

pub struct PaypalClient {
    http: reqwest::Client,
    config: PaypalConfig,
    token: TokenCache,
}

impl PaypalClient {
    pub fn new(http: reqwest::Client, config: PaypalConfig) -> Self {
        Self {
            http,
            config,
            token: TokenCache::new(),
        }
    }

    async fn access_token(&self) -> Result<String> {
        self.token.get_or_fetch(|| self.fetch_token()).await
    }

    async fn fetch_token(&self) -> Result<(String, u64)> {
        let resp = self
            .http
            .post(format!("{}/v1/oauth2/token", self.config.base_url))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(error_from(resp).await);
        }
        let token: TokenResponse = resp.json().await?;
        tracing::debug!(expires_in = token.expires_in, "paypal token refreshed");
        Ok((token.access_token, token.expires_in))
    }
}

async fn error_from(resp: reqwest::Response) -> AppError {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => {
            let issues: Vec<&str> = body.details.iter().map(|d| d.issue.as_str()).collect();
            match (body.name, body.message) {
                (Some(name), _) if !issues.is_empty() => {
                    format!("{} ({})", name, issues.join(", "))
                }
                (Some(name), Some(msg)) => format!("{}: {}", name, msg),
                (_, Some(msg)) => msg,
                _ => format!("{}: {}", status, text),
            }
        }
        Err(_) => format!("{}: {}", status, text),
    };
    AppError::gateway(PROVIDER, message)
}

#[async_trait]
impl PaypalGateway for PaypalClient {
    async fn create_order(
        &self,
        payment_id: Uuid,
        amount: &Money,
        description: &str,
    ) -> Result<CreatedOrder> {
        let token = self.access_token().await?;
        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": payment_id.to_string(),
                "custom_id": payment_id.to_string(),
                "description": description,
                "amount": {
                    "currency_code": amount.currency,
                    "value": amount.to_decimal_string(),
                }
            }],
            "application_context": {
                "return_url": self.config.return_url,
                "cancel_url": self.config.cancel_url,
                "user_action": "PAY_NOW",
                "shipping_preference": "NO_SHIPPING",
            }
        });
        let resp = self
            .http
            .post(format!("{}/v2/checkout/orders", self.config.base_url))
            .bearer_auth(token)
            .header("PayPal-Request-Id", payment_id.to_string())
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(error_from(resp).await);
        }
        let order: Order = resp.json().await?;
        Ok(CreatedOrder {
            approval_url: order.approval_url(),
            order_id: order.id,
        })
    }

    async fn capture_order(&self, order_id: &str) -> Result<RemoteReport> {
        let token = self.access_token().await?;
        let resp = self
            .http
            .post(format!(
                "{}/v2/checkout/orders/{}/capture",
                self.config.base_url, order_id
            ))
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body("{}")
            .send()
            .await?;

        if resp.status() == StatusCode::UNPROCESSABLE_ENTITY {
            let text = resp.text().await.unwrap_or_default();
            let already_captured = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.has_issue("ORDER_ALREADY_CAPTURED"))
                .unwrap_or(false);
            if already_captured {
                tracing::info!(order_id, "order already captured, reading current state");
                return self.get_order(order_id).await;
            }
            return Err(AppError::gateway(PROVIDER, text));
        }
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("paypal order {}", order_id)));
        }
        if !resp.status().is_success() {
            return Err(error_from(resp).await);
        }
        let order: Order = resp.json().await?;
        Ok(order.into_report())
    }

    async fn get_order(&self, order_id: &str) -> Result<RemoteReport> {
        let token = self.access_token().await?;
        let resp = self
            .http
            .get(format!(
                "{}/v2/checkout/orders/{}",
                self.config.base_url, order_id
            ))
            .bearer_auth(token)
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("paypal order {}", order_id)));
        }
        if !resp.status().is_success() {
            return Err(error_from(resp).await);
        }
        let order: Order = resp.json().await?;
        Ok(order.into_report())
    }

    async fn verify_webhook(
        &self,
        headers: &PaypalWebhookHeaders,
        event: &serde_json::Value,
    ) -> Result<bool> {
        let Some(webhook_id) = self.config.webhook_id.as_deref() else {
            tracing::warn!("PAYPAL_WEBHOOK_ID not set; accepting webhook without verification");
            return Ok(true);
        };
        let token = self.access_token().await?;
        let body = json!({
            "auth_algo": headers.auth_algo,
            "cert_url": headers.cert_url,
            "transmission_id": headers.transmission_id,
            "transmission_sig": headers.transmission_sig,
            "transmission_time": headers.transmission_time,
            "webhook_id": webhook_id,
            "webhook_event": event,
        });
        let resp = self
            .http
            .post(format!(
                "{}/v1/notifications/verify-webhook-signature",
                self.config.base_url
            ))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(error_from(resp).await);
        }
        let result: serde_json::Value = resp.json().await?;
        Ok(result.get("verification_status").and_then(|v| v.as_str()) == Some("SUCCESS"))
    }

    async fn health(&self) -> Result<()> {
        self.access_token().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_order_exposes_approval_link() {
        let raw = r#"{
            "id": "5O190127TN364715T",
            "status": "CREATED",
            "links": [
                {"href": "https://api-m.paypal.com/v2/checkout/orders/5O190127TN364715T", "rel": "self", "method": "GET"},
                {"href": "https://www.paypal.com/checkoutnow?token=5O190127TN364715T", "rel": "approve", "method": "GET"}
            ]
        }"#;
        let order: Order = serde_json::from_str(raw).unwrap();
        assert_eq!(
            order.approval_url().as_deref(),
            Some("https://www.paypal.com/checkoutnow?token=5O190127TN364715T")
        );
        let report = order.into_report();
        assert_eq!(report.status, RemoteStatus::Pending);
        assert!(report.provider_transaction_id.is_none());
    }

    #[test]
    fn captured_order_reports_capture() {
        let raw = r#"{
            "id": "5O190127TN364715T",
            "status": "COMPLETED",
            "purchase_units": [{
                "reference_id": "d9f80740-38f0-11e8-b467-0ed5f89f718b",
                "custom_id": "d9f80740-38f0-11e8-b467-0ed5f89f718b",
                "payments": {"captures": [{
                    "id": "3C679366HH908993F",
                    "status": "COMPLETED",
                    "amount": {"currency_code": "USD", "value": "4.99"}
                }]}
            }]
        }"#;
        let order: Order = serde_json::from_str(raw).unwrap();
        let report = order.into_report();
        assert_eq!(report.status, RemoteStatus::Completed);
        assert_eq!(report.provider_transaction_id.as_deref(), Some("3C679366HH908993F"));
        assert_eq!(report.amount.as_ref().unwrap().minor, 499);
        assert!(report.external_payment_id().is_some());
    }

    #[test]
    fn declined_capture_fails_even_if_order_completed() {
        let raw = r#"{
            "id": "ORDER1",
            "status": "COMPLETED",
            "purchase_units": [{"payments": {"captures": [{"id": "CAP1", "status": "DECLINED"}]}}]
        }"#;
        let report = serde_json::from_str::<Order>(raw).unwrap().into_report();
        assert_eq!(report.status, RemoteStatus::Failed);
        assert_eq!(report.reason.as_deref(), Some("order ORDER1 is DECLINED"));
    }

    #[test]
    fn error_body_detects_already_captured() {
        let raw = r#"{"name": "UNPROCESSABLE_ENTITY", "details": [{"issue": "ORDER_ALREADY_CAPTURED"}]}"#;
        let body: ErrorBody = serde_json::from_str(raw).unwrap();
        assert!(body.has_issue("ORDER_ALREADY_CAPTURED"));
    }

    #[test]
    fn capture_completed_event_links_order() {
        let event = json!({
            "id": "WH-1",
            "event_type": "PAYMENT.CAPTURE.COMPLETED",
            "resource": {
                "id": "CAP1",
                "status": "COMPLETED",
                "custom_id": "d9f80740-38f0-11e8-b467-0ed5f89f718b",
                "amount": {"currency_code": "USD", "value": "10.00"},
                "supplementary_data": {"related_ids": {"order_id": "ORDER1"}}
            }
        });
        match parse_webhook(&event).unwrap() {
            PaypalWebhook::Capture { order_id, report } => {
                assert_eq!(order_id.as_deref(), Some("ORDER1"));
                assert_eq!(report.status, RemoteStatus::Completed);
                assert_eq!(report.amount.as_ref().unwrap().minor, 1000);
                assert!(report.external_payment_id().is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn denied_capture_carries_reason() {
        let event = json!({
            "event_type": "PAYMENT.CAPTURE.DENIED",
            "resource": {"id": "CAP2", "status": "DECLINED"}
        });
        match parse_webhook(&event).unwrap() {
            PaypalWebhook::Capture { order_id, report } => {
                assert!(order_id.is_none());
                assert_eq!(report.status, RemoteStatus::Failed);
                assert_eq!(report.reason.as_deref(), Some("capture CAP2 is DECLINED"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn approved_order_and_unknown_events() {
        let approved = json!({
            "event_type": "CHECKOUT.ORDER.APPROVED",
            "resource": {"id": "ORDER9", "status": "APPROVED", "purchase_units": [{"custom_id": "abc"}]}
        });
        assert!(matches!(
            parse_webhook(&approved).unwrap(),
            PaypalWebhook::OrderApproved { ref order_id, .. } if order_id == "ORDER9"
        ));

        let other = json!({"event_type": "BILLING.PLAN.CREATED", "resource": {}});
        assert!(matches!(parse_webhook(&other).unwrap(), PaypalWebhook::Other(_)));

        assert!(parse_webhook(&json!({"resource": {}})).is_err());
    }
}
