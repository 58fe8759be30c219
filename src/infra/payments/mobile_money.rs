//! Mobile money collection API client (request-to-pay).

use super::{MobileMoneyGateway, RemoteReport, RequestToPay, TokenCache};
use crate::domain::money::Money;
use crate::domain::payment::RemoteStatus;
use crate::error::{AppError, Result};
use crate::infra::config::MobileMoneyConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

const PROVIDER: &str = "mobile money";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Payer<'a> {
    party_id_type: &'a str,
    party_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestToPayBody<'a> {
    amount: String,
    currency: &'a str,
    external_id: &'a str,
    payer: Payer<'a>,
    payer_message: &'a str,
    payee_note: &'a str,
}

/// Body of both the status endpoint and the callback.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestToPayResult {
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    pub status: String,
    #[serde(default)]
    pub financial_transaction_id: Option<String>,
    #[serde(default)]
    pub reason: Option<serde_json::Value>,
}

impl RequestToPayResult {
    pub fn into_report(self) -> RemoteReport {
        let amount = match (&self.amount, &self.currency) {
            (Some(a), Some(c)) => Money::parse_decimal(a, c).ok(),
            _ => None,
        };
        // `reason` is a string in callbacks and `{code, message}` in status responses.
        let reason = self.reason.and_then(|r| match r {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Null => None,
            other => other
                .get("message")
                .or_else(|| other.get("code"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .or_else(|| Some(other.to_string())),
        });
        RemoteReport {
            status: RemoteStatus::from_mobile_money(&self.status),
            provider_transaction_id: self.financial_transaction_id,
            amount,
            reason,
            external_id: self.external_id,
        }
    }
}

pub struct MobileMoneyClient {
    http: reqwest::Client,
    config: MobileMoneyConfig,
    token: TokenCache,
}

impl MobileMoneyClient {
    pub fn new(http: reqwest::Client, config: MobileMoneyConfig) -> Self {
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
            .post(format!("{}/collection/token/", self.config.base_url))
            .basic_auth(&self.config.api_user, Some(&self.config.api_key))
            .header("Ocp-Apim-Subscription-Key", &self.config.subscription_key)
            .header(reqwest::header::CONTENT_LENGTH, "0")
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(gateway_error(resp).await);
        }
        let token: TokenResponse = resp.json().await?;
        tracing::debug!(expires_in = token.expires_in, "mobile money token refreshed");
        Ok((token.access_token, token.expires_in))
    }
}

async fn gateway_error(resp: reqwest::Response) -> AppError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    AppError::gateway(PROVIDER, format!("{}: {}", status, body))
}

#[async_trait]
impl MobileMoneyGateway for MobileMoneyClient {
    async fn request_to_pay(&self, request: &RequestToPay) -> Result<()> {
        let token = self.access_token().await?;
        let body = RequestToPayBody {
            amount: request.amount.to_decimal_string(),
            currency: &request.amount.currency,
            external_id: &request.external_id,
            payer: Payer {
                party_id_type: "MSISDN",
                party_id: &request.payer_msisdn,
            },
            payer_message: &request.payer_message,
            payee_note: &request.payee_note,
        };

        let mut builder = self
            .http
            .post(format!("{}/collection/v1_0/requesttopay", self.config.base_url))
            .bearer_auth(token)
            .header("X-Reference-Id", &request.reference)
            .header("X-Target-Environment", &self.config.target_environment)
            .header("Ocp-Apim-Subscription-Key", &self.config.subscription_key)
            .json(&body);
        if let Some(callback) = &self.config.callback_url {
            builder = builder.header("X-Callback-Url", callback);
        }

        let resp = builder.send().await?;
        match resp.status() {
            StatusCode::ACCEPTED | StatusCode::OK => Ok(()),
            _ => Err(gateway_error(resp).await),
        }
    }

    async fn request_status(&self, reference: &str) -> Result<RemoteReport> {
        let token = self.access_token().await?;
        let resp = self
            .http
            .get(format!(
                "{}/collection/v1_0/requesttopay/{}",
                self.config.base_url, reference
            ))
            .bearer_auth(token)
            .header("X-Target-Environment", &self.config.target_environment)
            .header("Ocp-Apim-Subscription-Key", &self.config.subscription_key)
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!(
                "mobile money request {}",
                reference
            )));
        }
        if !resp.status().is_success() {
            return Err(gateway_error(resp).await);
        }
        let result: RequestToPayResult = resp.json().await?;
        Ok(result.into_report())
    }

    fn webhook_secret(&self) -> Option<&str> {
        self.config.webhook_secret.as_deref()
    }

    async fn health(&self) -> Result<()> {
        self.access_token().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_successful_status_response() {
        let raw = r#"{
            "amount": "5000",
            "currency": "UGX",
            "financialTransactionId": "363440463",
            "externalId": "d5f2c9a4-3f61-4c9e-9d0b-0c2a1c0f2e11",
            "payer": {"partyIdType": "MSISDN", "partyId": "256774290781"},
            "status": "SUCCESSFUL"
        }"#;
        let result: RequestToPayResult = serde_json::from_str(raw).unwrap();
        let report = result.into_report();
        assert_eq!(report.status, RemoteStatus::Completed);
        assert_eq!(report.provider_transaction_id.as_deref(), Some("363440463"));
        assert_eq!(report.amount.as_ref().unwrap().minor, 5000);
        assert!(report.external_payment_id().is_some());
    }

    #[test]
    fn failed_status_carries_reason() {
        let raw = r#"{"status": "FAILED", "reason": {"code": "PAYER_NOT_FOUND", "message": "Payer not found"}}"#;
        let result: RequestToPayResult = serde_json::from_str(raw).unwrap();
        let report = result.into_report();
        assert_eq!(report.status, RemoteStatus::Failed);
        assert_eq!(report.reason.as_deref(), Some("Payer not found"));

        let callback = r#"{"referenceId": "r1", "status": "REJECTED", "reason": "APPROVAL_REJECTED"}"#;
        let report = serde_json::from_str::<RequestToPayResult>(callback)
            .unwrap()
            .into_report();
        assert_eq!(report.status, RemoteStatus::Failed);
        assert_eq!(report.reason.as_deref(), Some("APPROVAL_REJECTED"));
    }

    #[test]
    fn request_body_uses_gateway_field_names() {
        let body = RequestToPayBody {
            amount: "5000".to_string(),
            currency: "UGX",
            external_id: "p1",
            payer: Payer {
                party_id_type: "MSISDN",
                party_id: "256700000000",
            },
            payer_message: "Donation",
            payee_note: "Thanks",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["externalId"], "p1");
        assert_eq!(json["payer"]["partyIdType"], "MSISDN");
        assert_eq!(json["payeeNote"], "Thanks");
    }
}
