//! Session validation against the hosted BaaS auth API.

use crate::error::{AppError, Result};
use crate::infra::config::BaasConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

/// The caller as identified by the BaaS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolves an access token to its user, or `Unauthorized`.
    async fn user_from_token(&self, access_token: &str) -> Result<AuthUser>;

    /// Cheap reachability check used by preflight.
    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct BaasUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

/// Maps a non-2xx answer from the user endpoint to an error.
///
/// A rejected token is the caller's problem; anything else is an outage.
fn status_error(status: StatusCode, body: &str) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthorized,
        s => AppError::gateway("auth", format!("{}: {}", s, body)),
    }
}

pub struct BaasAuthClient {
    http: reqwest::Client,
    config: BaasConfig,
}

impl BaasAuthClient {
    pub fn new(http: reqwest::Client, config: BaasConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl AuthProvider for BaasAuthClient {
    async fn user_from_token(&self, access_token: &str) -> Result<AuthUser> {
        let resp = self
            .http
            .get(format!("{}/auth/v1/user", self.config.url))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }
        let user: BaasUser = resp.json().await?;
        Ok(AuthUser {
            id: user.id,
            email: user.email,
        })
    }

    async fn health(&self) -> Result<()> {
        let resp = self
            .http
            .get(format!("{}/auth/v1/health", self.config.url))
            .header("apikey", &self.config.anon_key)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AppError::gateway(
                "auth",
                format!("health check returned {}", resp.status()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_tokens_are_unauthorized() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            assert!(matches!(
                status_error(status, r#"{"msg":"invalid JWT"}"#),
                AppError::Unauthorized
            ));
        }
    }

    #[test]
    fn other_failures_are_gateway_errors() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::NOT_FOUND,
        ] {
            match status_error(status, "upstream down") {
                AppError::Gateway { provider, message } => {
                    assert_eq!(provider, "auth");
                    assert!(message.starts_with(status.as_str()));
                    assert!(message.ends_with("upstream down"));
                }
                other => panic!("expected a gateway error, got {:?}", other),
            }
        }
    }

    #[test]
    fn user_payload_tolerates_missing_email() {
        let user: BaasUser =
            serde_json::from_str(r#"{"id":"5b8e1d7c-3f0a-4c55-9d5e-6a2b1f0c9e11","aud":"authenticated"}"#)
                .unwrap();
        assert!(user.email.is_none());
    }
}
