//! Gateway callbacks. These carry no user session; they are authenticated by
//! signature instead.

use crate::infra::payments::PaypalWebhookHeaders;
use crate::transport::http::types::{ok, ApiResponse, AppState};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;

pub const MOBILE_MONEY_SIGNATURE_HEADER: &str = "x-signature";

fn header(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[utoipa::path(
    post,
    path = "/webhooks/momo",
    request_body(content = String, description = "Request-to-pay callback body", content_type = "application/json"),
    responses(
        (status = 200, description = "Callback applied", body = ApiResponse),
        (status = 400, description = "Malformed callback", body = ApiResponse),
        (status = 401, description = "Bad signature", body = ApiResponse),
        (status = 404, description = "Unknown payment", body = ApiResponse)
    )
)]
pub async fn mobile_money_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(MOBILE_MONEY_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    ok(state
        .services
        .payments
        .handle_mobile_money_webhook(&body, signature)
        .await)
}

#[utoipa::path(
    post,
    path = "/webhooks/paypal",
    request_body(content = String, description = "PayPal webhook event", content_type = "application/json"),
    responses(
        (status = 200, description = "Event applied or acknowledged", body = ApiResponse),
        (status = 400, description = "Malformed event", body = ApiResponse),
        (status = 401, description = "Verification failed", body = ApiResponse),
        (status = 404, description = "Unknown payment", body = ApiResponse)
    )
)]
pub async fn paypal_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let transmission = PaypalWebhookHeaders {
        auth_algo: header(&headers, "paypal-auth-algo"),
        cert_url: header(&headers, "paypal-cert-url"),
        transmission_id: header(&headers, "paypal-transmission-id"),
        transmission_sig: header(&headers, "paypal-transmission-sig"),
        transmission_time: header(&headers, "paypal-transmission-time"),
    };
    ok(state
        .services
        .payments
        .handle_paypal_webhook(&transmission, &body)
        .await)
}
