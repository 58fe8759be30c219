use crate::app::payments::{DonationRequest, SubscribeRequest};
use crate::transport::http::auth::CurrentUser;
use crate::transport::http::types::{created, json_422, ok, ApiResponse, AppState};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/donations",
    security(("bearer" = [])),
    request_body = DonationRequest,
    responses(
        (status = 201, description = "Payment started; poll its status or follow the approval URL", body = ApiResponse),
        (status = 400, description = "Invalid amount, phone number, or gateway refusal", body = ApiResponse),
        (status = 404, description = "No such artist", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse),
        (status = 503, description = "Requested gateway is not configured", body = ApiResponse)
    )
)]
pub async fn donate_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    request: Result<Json<DonationRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => {
            return json_422(
                e,
                r#"{"artist_id": "...", "amount": "5.00", "currency": "USD", "provider": "paypal|mobile_money"}"#,
            )
            .into_response()
        }
    };
    created(
        state
            .services
            .payments
            .initiate_donation(user.id, request)
            .await,
    )
}

#[utoipa::path(
    get,
    path = "/api/payments/{id}/status",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Current payment state, refreshed from the gateway while pending", body = ApiResponse),
        (status = 404, description = "No such payment for the caller", body = ApiResponse)
    )
)]
pub async fn payment_status_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(payment_id): Path<Uuid>,
) -> Response {
    ok(state
        .services
        .payments
        .payment_status(user.id, payment_id)
        .await)
}

#[utoipa::path(
    post,
    path = "/api/payments/paypal/{order_id}/capture",
    security(("bearer" = [])),
    params(("order_id" = String, Path, description = "PayPal order id")),
    responses(
        (status = 200, description = "Order captured and payment reconciled", body = ApiResponse),
        (status = 400, description = "PayPal refused the capture", body = ApiResponse),
        (status = 404, description = "No payment for this order", body = ApiResponse),
        (status = 409, description = "Captured amount does not match the payment", body = ApiResponse)
    )
)]
pub async fn paypal_capture_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<String>,
) -> Response {
    ok(state
        .services
        .payments
        .capture_paypal(user.id, order_id.trim())
        .await)
}

#[utoipa::path(
    get,
    path = "/api/payments/paypal/{order_id}/status",
    security(("bearer" = [])),
    params(("order_id" = String, Path, description = "PayPal order id")),
    responses(
        (status = 200, description = "Payment reconciled with the order", body = ApiResponse),
        (status = 404, description = "No payment for this order", body = ApiResponse)
    )
)]
pub async fn paypal_status_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<String>,
) -> Response {
    ok(state
        .services
        .payments
        .paypal_status(user.id, order_id.trim())
        .await)
}

#[utoipa::path(
    post,
    path = "/api/subscriptions",
    security(("bearer" = [])),
    request_body = SubscribeRequest,
    responses(
        (status = 201, description = "Subscription pending payment", body = ApiResponse),
        (status = 404, description = "No such artist", body = ApiResponse),
        (status = 409, description = "Already subscribed for the current period", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse),
        (status = 503, description = "Requested gateway is not configured", body = ApiResponse)
    )
)]
pub async fn subscribe_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    request: Result<Json<SubscribeRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => {
            return json_422(
                e,
                r#"{"artist_id": "...", "plan": "monthly|yearly", "provider": "paypal|mobile_money"}"#,
            )
            .into_response()
        }
    };
    created(
        state
            .services
            .payments
            .initiate_subscription(user.id, request)
            .await,
    )
}

#[utoipa::path(
    get,
    path = "/api/subscriptions",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller's subscriptions", body = ApiResponse)
    )
)]
pub async fn my_subscriptions_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Response {
    ok(state.services.subscriptions.mine(user.id).await)
}

#[utoipa::path(
    post,
    path = "/api/subscriptions/{id}/cancel",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Subscription id")),
    responses(
        (status = 200, description = "Cancelled; access continues until the period ends", body = ApiResponse),
        (status = 400, description = "Subscription is not active", body = ApiResponse),
        (status = 404, description = "No such subscription for the caller", body = ApiResponse)
    )
)]
pub async fn cancel_subscription_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(subscription_id): Path<Uuid>,
) -> Response {
    ok(state
        .services
        .subscriptions
        .cancel(user.id, subscription_id)
        .await)
}

#[utoipa::path(
    get,
    path = "/api/artists/{id}/subscription",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Artist id")),
    responses(
        (status = 200, description = "Whether the caller is subscribed", body = ApiResponse)
    )
)]
pub async fn artist_subscription_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(artist_id): Path<Uuid>,
) -> Response {
    ok(state.services.subscriptions.check(user.id, artist_id).await)
}

#[utoipa::path(
    get,
    path = "/api/revenue",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Revenue transactions and per-currency totals", body = ApiResponse),
        (status = 403, description = "Caller is not an artist", body = ApiResponse)
    )
)]
pub async fn revenue_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Response {
    ok(state.services.revenue.report(user.id).await)
}
