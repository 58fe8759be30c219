use crate::app::Services;
use crate::error::{AppError, Result};
use crate::infra::baas::AuthProvider;
use crate::infra::config::BillingConfig;
use crate::infra::media::MediaSigner;
use crate::infra::payments::{MobileMoneyGateway, PaypalGateway};
use crate::storage::Store;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub auth: Arc<dyn AuthProvider>,
    pub services: Arc<Services>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        auth: Arc<dyn AuthProvider>,
        mobile_money: Option<Arc<dyn MobileMoneyGateway>>,
        paypal: Option<Arc<dyn PaypalGateway>>,
        media: Option<Arc<MediaSigner>>,
        billing: BillingConfig,
    ) -> Self {
        let services = Services::new(store.clone(), mobile_money, paypal, media, billing);
        Self {
            store,
            auth,
            services: Arc::new(services),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub data: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1 to 100, default 20.
    pub limit: Option<u32>,
}

/// Wraps a service result in the response envelope.
pub fn respond<T: Serialize>(status: StatusCode, result: Result<T>) -> Response {
    let data = result.and_then(|value| {
        serde_json::to_value(value).map_err(|e| AppError::Internal(e.to_string()))
    });
    match data {
        Ok(data) => (
            status,
            Json(ApiResponse {
                success: true,
                data: Some(data),
                error: None,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn ok<T: Serialize>(result: Result<T>) -> Response {
    respond(StatusCode::OK, result)
}

pub fn created<T: Serialize>(result: Result<T>) -> Response {
    respond(StatusCode::CREATED, result)
}

pub fn json_422(err: JsonRejection, expected: &str) -> (StatusCode, Json<ApiResponse>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ApiResponse {
            success: false,
            data: None,
            error: Some(format!("Invalid JSON body: {} (expected: {})", err, expected)),
        }),
    )
}

pub fn query_400(err: QueryRejection) -> Response {
    AppError::Validation(format!("Invalid query string: {}", err)).into_response()
}
