// src/bin/api_server.rs

use musicstream_api::infra::baas::BaasAuthClient;
use musicstream_api::infra::media::MediaSigner;
use musicstream_api::infra::payments::{
    MobileMoneyClient, MobileMoneyGateway, PaypalClient, PaypalGateway,
};
use musicstream_api::{transport, AppConfig, MemoryStore, PgStore, Store};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Upper bound on any single call to the BaaS or a payment gateway.
const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(20);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("musicstream_api=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    // --- Store ---
    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            tracing::info!(max_connections = config.db_max_connections, "connecting to postgres");
            Arc::new(PgStore::connect(url, config.db_max_connections).await?)
        }
        None => {
            tracing::warn!("DATABASE_URL is not set; using the in-memory store (data is lost on restart)");
            Arc::new(MemoryStore::new())
        }
    };

    // --- Outbound clients ---
    let http = reqwest::Client::builder().timeout(OUTBOUND_TIMEOUT).build()?;
    let auth = Arc::new(BaasAuthClient::new(http.clone(), config.baas.clone()));

    let mobile_money: Option<Arc<dyn MobileMoneyGateway>> = match config.mobile_money.clone() {
        Some(c) => {
            tracing::info!(environment = %c.target_environment, "mobile money enabled");
            Some(Arc::new(MobileMoneyClient::new(http.clone(), c)))
        }
        None => {
            tracing::warn!("mobile money is not configured; those payments will be refused");
            None
        }
    };
    let paypal: Option<Arc<dyn PaypalGateway>> = match config.paypal.clone() {
        Some(c) => {
            if c.webhook_id.is_none() {
                tracing::warn!("PAYPAL_WEBHOOK_ID is not set; PayPal webhooks are accepted unverified");
            }
            Some(Arc::new(PaypalClient::new(http.clone(), c)))
        }
        None => {
            tracing::warn!("PayPal is not configured; those payments will be refused");
            None
        }
    };
    let media = config.cdn.clone().map(|c| Arc::new(MediaSigner::new(c)));
    if media.is_none() {
        tracing::warn!("media CDN is not configured; upload signing is disabled");
    }

    tracing::info!(
        platform_fee_percent = config.billing.fees.platform_percent(),
        "revenue split configured"
    );

    let app_state = transport::http::AppState::new(
        store,
        auth,
        mobile_money,
        paypal,
        media,
        config.billing.clone(),
    );

    // --- API Server Initialization ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = transport::http::create_router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", transport::http::ApiDoc::openapi()))
        .layer(cors);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "API server listening");
    tracing::info!("Swagger UI available at /swagger-ui");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM. In-flight requests drain before `serve` returns.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received terminate signal, shutting down"),
    }
}
