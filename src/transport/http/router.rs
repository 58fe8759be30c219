use crate::app::catalog::{
    AlbumWithTracks, CreateAlbumRequest, CreateTrackRequest, PlayCount, SignUploadRequest,
};
use crate::app::communities::{
    CommunityView, CreateCommunityRequest, CreateEventRequest, CreatePostRequest, Membership,
};
use crate::app::payments::{
    Checkout, DonationRequest, SubscribeRequest, SubscriptionCheckout, WebhookAck,
};
use crate::app::profiles::{ArtistPage, UpdateProfileRequest};
use crate::app::revenue::RevenueReport;
use crate::app::subscriptions::SubscriptionCheck;
use crate::domain::model::{
    Album, Community, CommunityPost, Event, Payment, Plan, Profile, RevenueSummary,
    RevenueTransaction, Role, Subscription, SubscriptionStatus, Track,
};
use crate::domain::money::Money;
use crate::domain::payment::{PaymentStatus, Provider, Purpose};
use crate::infra::media::{SignedUpload, UploadKind};
use crate::transport::http::handlers::{
    billing, catalog, communities, health, profiles, webhooks,
};
use crate::transport::http::types::{ApiResponse, AppState};
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        profiles::get_me_handler,
        profiles::update_me_handler,
        profiles::get_artist_handler,
        catalog::create_album_handler,
        catalog::get_album_handler,
        catalog::create_track_handler,
        catalog::list_tracks_handler,
        catalog::get_track_handler,
        catalog::delete_track_handler,
        catalog::play_track_handler,
        catalog::sign_upload_handler,
        communities::create_community_handler,
        communities::list_communities_handler,
        communities::get_community_handler,
        communities::join_community_handler,
        communities::leave_community_handler,
        communities::list_posts_handler,
        communities::create_post_handler,
        communities::create_event_handler,
        communities::list_events_handler,
        billing::donate_handler,
        billing::payment_status_handler,
        billing::paypal_capture_handler,
        billing::paypal_status_handler,
        billing::subscribe_handler,
        billing::my_subscriptions_handler,
        billing::cancel_subscription_handler,
        billing::artist_subscription_handler,
        billing::revenue_handler,
        webhooks::mobile_money_webhook_handler,
        webhooks::paypal_webhook_handler
    ),
    components(schemas(
        ApiResponse,
        UpdateProfileRequest,
        ArtistPage,
        Profile,
        Role,
        CreateAlbumRequest,
        AlbumWithTracks,
        Album,
        CreateTrackRequest,
        Track,
        PlayCount,
        SignUploadRequest,
        UploadKind,
        SignedUpload,
        CreateCommunityRequest,
        CommunityView,
        Community,
        Membership,
        CreatePostRequest,
        CommunityPost,
        CreateEventRequest,
        Event,
        DonationRequest,
        SubscribeRequest,
        Checkout,
        SubscriptionCheckout,
        Payment,
        PaymentStatus,
        Provider,
        Purpose,
        Money,
        Plan,
        Subscription,
        SubscriptionStatus,
        SubscriptionCheck,
        RevenueReport,
        RevenueSummary,
        RevenueTransaction,
        WebhookAck
    )),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route(
            "/api/me",
            get(profiles::get_me_handler).put(profiles::update_me_handler),
        )
        .route("/api/artists/:id", get(profiles::get_artist_handler))
        .route(
            "/api/artists/:id/subscription",
            get(billing::artist_subscription_handler),
        )
        .route("/api/albums", post(catalog::create_album_handler))
        .route("/api/albums/:id", get(catalog::get_album_handler))
        .route(
            "/api/tracks",
            get(catalog::list_tracks_handler).post(catalog::create_track_handler),
        )
        .route(
            "/api/tracks/:id",
            get(catalog::get_track_handler).delete(catalog::delete_track_handler),
        )
        .route("/api/tracks/:id/play", post(catalog::play_track_handler))
        .route("/api/uploads/sign", post(catalog::sign_upload_handler))
        .route(
            "/api/communities",
            get(communities::list_communities_handler).post(communities::create_community_handler),
        )
        .route("/api/communities/:id", get(communities::get_community_handler))
        .route(
            "/api/communities/:id/join",
            post(communities::join_community_handler),
        )
        .route(
            "/api/communities/:id/leave",
            post(communities::leave_community_handler),
        )
        .route(
            "/api/communities/:id/posts",
            get(communities::list_posts_handler).post(communities::create_post_handler),
        )
        .route(
            "/api/events",
            get(communities::list_events_handler).post(communities::create_event_handler),
        )
        .route("/api/donations", post(billing::donate_handler))
        .route("/api/payments/:id/status", get(billing::payment_status_handler))
        .route(
            "/api/payments/paypal/:order_id/capture",
            post(billing::paypal_capture_handler),
        )
        .route(
            "/api/payments/paypal/:order_id/status",
            get(billing::paypal_status_handler),
        )
        .route(
            "/api/subscriptions",
            get(billing::my_subscriptions_handler).post(billing::subscribe_handler),
        )
        .route(
            "/api/subscriptions/:id/cancel",
            post(billing::cancel_subscription_handler),
        )
        .route("/api/revenue", get(billing::revenue_handler))
        .route("/webhooks/momo", post(webhooks::mobile_money_webhook_handler))
        .route("/webhooks/paypal", post(webhooks::paypal_webhook_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
