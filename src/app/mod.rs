//! Application services. Handlers stay thin; every rule about who may do what
//! lives here.

pub mod catalog;
pub mod communities;
pub mod payments;
pub mod profiles;
pub mod revenue;
pub mod subscriptions;

pub use catalog::CatalogService;
pub use communities::CommunityService;
pub use payments::PaymentService;
pub use profiles::ProfileService;
pub use revenue::RevenueService;
pub use subscriptions::SubscriptionService;

use crate::domain::model::Profile;
use crate::error::{AppError, Result};
use crate::infra::config::BillingConfig;
use crate::infra::media::MediaSigner;
use crate::infra::payments::{MobileMoneyGateway, PaypalGateway};
use crate::storage::Store;
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Everything the HTTP layer calls into.
pub struct Services {
    pub profiles: ProfileService,
    pub catalog: CatalogService,
    pub communities: CommunityService,
    pub payments: Arc<PaymentService>,
    pub subscriptions: SubscriptionService,
    pub revenue: RevenueService,
}

impl Services {
    pub fn new(
        store: Arc<dyn Store>,
        mobile_money: Option<Arc<dyn MobileMoneyGateway>>,
        paypal: Option<Arc<dyn PaypalGateway>>,
        media: Option<Arc<MediaSigner>>,
        billing: BillingConfig,
    ) -> Self {
        Self {
            profiles: ProfileService::new(store.clone(), media.clone()),
            catalog: CatalogService::new(store.clone(), media),
            communities: CommunityService::new(store.clone()),
            payments: Arc::new(PaymentService::new(
                store.clone(),
                mobile_money,
                paypal,
                billing,
            )),
            subscriptions: SubscriptionService::new(store.clone()),
            revenue: RevenueService::new(store),
        }
    }
}

pub(crate) async fn require_profile(store: &dyn Store, user_id: Uuid) -> Result<Profile> {
    store
        .get_profile(user_id)
        .await?
        .ok_or_else(|| AppError::Forbidden("create a profile first".to_string()))
}

/// The caller's profile, which must be an artist profile.
pub(crate) async fn require_artist(store: &dyn Store, user_id: Uuid) -> Result<Profile> {
    let profile = require_profile(store, user_id).await?;
    if !profile.is_artist() {
        return Err(AppError::Forbidden("only artists can do this".to_string()));
    }
    Ok(profile)
}

/// Someone else's artist profile; listeners and unknown ids read as not found.
pub(crate) async fn find_artist(store: &dyn Store, artist_id: Uuid) -> Result<Profile> {
    store
        .get_profile(artist_id)
        .await?
        .filter(Profile::is_artist)
        .ok_or_else(|| AppError::NotFound(format!("artist {}", artist_id)))
}

/// Trims `value` and checks its length in characters.
pub(crate) fn required_text(field: &str, value: &str, max: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", field)));
    }
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(value.to_string())
}

/// Like [`required_text`] but blank means absent.
pub(crate) fn optional_text(field: &str, value: Option<String>, max: usize) -> Result<Option<String>> {
    match value {
        Some(v) if !v.trim().is_empty() => required_text(field, &v, max).map(Some),
        _ => Ok(None),
    }
}

/// Media URLs must point at our CDN when one is configured, and be https either way.
pub(crate) fn check_media_url(media: Option<&MediaSigner>, field: &str, url: &str) -> Result<String> {
    let url = url.trim();
    let ok = match media {
        Some(signer) => signer.is_cdn_url(url),
        None => url.starts_with("https://") && url.len() > "https://".len(),
    };
    if !ok {
        return Err(AppError::Validation(format!(
            "{} must be an uploaded media URL",
            field
        )));
    }
    Ok(url.to_string())
}

pub(crate) fn page_size(limit: Option<u32>) -> Result<u32> {
    match limit {
        None => Ok(DEFAULT_PAGE_SIZE),
        Some(n) if (1..=MAX_PAGE_SIZE).contains(&n) => Ok(n),
        Some(n) => Err(AppError::Validation(format!(
            "limit must be between 1 and {}, got {}",
            MAX_PAGE_SIZE, n
        ))),
    }
}
