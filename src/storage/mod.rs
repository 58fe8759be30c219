//! Persistence seam.
//!
//! `PgStore` talks to the BaaS-hosted Postgres; `MemoryStore` keeps everything in
//! process and backs local development and tests.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::domain::model::{
    Album, Community, CommunityMember, CommunityPost, Donation, Event, Payment, Profile,
    RevenueTransaction, Subscription, Track, TrackFilter,
};
use crate::domain::payment::{PaymentStatus, Provider};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Fields written when a payment settles.
#[derive(Debug, Clone)]
pub struct PaymentUpdate {
    pub status: PaymentStatus,
    pub provider_transaction_id: Option<String>,
    pub failure_reason: Option<String>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<()>;

    // --- profiles ---
    async fn upsert_profile(&self, profile: &Profile) -> Result<Profile>;
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>>;

    // --- catalog ---
    async fn insert_album(&self, album: &Album) -> Result<()>;
    async fn get_album(&self, id: Uuid) -> Result<Option<Album>>;
    async fn list_albums(&self, artist_id: Uuid) -> Result<Vec<Album>>;
    async fn insert_track(&self, track: &Track) -> Result<()>;
    async fn get_track(&self, id: Uuid) -> Result<Option<Track>>;
    async fn list_tracks(&self, filter: &TrackFilter) -> Result<Vec<Track>>;
    async fn delete_track(&self, id: Uuid) -> Result<bool>;
    /// Returns the new play count, or `None` if the track does not exist.
    async fn increment_play_count(&self, id: Uuid) -> Result<Option<i64>>;

    // --- communities & events ---
    async fn insert_community(&self, community: &Community) -> Result<()>;
    async fn get_community(&self, id: Uuid) -> Result<Option<Community>>;
    async fn list_communities(&self, artist_id: Option<Uuid>) -> Result<Vec<Community>>;
    /// Returns `false` if the user was already a member.
    async fn add_member(&self, member: &CommunityMember) -> Result<bool>;
    async fn remove_member(&self, community_id: Uuid, user_id: Uuid) -> Result<bool>;
    async fn is_member(&self, community_id: Uuid, user_id: Uuid) -> Result<bool>;
    async fn count_members(&self, community_id: Uuid) -> Result<i64>;
    async fn insert_post(&self, post: &CommunityPost) -> Result<()>;
    async fn list_posts(&self, community_id: Uuid, limit: u32) -> Result<Vec<CommunityPost>>;
    async fn insert_event(&self, event: &Event) -> Result<()>;
    /// Events starting at or after `from`, soonest first.
    async fn list_events(
        &self,
        artist_id: Option<Uuid>,
        from: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Event>>;

    // --- payments ---
    async fn insert_payment(&self, payment: &Payment) -> Result<()>;
    async fn get_payment(&self, id: Uuid) -> Result<Option<Payment>>;
    async fn find_payment_by_reference(
        &self,
        provider: Provider,
        reference: &str,
    ) -> Result<Option<Payment>>;
    async fn set_payment_reference(&self, id: Uuid, reference: &str) -> Result<()>;
    /// Applies `update` only if the payment is still in `expected`. Returns whether it did.
    async fn compare_and_set_payment_status(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        update: &PaymentUpdate,
    ) -> Result<bool>;

    // --- donations ---
    async fn insert_donation(&self, donation: &Donation) -> Result<()>;
    async fn find_donation_by_payment(&self, payment_id: Uuid) -> Result<Option<Donation>>;
    async fn set_donation_status(&self, payment_id: Uuid, status: PaymentStatus) -> Result<()>;

    // --- subscriptions ---
    async fn insert_subscription(&self, subscription: &Subscription) -> Result<()>;
    async fn get_subscription(&self, id: Uuid) -> Result<Option<Subscription>>;
    async fn find_subscription(
        &self,
        subscriber_id: Uuid,
        artist_id: Uuid,
    ) -> Result<Option<Subscription>>;
    async fn find_subscription_by_payment(&self, payment_id: Uuid)
        -> Result<Option<Subscription>>;
    async fn list_subscriptions(&self, subscriber_id: Uuid) -> Result<Vec<Subscription>>;
    async fn update_subscription(&self, subscription: &Subscription) -> Result<()>;

    // --- revenue ---
    /// Returns `false` if the payment already has a revenue transaction.
    async fn insert_revenue_transaction(&self, txn: &RevenueTransaction) -> Result<bool>;
    async fn list_revenue(&self, artist_id: Uuid) -> Result<Vec<RevenueTransaction>>;
    async fn has_revenue_transaction(&self, payment_id: Uuid) -> Result<bool>;
}
