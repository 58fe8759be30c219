//! In-process store with the same semantics as the Postgres schema's constraints.

use crate::domain::model::{
    Album, Community, CommunityMember, CommunityPost, Donation, Event, Payment, Profile,
    RevenueTransaction, Subscription, Track, TrackFilter,
};
use crate::domain::payment::{PaymentStatus, Provider};
use crate::error::{AppError, Result};
use crate::storage::{PaymentUpdate, Store};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    profiles: HashMap<Uuid, Profile>,
    albums: HashMap<Uuid, Album>,
    tracks: HashMap<Uuid, Track>,
    communities: HashMap<Uuid, Community>,
    members: Vec<CommunityMember>,
    posts: Vec<CommunityPost>,
    events: HashMap<Uuid, Event>,
    payments: HashMap<Uuid, Payment>,
    donations: HashMap<Uuid, Donation>,
    subscriptions: HashMap<Uuid, Subscription>,
    revenue: Vec<RevenueTransaction>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<Profile> {
        let mut t = self.tables.write().await;
        let stored = match t.profiles.get(&profile.id) {
            // created_at is kept from the first insert
            Some(existing) => Profile {
                created_at: existing.created_at,
                ..profile.clone()
            },
            None => profile.clone(),
        };
        t.profiles.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        Ok(self.tables.read().await.profiles.get(&id).cloned())
    }

    async fn insert_album(&self, album: &Album) -> Result<()> {
        self.tables.write().await.albums.insert(album.id, album.clone());
        Ok(())
    }

    async fn get_album(&self, id: Uuid) -> Result<Option<Album>> {
        Ok(self.tables.read().await.albums.get(&id).cloned())
    }

    async fn list_albums(&self, artist_id: Uuid) -> Result<Vec<Album>> {
        let t = self.tables.read().await;
        let mut out: Vec<Album> = t
            .albums
            .values()
            .filter(|a| a.artist_id == artist_id)
            .cloned()
            .collect();
        newest_first(&mut out, |a| a.created_at);
        Ok(out)
    }

    async fn insert_track(&self, track: &Track) -> Result<()> {
        self.tables.write().await.tracks.insert(track.id, track.clone());
        Ok(())
    }

    async fn get_track(&self, id: Uuid) -> Result<Option<Track>> {
        Ok(self.tables.read().await.tracks.get(&id).cloned())
    }

    async fn list_tracks(&self, filter: &TrackFilter) -> Result<Vec<Track>> {
        let t = self.tables.read().await;
        let mut out: Vec<Track> = t
            .tracks
            .values()
            .filter(|tr| filter.matches(tr))
            .cloned()
            .collect();
        newest_first(&mut out, |tr| tr.created_at);
        if let Some(limit) = filter.limit {
            out.truncate(limit as usize);
        }
        Ok(out)
    }

    async fn delete_track(&self, id: Uuid) -> Result<bool> {
        Ok(self.tables.write().await.tracks.remove(&id).is_some())
    }

    async fn increment_play_count(&self, id: Uuid) -> Result<Option<i64>> {
        let mut t = self.tables.write().await;
        Ok(t.tracks.get_mut(&id).map(|tr| {
            tr.play_count += 1;
            tr.play_count
        }))
    }

    async fn insert_community(&self, community: &Community) -> Result<()> {
        let mut t = self.tables.write().await;
        t.communities.insert(community.id, community.clone());
        Ok(())
    }

    async fn get_community(&self, id: Uuid) -> Result<Option<Community>> {
        Ok(self.tables.read().await.communities.get(&id).cloned())
    }

    async fn list_communities(&self, artist_id: Option<Uuid>) -> Result<Vec<Community>> {
        let t = self.tables.read().await;
        let mut out: Vec<Community> = t
            .communities
            .values()
            .filter(|c| artist_id.map_or(true, |a| c.artist_id == a))
            .cloned()
            .collect();
        newest_first(&mut out, |c| c.created_at);
        Ok(out)
    }

    async fn add_member(&self, member: &CommunityMember) -> Result<bool> {
        let mut t = self.tables.write().await;
        let exists = t
            .members
            .iter()
            .any(|m| m.community_id == member.community_id && m.user_id == member.user_id);
        if exists {
            return Ok(false);
        }
        t.members.push(member.clone());
        Ok(true)
    }

    async fn remove_member(&self, community_id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut t = self.tables.write().await;
        let before = t.members.len();
        t.members
            .retain(|m| !(m.community_id == community_id && m.user_id == user_id));
        Ok(t.members.len() != before)
    }

    async fn is_member(&self, community_id: Uuid, user_id: Uuid) -> Result<bool> {
        let t = self.tables.read().await;
        Ok(t
            .members
            .iter()
            .any(|m| m.community_id == community_id && m.user_id == user_id))
    }

    async fn count_members(&self, community_id: Uuid) -> Result<i64> {
        let t = self.tables.read().await;
        Ok(t.members
            .iter()
            .filter(|m| m.community_id == community_id)
            .count() as i64)
    }

    async fn insert_post(&self, post: &CommunityPost) -> Result<()> {
        self.tables.write().await.posts.push(post.clone());
        Ok(())
    }

    async fn list_posts(&self, community_id: Uuid, limit: u32) -> Result<Vec<CommunityPost>> {
        let t = self.tables.read().await;
        let mut out: Vec<CommunityPost> = t
            .posts
            .iter()
            .filter(|p| p.community_id == community_id)
            .cloned()
            .collect();
        newest_first(&mut out, |p| p.created_at);
        out.truncate(limit as usize);
        Ok(out)
    }

    async fn insert_event(&self, event: &Event) -> Result<()> {
        self.tables.write().await.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn list_events(
        &self,
        artist_id: Option<Uuid>,
        from: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Event>> {
        let t = self.tables.read().await;
        let mut out: Vec<Event> = t
            .events
            .values()
            .filter(|e| e.starts_at >= from && artist_id.map_or(true, |a| e.artist_id == a))
            .cloned()
            .collect();
        out.sort_by_key(|e| e.starts_at);
        out.truncate(limit as usize);
        Ok(out)
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<()> {
        let mut t = self.tables.write().await;
        let duplicate = t.payments.values().any(|p| {
            p.provider == payment.provider && p.provider_reference == payment.provider_reference
        });
        if duplicate {
            return Err(AppError::Conflict(format!(
                "payment reference '{}' already exists",
                payment.provider_reference
            )));
        }
        t.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn get_payment(&self, id: Uuid) -> Result<Option<Payment>> {
        Ok(self.tables.read().await.payments.get(&id).cloned())
    }

    async fn find_payment_by_reference(
        &self,
        provider: Provider,
        reference: &str,
    ) -> Result<Option<Payment>> {
        let t = self.tables.read().await;
        Ok(t.payments
            .values()
            .find(|p| p.provider == provider && p.provider_reference == reference)
            .cloned())
    }

    async fn set_payment_reference(&self, id: Uuid, reference: &str) -> Result<()> {
        let mut t = self.tables.write().await;
        let payment = t
            .payments
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("payment {}", id)))?;
        payment.provider_reference = reference.to_string();
        payment.updated_at = Utc::now();
        Ok(())
    }

    async fn compare_and_set_payment_status(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        update: &PaymentUpdate,
    ) -> Result<bool> {
        let mut t = self.tables.write().await;
        let Some(payment) = t.payments.get_mut(&id) else {
            return Ok(false);
        };
        if payment.status != expected {
            return Ok(false);
        }
        payment.status = update.status;
        if update.provider_transaction_id.is_some() {
            payment.provider_transaction_id = update.provider_transaction_id.clone();
        }
        if update.status == PaymentStatus::Completed {
            payment.failure_reason = None;
        } else if update.failure_reason.is_some() {
            payment.failure_reason = update.failure_reason.clone();
        }
        payment.updated_at = Utc::now();
        Ok(true)
    }

    async fn insert_donation(&self, donation: &Donation) -> Result<()> {
        let mut t = self.tables.write().await;
        t.donations.insert(donation.id, donation.clone());
        Ok(())
    }

    async fn find_donation_by_payment(&self, payment_id: Uuid) -> Result<Option<Donation>> {
        let t = self.tables.read().await;
        Ok(t.donations
            .values()
            .find(|d| d.payment_id == payment_id)
            .cloned())
    }

    async fn set_donation_status(&self, payment_id: Uuid, status: PaymentStatus) -> Result<()> {
        let mut t = self.tables.write().await;
        for d in t.donations.values_mut().filter(|d| d.payment_id == payment_id) {
            d.status = status;
        }
        Ok(())
    }

    async fn insert_subscription(&self, subscription: &Subscription) -> Result<()> {
        let mut t = self.tables.write().await;
        let duplicate = t.subscriptions.values().any(|s| {
            s.subscriber_id == subscription.subscriber_id && s.artist_id == subscription.artist_id
        });
        if duplicate {
            return Err(AppError::Conflict(
                "subscription already exists for this artist".to_string(),
            ));
        }
        t.subscriptions.insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn get_subscription(&self, id: Uuid) -> Result<Option<Subscription>> {
        Ok(self.tables.read().await.subscriptions.get(&id).cloned())
    }

    async fn find_subscription(
        &self,
        subscriber_id: Uuid,
        artist_id: Uuid,
    ) -> Result<Option<Subscription>> {
        let t = self.tables.read().await;
        Ok(t.subscriptions
            .values()
            .find(|s| s.subscriber_id == subscriber_id && s.artist_id == artist_id)
            .cloned())
    }

    async fn find_subscription_by_payment(
        &self,
        payment_id: Uuid,
    ) -> Result<Option<Subscription>> {
        let t = self.tables.read().await;
        Ok(t.subscriptions
            .values()
            .find(|s| s.payment_id == Some(payment_id))
            .cloned())
    }

    async fn list_subscriptions(&self, subscriber_id: Uuid) -> Result<Vec<Subscription>> {
        let t = self.tables.read().await;
        let mut out: Vec<Subscription> = t
            .subscriptions
            .values()
            .filter(|s| s.subscriber_id == subscriber_id)
            .cloned()
            .collect();
        newest_first(&mut out, |s| s.created_at);
        Ok(out)
    }

    async fn update_subscription(&self, subscription: &Subscription) -> Result<()> {
        let mut t = self.tables.write().await;
        match t.subscriptions.get_mut(&subscription.id) {
            Some(existing) => {
                *existing = subscription.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!(
                "subscription {}",
                subscription.id
            ))),
        }
    }

    async fn insert_revenue_transaction(&self, txn: &RevenueTransaction) -> Result<bool> {
        let mut t = self.tables.write().await;
        if t.revenue.iter().any(|r| r.payment_id == txn.payment_id) {
            return Ok(false);
        }
        t.revenue.push(txn.clone());
        Ok(true)
    }

    async fn list_revenue(&self, artist_id: Uuid) -> Result<Vec<RevenueTransaction>> {
        let t = self.tables.read().await;
        let mut out: Vec<RevenueTransaction> = t
            .revenue
            .iter()
            .filter(|r| r.artist_id == artist_id)
            .cloned()
            .collect();
        newest_first(&mut out, |r| r.created_at);
        Ok(out)
    }

    async fn has_revenue_transaction(&self, payment_id: Uuid) -> Result<bool> {
        let t = self.tables.read().await;
        Ok(t.revenue.iter().any(|r| r.payment_id == payment_id))
    }
}
