use crate::domain::model::{Subscription, SubscriptionStatus};
use crate::error::{AppError, Result};
use crate::storage::Store;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Whether the caller currently has access to an artist's subscriber content.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionCheck {
    pub artist_id: Uuid,
    pub subscribed: bool,
    pub status: Option<SubscriptionStatus>,
    pub current_period_end: Option<DateTime<Utc>>,
}

/// Subscriptions are created through the payment flow; this service reads and cancels them.
pub struct SubscriptionService {
    store: Arc<dyn Store>,
}

/// Expiry is evaluated on read; nothing sweeps stored rows.
fn as_of(mut sub: Subscription, now: DateTime<Utc>) -> Subscription {
    sub.status = sub.effective_status(now);
    sub
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn mine(&self, user_id: Uuid) -> Result<Vec<Subscription>> {
        let now = Utc::now();
        Ok(self
            .store
            .list_subscriptions(user_id)
            .await?
            .into_iter()
            .map(|s| as_of(s, now))
            .collect())
    }

    /// Stops renewal. Access continues until the paid period ends.
    pub async fn cancel(&self, user_id: Uuid, subscription_id: Uuid) -> Result<Subscription> {
        let mut sub = self
            .store
            .get_subscription(subscription_id)
            .await?
            .filter(|s| s.subscriber_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("subscription {}", subscription_id)))?;
        let now = Utc::now();
        match sub.effective_status(now) {
            SubscriptionStatus::Cancelled => return Ok(as_of(sub, now)),
            SubscriptionStatus::Active => {}
            other => {
                return Err(AppError::Validation(format!(
                    "a {} subscription cannot be cancelled",
                    other
                )))
            }
        }
        sub.status = SubscriptionStatus::Cancelled;
        sub.updated_at = now;
        self.store.update_subscription(&sub).await?;
        tracing::info!(subscription_id = %sub.id, "subscription cancelled");
        Ok(sub)
    }

    pub async fn check(&self, user_id: Uuid, artist_id: Uuid) -> Result<SubscriptionCheck> {
        let now = Utc::now();
        let sub = self.store.find_subscription(user_id, artist_id).await?;
        Ok(SubscriptionCheck {
            artist_id,
            subscribed: sub.as_ref().is_some_and(|s| s.is_entitled(now)),
            status: sub.as_ref().map(|s| s.effective_status(now)),
            current_period_end: sub.and_then(|s| s.current_period_end),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Plan;
    use crate::storage::MemoryStore;
    use chrono::Duration;

    async fn seeded(status: SubscriptionStatus, end: Option<DateTime<Utc>>) -> (SubscriptionService, Subscription) {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let sub = Subscription {
            id: Uuid::new_v4(),
            subscriber_id: Uuid::new_v4(),
            artist_id: Uuid::new_v4(),
            plan: Plan::Monthly,
            status,
            payment_id: None,
            current_period_end: end,
            created_at: now,
            updated_at: now,
        };
        store.insert_subscription(&sub).await.unwrap();
        (SubscriptionService::new(store), sub)
    }

    #[tokio::test]
    async fn cancelled_subscription_keeps_access_until_period_end() {
        let end = Utc::now() + Duration::days(10);
        let (svc, sub) = seeded(SubscriptionStatus::Active, Some(end)).await;

        let cancelled = svc.cancel(sub.subscriber_id, sub.id).await.unwrap();
        assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);

        let check = svc.check(sub.subscriber_id, sub.artist_id).await.unwrap();
        assert!(check.subscribed);
        assert_eq!(check.status, Some(SubscriptionStatus::Cancelled));

        // cancelling twice is fine
        svc.cancel(sub.subscriber_id, sub.id).await.unwrap();
    }

    #[tokio::test]
    async fn lapsed_subscription_reads_as_expired() {
        let end = Utc::now() - Duration::days(1);
        let (svc, sub) = seeded(SubscriptionStatus::Active, Some(end)).await;

        let mine = svc.mine(sub.subscriber_id).await.unwrap();
        assert_eq!(mine[0].status, SubscriptionStatus::Expired);
        assert!(!svc.check(sub.subscriber_id, sub.artist_id).await.unwrap().subscribed);
        assert!(matches!(
            svc.cancel(sub.subscriber_id, sub.id).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn only_the_subscriber_can_cancel() {
        let (svc, sub) = seeded(SubscriptionStatus::Active, Some(Utc::now() + Duration::days(3))).await;
        assert!(matches!(
            svc.cancel(Uuid::new_v4(), sub.id).await,
            Err(AppError::NotFound(_))
        ));
        let check = svc.check(Uuid::new_v4(), sub.artist_id).await.unwrap();
        assert!(!check.subscribed && check.status.is_none());
    }
}
