//! Artist communities, their posts, and events.

use crate::app::{optional_text, page_size, require_artist, require_profile, required_text};
use crate::domain::model::{Community, CommunityMember, CommunityPost, Event};
use crate::domain::money::Money;
use crate::error::{AppError, Result};
use crate::storage::Store;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCommunityRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommunityView {
    pub community: Community,
    pub member_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Membership {
    pub community_id: Uuid,
    pub member: bool,
    pub member_count: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePostRequest {
    pub body: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub venue: String,
    pub starts_at: DateTime<Utc>,
    #[serde(default)]
    pub community_id: Option<Uuid>,
    /// Decimal ticket price; requires `currency`.
    #[serde(default)]
    pub ticket_price: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    pub artist_id: Option<Uuid>,
    pub limit: Option<u32>,
}

pub struct CommunityService {
    store: Arc<dyn Store>,
}

impl CommunityService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn community(&self, community_id: Uuid) -> Result<Community> {
        self.store
            .get_community(community_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("community {}", community_id)))
    }

    async fn membership(&self, community_id: Uuid, member: bool) -> Result<Membership> {
        Ok(Membership {
            community_id,
            member,
            member_count: self.store.count_members(community_id).await?,
        })
    }

    /// The owner and members may read and write posts.
    async fn ensure_participant(&self, community: &Community, user_id: Uuid) -> Result<()> {
        if community.artist_id == user_id
            || self.store.is_member(community.id, user_id).await?
        {
            return Ok(());
        }
        Err(AppError::Forbidden(
            "join the community to see its posts".to_string(),
        ))
    }

    pub async fn create_community(
        &self,
        user_id: Uuid,
        req: CreateCommunityRequest,
    ) -> Result<Community> {
        let artist = require_artist(self.store.as_ref(), user_id).await?;
        let community = Community {
            id: Uuid::new_v4(),
            artist_id: artist.id,
            name: required_text("name", &req.name, 100)?,
            description: optional_text("description", req.description, 2000)?,
            created_at: Utc::now(),
        };
        self.store.insert_community(&community).await?;
        tracing::info!(community_id = %community.id, artist_id = %artist.id, "community created");
        Ok(community)
    }

    pub async fn list_communities(&self, artist_id: Option<Uuid>) -> Result<Vec<Community>> {
        self.store.list_communities(artist_id).await
    }

    pub async fn get_community(&self, community_id: Uuid) -> Result<CommunityView> {
        let community = self.community(community_id).await?;
        let member_count = self.store.count_members(community_id).await?;
        Ok(CommunityView {
            community,
            member_count,
        })
    }

    /// Joining twice is harmless. The owner is implicitly part of the community.
    pub async fn join(&self, user_id: Uuid, community_id: Uuid) -> Result<Membership> {
        require_profile(self.store.as_ref(), user_id).await?;
        let community = self.community(community_id).await?;
        if community.artist_id == user_id {
            return self.membership(community_id, true).await;
        }
        let added = self
            .store
            .add_member(&CommunityMember {
                community_id,
                user_id,
                joined_at: Utc::now(),
            })
            .await?;
        if added {
            tracing::info!(community_id = %community_id, user_id = %user_id, "member joined");
        }
        self.membership(community_id, true).await
    }

    pub async fn leave(&self, user_id: Uuid, community_id: Uuid) -> Result<Membership> {
        let community = self.community(community_id).await?;
        if community.artist_id == user_id {
            return Err(AppError::Validation(
                "the owner cannot leave their own community".to_string(),
            ));
        }
        if self.store.remove_member(community_id, user_id).await? {
            tracing::info!(community_id = %community_id, user_id = %user_id, "member left");
        }
        self.membership(community_id, false).await
    }

    pub async fn list_posts(
        &self,
        user_id: Uuid,
        community_id: Uuid,
        limit: Option<u32>,
    ) -> Result<Vec<CommunityPost>> {
        let community = self.community(community_id).await?;
        self.ensure_participant(&community, user_id).await?;
        self.store
            .list_posts(community_id, page_size(limit)?)
            .await
    }

    pub async fn create_post(
        &self,
        user_id: Uuid,
        community_id: Uuid,
        req: CreatePostRequest,
    ) -> Result<CommunityPost> {
        let community = self.community(community_id).await?;
        self.ensure_participant(&community, user_id).await?;
        let post = CommunityPost {
            id: Uuid::new_v4(),
            community_id,
            author_id: user_id,
            body: required_text("body", &req.body, 2000)?,
            created_at: Utc::now(),
        };
        self.store.insert_post(&post).await?;
        Ok(post)
    }

    pub async fn create_event(&self, user_id: Uuid, req: CreateEventRequest) -> Result<Event> {
        let artist = require_artist(self.store.as_ref(), user_id).await?;
        let now = Utc::now();
        if req.starts_at <= now {
            return Err(AppError::Validation(
                "starts_at must be in the future".to_string(),
            ));
        }
        if let Some(community_id) = req.community_id {
            let community = self.community(community_id).await?;
            if community.artist_id != artist.id {
                return Err(AppError::Forbidden(
                    "events can only be attached to your own community".to_string(),
                ));
            }
        }
        let ticket = match (req.ticket_price, req.currency) {
            (Some(price), Some(currency)) => Some(Money::parse_decimal(&price, &currency)?),
            (None, _) => None,
            (Some(_), None) => {
                return Err(AppError::Validation(
                    "currency is required with ticket_price".to_string(),
                ))
            }
        };

        let event = Event {
            id: Uuid::new_v4(),
            artist_id: artist.id,
            community_id: req.community_id,
            title: required_text("title", &req.title, 200)?,
            description: optional_text("description", req.description, 4000)?,
            venue: required_text("venue", &req.venue, 200)?,
            starts_at: req.starts_at,
            ticket_price_minor: ticket.as_ref().map(|m| m.minor),
            currency: ticket.map(|m| m.currency),
            created_at: now,
        };
        self.store.insert_event(&event).await?;
        tracing::info!(event_id = %event.id, artist_id = %artist.id, "event created");
        Ok(event)
    }

    pub async fn upcoming_events(&self, query: ListQuery) -> Result<Vec<Event>> {
        self.store
            .list_events(query.artist_id, Utc::now(), page_size(query.limit)?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Profile, Role};
    use crate::storage::MemoryStore;
    use chrono::Duration;

    async fn setup() -> (CommunityService, Uuid, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let artist = Uuid::new_v4();
        let fan = Uuid::new_v4();
        for (id, role) in [(artist, Role::Artist), (fan, Role::Listener)] {
            store
                .upsert_profile(&Profile {
                    id,
                    role,
                    display_name: "someone".to_string(),
                    bio: None,
                    avatar_url: None,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }
        (CommunityService::new(store), artist, fan)
    }

    fn community_request() -> CreateCommunityRequest {
        CreateCommunityRequest {
            name: "Street Team".to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn membership_gates_posts() {
        let (svc, artist, fan) = setup().await;
        let community = svc.create_community(artist, community_request()).await.unwrap();

        let post = CreatePostRequest {
            body: "hello".to_string(),
        };
        assert!(matches!(
            svc.create_post(fan, community.id, post).await,
            Err(AppError::Forbidden(_))
        ));

        let joined = svc.join(fan, community.id).await.unwrap();
        assert_eq!(joined.member_count, 1);
        // joining again changes nothing
        assert_eq!(svc.join(fan, community.id).await.unwrap().member_count, 1);

        svc.create_post(fan, community.id, CreatePostRequest { body: "hi".into() })
            .await
            .unwrap();
        svc.create_post(artist, community.id, CreatePostRequest { body: "welcome".into() })
            .await
            .unwrap();
        assert_eq!(svc.list_posts(fan, community.id, None).await.unwrap().len(), 2);

        let left = svc.leave(fan, community.id).await.unwrap();
        assert!(!left.member);
        assert_eq!(left.member_count, 0);
        assert!(svc.list_posts(fan, community.id, None).await.is_err());
    }

    #[tokio::test]
    async fn owner_cannot_leave_and_listeners_cannot_create() {
        let (svc, artist, fan) = setup().await;
        assert!(matches!(
            svc.create_community(fan, community_request()).await,
            Err(AppError::Forbidden(_))
        ));
        let community = svc.create_community(artist, community_request()).await.unwrap();
        assert!(matches!(
            svc.leave(artist, community.id).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn events_are_future_and_listed_soonest_first() {
        let (svc, artist, _) = setup().await;
        let now = Utc::now();
        let event = |title: &str, days: i64| CreateEventRequest {
            title: title.to_string(),
            description: None,
            venue: "Hall".to_string(),
            starts_at: now + Duration::days(days),
            community_id: None,
            ticket_price: Some("15.00".to_string()),
            currency: Some("usd".to_string()),
        };

        assert!(matches!(
            svc.create_event(artist, event("past", -1)).await,
            Err(AppError::Validation(_))
        ));
        let later = svc.create_event(artist, event("later", 30)).await.unwrap();
        svc.create_event(artist, event("sooner", 2)).await.unwrap();
        assert_eq!(later.ticket_price_minor, Some(1500));
        assert_eq!(later.currency.as_deref(), Some("USD"));

        let listed = svc
            .upcoming_events(ListQuery {
                artist_id: Some(artist),
                limit: None,
            })
            .await
            .unwrap();
        let titles: Vec<&str> = listed.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["sooner", "later"]);
    }

    #[tokio::test]
    async fn events_attach_only_to_own_community() {
        let (svc, artist, _) = setup().await;
        let mut req = CreateEventRequest {
            title: "Launch".to_string(),
            description: None,
            venue: "Club".to_string(),
            starts_at: Utc::now() + Duration::days(1),
            community_id: Some(Uuid::new_v4()),
            ticket_price: None,
            currency: None,
        };
        assert!(matches!(
            svc.create_event(artist, req).await,
            Err(AppError::NotFound(_))
        ));

        let community = svc.create_community(artist, community_request()).await.unwrap();
        req = CreateEventRequest {
            title: "Launch".to_string(),
            description: None,
            venue: "Club".to_string(),
            starts_at: Utc::now() + Duration::days(1),
            community_id: Some(community.id),
            ticket_price: Some("10".to_string()),
            currency: None,
        };
        assert!(matches!(
            svc.create_event(artist, req).await,
            Err(AppError::Validation(_))
        ));
    }
}
