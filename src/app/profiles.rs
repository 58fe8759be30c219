use crate::app::{check_media_url, find_artist, optional_text, required_text};
use crate::domain::model::{Album, Profile, Role, Track, TrackFilter};
use crate::error::{AppError, Result};
use crate::infra::media::MediaSigner;
use crate::storage::Store;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

const ARTIST_PAGE_TRACKS: u32 = 10;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    /// Defaults to the current role, or `listener` for a new profile.
    #[serde(default)]
    pub role: Option<Role>,
    pub display_name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Public artist page.
#[derive(Debug, Serialize, ToSchema)]
pub struct ArtistPage {
    pub profile: Profile,
    pub albums: Vec<Album>,
    pub latest_tracks: Vec<Track>,
}

pub struct ProfileService {
    store: Arc<dyn Store>,
    media: Option<Arc<MediaSigner>>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn Store>, media: Option<Arc<MediaSigner>>) -> Self {
        Self { store, media }
    }

    pub async fn me(&self, user_id: Uuid) -> Result<Profile> {
        self.store
            .get_profile(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("profile not created yet".to_string()))
    }

    pub async fn update_me(&self, user_id: Uuid, req: UpdateProfileRequest) -> Result<Profile> {
        let existing = self.store.get_profile(user_id).await?;
        let role = req
            .role
            .or(existing.as_ref().map(|p| p.role))
            .unwrap_or(Role::Listener);
        let avatar_url = match optional_text("avatar_url", req.avatar_url, 2048)? {
            Some(url) => Some(check_media_url(self.media.as_deref(), "avatar_url", &url)?),
            None => None,
        };

        let profile = Profile {
            id: user_id,
            role,
            display_name: required_text("display_name", &req.display_name, 80)?,
            bio: optional_text("bio", req.bio, 1000)?,
            avatar_url,
            created_at: existing.map(|p| p.created_at).unwrap_or_else(Utc::now),
        };
        let stored = self.store.upsert_profile(&profile).await?;
        tracing::info!(user_id = %user_id, role = %stored.role, "profile saved");
        Ok(stored)
    }

    pub async fn artist(&self, artist_id: Uuid) -> Result<ArtistPage> {
        let profile = find_artist(self.store.as_ref(), artist_id).await?;
        let albums = self.store.list_albums(artist_id).await?;
        let latest_tracks = self
            .store
            .list_tracks(&TrackFilter {
                artist_id: Some(artist_id),
                limit: Some(ARTIST_PAGE_TRACKS),
                ..TrackFilter::default()
            })
            .await?;
        Ok(ArtistPage {
            profile,
            albums,
            latest_tracks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn service() -> ProfileService {
        ProfileService::new(Arc::new(MemoryStore::new()), None)
    }

    fn request(role: Option<Role>, name: &str) -> UpdateProfileRequest {
        UpdateProfileRequest {
            role,
            display_name: name.to_string(),
            bio: None,
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn new_profile_defaults_to_listener_and_keeps_role() {
        let svc = service();
        let user = Uuid::new_v4();
        assert!(matches!(svc.me(user).await, Err(AppError::NotFound(_))));

        let p = svc.update_me(user, request(None, " Ada ")).await.unwrap();
        assert_eq!(p.role, Role::Listener);
        assert_eq!(p.display_name, "Ada");

        svc.update_me(user, request(Some(Role::Artist), "Ada")).await.unwrap();
        let p = svc.update_me(user, request(None, "Ada L")).await.unwrap();
        assert_eq!(p.role, Role::Artist);
        assert_eq!(svc.me(user).await.unwrap().display_name, "Ada L");
    }

    #[tokio::test]
    async fn listeners_have_no_artist_page() {
        let svc = service();
        let user = Uuid::new_v4();
        svc.update_me(user, request(None, "Listener")).await.unwrap();
        assert!(matches!(svc.artist(user).await, Err(AppError::NotFound(_))));

        svc.update_me(user, request(Some(Role::Artist), "Band")).await.unwrap();
        let page = svc.artist(user).await.unwrap();
        assert!(page.albums.is_empty() && page.latest_tracks.is_empty());
    }
}
