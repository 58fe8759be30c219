//! Albums, tracks, plays and signed uploads.

use crate::app::{check_media_url, optional_text, page_size, require_artist, required_text};
use crate::domain::model::{Album, Track, TrackFilter};
use crate::error::{AppError, Result};
use crate::infra::media::{MediaSigner, SignedUpload, UploadKind};
use crate::storage::Store;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAlbumRequest {
    pub title: String,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AlbumWithTracks {
    pub album: Album,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTrackRequest {
    pub title: String,
    #[serde(default)]
    pub album_id: Option<Uuid>,
    #[serde(default)]
    pub genre: Option<String>,
    pub duration_seconds: i32,
    pub audio_url: String,
    #[serde(default)]
    pub cover_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TrackQuery {
    pub artist_id: Option<Uuid>,
    pub album_id: Option<Uuid>,
    pub genre: Option<String>,
    /// 1 to 100, default 20.
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlayCount {
    pub track_id: Uuid,
    pub play_count: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignUploadRequest {
    pub kind: UploadKind,
}

pub struct CatalogService {
    store: Arc<dyn Store>,
    media: Option<Arc<MediaSigner>>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>, media: Option<Arc<MediaSigner>>) -> Self {
        Self { store, media }
    }

    fn media_url(&self, field: &str, url: Option<String>) -> Result<Option<String>> {
        match optional_text(field, url, 2048)? {
            Some(url) => check_media_url(self.media.as_deref(), field, &url).map(Some),
            None => Ok(None),
        }
    }

    pub async fn create_album(&self, user_id: Uuid, req: CreateAlbumRequest) -> Result<Album> {
        let artist = require_artist(self.store.as_ref(), user_id).await?;
        let album = Album {
            id: Uuid::new_v4(),
            artist_id: artist.id,
            title: required_text("title", &req.title, 200)?,
            cover_url: self.media_url("cover_url", req.cover_url)?,
            release_date: req.release_date,
            created_at: Utc::now(),
        };
        self.store.insert_album(&album).await?;
        tracing::info!(album_id = %album.id, artist_id = %artist.id, "album created");
        Ok(album)
    }

    pub async fn album(&self, album_id: Uuid) -> Result<AlbumWithTracks> {
        let album = self
            .store
            .get_album(album_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("album {}", album_id)))?;
        let tracks = self
            .store
            .list_tracks(&TrackFilter {
                album_id: Some(album_id),
                limit: None,
                ..TrackFilter::default()
            })
            .await?;
        Ok(AlbumWithTracks { album, tracks })
    }

    pub async fn create_track(&self, user_id: Uuid, req: CreateTrackRequest) -> Result<Track> {
        let artist = require_artist(self.store.as_ref(), user_id).await?;
        if req.duration_seconds <= 0 {
            return Err(AppError::Validation(
                "duration_seconds must be positive".to_string(),
            ));
        }
        if let Some(album_id) = req.album_id {
            let album = self
                .store
                .get_album(album_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("album {}", album_id)))?;
            if album.artist_id != artist.id {
                return Err(AppError::Forbidden(
                    "album belongs to another artist".to_string(),
                ));
            }
        }

        let track = Track {
            id: Uuid::new_v4(),
            artist_id: artist.id,
            album_id: req.album_id,
            title: required_text("title", &req.title, 200)?,
            genre: optional_text("genre", req.genre, 50)?.map(|g| g.to_lowercase()),
            duration_seconds: req.duration_seconds,
            audio_url: check_media_url(self.media.as_deref(), "audio_url", &req.audio_url)?,
            cover_url: self.media_url("cover_url", req.cover_url)?,
            play_count: 0,
            created_at: Utc::now(),
        };
        self.store.insert_track(&track).await?;
        tracing::info!(track_id = %track.id, artist_id = %artist.id, "track created");
        Ok(track)
    }

    pub async fn list_tracks(&self, query: TrackQuery) -> Result<Vec<Track>> {
        let filter = TrackFilter {
            artist_id: query.artist_id,
            album_id: query.album_id,
            genre: query
                .genre
                .map(|g| g.trim().to_lowercase())
                .filter(|g| !g.is_empty()),
            limit: Some(page_size(query.limit)?),
        };
        self.store.list_tracks(&filter).await
    }

    pub async fn track(&self, track_id: Uuid) -> Result<Track> {
        self.store
            .get_track(track_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("track {}", track_id)))
    }

    pub async fn delete_track(&self, user_id: Uuid, track_id: Uuid) -> Result<()> {
        let track = self.track(track_id).await?;
        if track.artist_id != user_id {
            return Err(AppError::Forbidden(
                "only the owner can delete a track".to_string(),
            ));
        }
        self.store.delete_track(track_id).await?;
        tracing::info!(track_id = %track_id, "track deleted");
        Ok(())
    }

    pub async fn record_play(&self, track_id: Uuid) -> Result<PlayCount> {
        let play_count = self
            .store
            .increment_play_count(track_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("track {}", track_id)))?;
        Ok(PlayCount {
            track_id,
            play_count,
        })
    }

    /// Audio and covers are artist content; anyone signed in may upload an avatar.
    pub async fn sign_upload(&self, user_id: Uuid, kind: UploadKind) -> Result<SignedUpload> {
        let signer = self
            .media
            .as_deref()
            .ok_or(AppError::GatewayNotConfigured("media CDN"))?;
        if matches!(kind, UploadKind::Audio | UploadKind::Cover) {
            require_artist(self.store.as_ref(), user_id).await?;
        }
        Ok(signer.sign_upload(kind, user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Profile, Role};
    use crate::infra::config::CdnConfig;
    use crate::storage::MemoryStore;

    async fn setup(media: bool) -> (CatalogService, Uuid, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let artist = Uuid::new_v4();
        let listener = Uuid::new_v4();
        for (id, role) in [(artist, Role::Artist), (listener, Role::Listener)] {
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
        let signer = media.then(|| {
            Arc::new(MediaSigner::new(CdnConfig {
                cloud_name: "demo".to_string(),
                api_key: "key".to_string(),
                api_secret: "secret".to_string(),
            }))
        });
        (CatalogService::new(store, signer), artist, listener)
    }

    fn track_request(audio_url: &str) -> CreateTrackRequest {
        CreateTrackRequest {
            title: "Intro".to_string(),
            album_id: None,
            genre: Some("Afrobeat".to_string()),
            duration_seconds: 180,
            audio_url: audio_url.to_string(),
            cover_url: None,
        }
    }

    #[tokio::test]
    async fn only_artists_publish_tracks_with_cdn_audio() {
        let (svc, artist, listener) = setup(true).await;
        let url = "https://res.cloudinary.com/demo/video/upload/v1/intro.mp3";

        let err = svc.create_track(listener, track_request(url)).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = svc
            .create_track(artist, track_request("https://elsewhere.example/intro.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let track = svc.create_track(artist, track_request(url)).await.unwrap();
        assert_eq!(track.genre.as_deref(), Some("afrobeat"));

        let found = svc
            .list_tracks(TrackQuery {
                genre: Some("AFROBEAT".to_string()),
                ..TrackQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn tracks_join_only_existing_albums() {
        let (svc, artist, _) = setup(false).await;
        let album = svc
            .create_album(
                artist,
                CreateAlbumRequest {
                    title: "First".to_string(),
                    cover_url: None,
                    release_date: None,
                },
            )
            .await
            .unwrap();

        let mut req = track_request("https://cdn.example/a.mp3");
        req.album_id = Some(album.id);
        svc.create_track(artist, req).await.unwrap();
        assert_eq!(svc.album(album.id).await.unwrap().tracks.len(), 1);

        let mut req = track_request("https://cdn.example/b.mp3");
        req.album_id = Some(Uuid::new_v4());
        assert!(matches!(
            svc.create_track(artist, req).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn album_lists_every_track_beyond_one_page() {
        let (svc, artist, _) = setup(false).await;
        let album = svc
            .create_album(
                artist,
                CreateAlbumRequest {
                    title: "Box Set".to_string(),
                    cover_url: None,
                    release_date: None,
                },
            )
            .await
            .unwrap();

        let count = crate::app::MAX_PAGE_SIZE as usize + 5;
        for i in 0..count {
            let mut req = track_request(&format!("https://cdn.example/{}.mp3", i));
            req.album_id = Some(album.id);
            svc.create_track(artist, req).await.unwrap();
        }

        assert_eq!(svc.album(album.id).await.unwrap().tracks.len(), count);
        let page = svc
            .list_tracks(TrackQuery {
                album_id: Some(album.id),
                ..TrackQuery::default()
            })
            .await
            .unwrap();
        assert!(page.len() < count);
    }

    #[tokio::test]
    async fn plays_count_and_owner_deletes() {
        let (svc, artist, listener) = setup(false).await;
        let track = svc
            .create_track(artist, track_request("https://cdn.example/a.mp3"))
            .await
            .unwrap();

        svc.record_play(track.id).await.unwrap();
        assert_eq!(svc.record_play(track.id).await.unwrap().play_count, 2);

        assert!(matches!(
            svc.delete_track(listener, track.id).await,
            Err(AppError::Forbidden(_))
        ));
        svc.delete_track(artist, track.id).await.unwrap();
        assert!(matches!(
            svc.record_play(track.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_rejects_out_of_range_limit() {
        let (svc, _, _) = setup(false).await;
        let err = svc
            .list_tracks(TrackQuery {
                limit: Some(500),
                ..TrackQuery::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn upload_signing_requires_cdn_and_artist_for_audio() {
        let (svc, artist, _) = setup(false).await;
        assert!(matches!(
            svc.sign_upload(artist, UploadKind::Audio).await,
            Err(AppError::GatewayNotConfigured(_))
        ));

        let (svc, artist, listener) = setup(true).await;
        assert!(matches!(
            svc.sign_upload(listener, UploadKind::Audio).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(svc.sign_upload(listener, UploadKind::Avatar).await.is_ok());
        let signed = svc.sign_upload(artist, UploadKind::Audio).await.unwrap();
        assert!(signed.folder.ends_with(&artist.to_string()));
    }
}
