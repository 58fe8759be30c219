use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Album {
    pub id: Uuid,
    pub artist_id: Uuid,
    pub title: String,
    pub cover_url: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Track {
    pub id: Uuid,
    pub artist_id: Uuid,
    pub album_id: Option<Uuid>,
    pub title: String,
    pub genre: Option<String>,
    pub duration_seconds: i32,
    pub audio_url: String,
    pub cover_url: Option<String>,
    pub play_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Listing filter; all set fields must match. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct TrackFilter {
    pub artist_id: Option<Uuid>,
    pub album_id: Option<Uuid>,
    pub genre: Option<String>,
    /// `None` returns every match.
    pub limit: Option<u32>,
}

impl TrackFilter {
    pub fn matches(&self, track: &Track) -> bool {
        self.artist_id.map_or(true, |a| track.artist_id == a)
            && self.album_id.map_or(true, |a| track.album_id == Some(a))
            && self.genre.as_deref().map_or(true, |g| {
                track
                    .genre
                    .as_deref()
                    .is_some_and(|tg| tg.eq_ignore_ascii_case(g))
            })
    }
}
