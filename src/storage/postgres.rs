//! Store implementation on the BaaS-hosted PostgreSQL database.

use crate::domain::model::{
    Album, Community, CommunityMember, CommunityPost, Donation, Event, Payment, Profile,
    RevenueTransaction, Subscription, Track, TrackFilter,
};
use crate::domain::payment::{PaymentStatus, Provider};
use crate::error::{AppError, Result};
use crate::storage::{PaymentUpdate, Store};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Idempotent DDL applied at startup. Enums are TEXT with CHECK constraints.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS profiles (
        id UUID PRIMARY KEY,
        role TEXT NOT NULL CHECK (role IN ('artist', 'listener')),
        display_name TEXT NOT NULL,
        bio TEXT,
        avatar_url TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS albums (
        id UUID PRIMARY KEY,
        artist_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        cover_url TEXT,
        release_date DATE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS tracks (
        id UUID PRIMARY KEY,
        artist_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
        album_id UUID REFERENCES albums(id) ON DELETE SET NULL,
        title TEXT NOT NULL,
        genre TEXT,
        duration_seconds INTEGER NOT NULL CHECK (duration_seconds > 0),
        audio_url TEXT NOT NULL,
        cover_url TEXT,
        play_count BIGINT NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS communities (
        id UUID PRIMARY KEY,
        artist_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        description TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS community_members (
        community_id UUID NOT NULL REFERENCES communities(id) ON DELETE CASCADE,
        user_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
        joined_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (community_id, user_id)
    )",
    "CREATE TABLE IF NOT EXISTS community_posts (
        id UUID PRIMARY KEY,
        community_id UUID NOT NULL REFERENCES communities(id) ON DELETE CASCADE,
        author_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
        body TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS events (
        id UUID PRIMARY KEY,
        artist_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
        community_id UUID REFERENCES communities(id) ON DELETE SET NULL,
        title TEXT NOT NULL,
        description TEXT,
        venue TEXT NOT NULL,
        starts_at TIMESTAMPTZ NOT NULL,
        ticket_price_minor BIGINT,
        currency TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS payments (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL,
        artist_id UUID NOT NULL,
        provider TEXT NOT NULL CHECK (provider IN ('mobile_money', 'paypal')),
        purpose TEXT NOT NULL CHECK (purpose IN ('donation', 'subscription')),
        provider_reference TEXT NOT NULL,
        amount_minor BIGINT NOT NULL CHECK (amount_minor > 0),
        currency TEXT NOT NULL,
        status TEXT NOT NULL CHECK (status IN ('pending', 'completed', 'failed')),
        provider_transaction_id TEXT,
        failure_reason TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (provider, provider_reference)
    )",
    "CREATE TABLE IF NOT EXISTS donations (
        id UUID PRIMARY KEY,
        payment_id UUID NOT NULL UNIQUE REFERENCES payments(id),
        donor_id UUID NOT NULL,
        artist_id UUID NOT NULL,
        amount_minor BIGINT NOT NULL,
        currency TEXT NOT NULL,
        message TEXT,
        status TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS subscriptions (
        id UUID PRIMARY KEY,
        subscriber_id UUID NOT NULL,
        artist_id UUID NOT NULL,
        plan TEXT NOT NULL CHECK (plan IN ('monthly', 'yearly')),
        status TEXT NOT NULL,
        payment_id UUID REFERENCES payments(id),
        current_period_end TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (subscriber_id, artist_id)
    )",
    "CREATE TABLE IF NOT EXISTS revenue_transactions (
        id UUID PRIMARY KEY,
        payment_id UUID NOT NULL UNIQUE REFERENCES payments(id),
        artist_id UUID NOT NULL,
        kind TEXT NOT NULL,
        gross_minor BIGINT NOT NULL,
        platform_fee_minor BIGINT NOT NULL,
        artist_share_minor BIGINT NOT NULL,
        currency TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        CHECK (platform_fee_minor + artist_share_minor = gross_minor)
    )",
    "CREATE INDEX IF NOT EXISTS tracks_artist_idx ON tracks (artist_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS events_starts_idx ON events (starts_at)",
    "CREATE INDEX IF NOT EXISTS revenue_artist_idx ON revenue_transactions (artist_id, created_at DESC)",
];

const PAYMENT_COLUMNS: &str = "id, user_id, artist_id, provider, purpose, provider_reference, \
    amount_minor, currency, status, provider_transaction_id, failure_reason, created_at, updated_at";
const SUBSCRIPTION_COLUMNS: &str = "id, subscriber_id, artist_id, plan, status, payment_id, \
    current_period_end, created_at, updated_at";
const TRACK_COLUMNS: &str = "id, artist_id, album_id, title, genre, duration_seconds, audio_url, \
    cover_url, play_count, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and applies the schema.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        let store = Self { pool };
        store.apply_schema().await?;
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn apply_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::debug!(statements = SCHEMA.len(), "schema applied");
        Ok(())
    }
}

/// Maps unique-constraint violations to `Conflict`.
fn conflict_on_unique(err: sqlx::Error, what: &str) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some("23505") {
            return AppError::Conflict(format!("{} already exists", what));
        }
    }
    AppError::Database(err)
}

fn parse_text<T: std::str::FromStr<Err = AppError>>(row: &PgRow, column: &str) -> Result<T> {
    let raw: String = row.try_get(column)?;
    raw.parse()
}

fn profile_from_row(row: &PgRow) -> Result<Profile> {
    Ok(Profile {
        id: row.try_get("id")?,
        role: parse_text(row, "role")?,
        display_name: row.try_get("display_name")?,
        bio: row.try_get("bio")?,
        avatar_url: row.try_get("avatar_url")?,
        created_at: row.try_get("created_at")?,
    })
}

fn album_from_row(row: &PgRow) -> Result<Album> {
    Ok(Album {
        id: row.try_get("id")?,
        artist_id: row.try_get("artist_id")?,
        title: row.try_get("title")?,
        cover_url: row.try_get("cover_url")?,
        release_date: row.try_get("release_date")?,
        created_at: row.try_get("created_at")?,
    })
}

fn track_from_row(row: &PgRow) -> Result<Track> {
    Ok(Track {
        id: row.try_get("id")?,
        artist_id: row.try_get("artist_id")?,
        album_id: row.try_get("album_id")?,
        title: row.try_get("title")?,
        genre: row.try_get("genre")?,
        duration_seconds: row.try_get("duration_seconds")?,
        audio_url: row.try_get("audio_url")?,
        cover_url: row.try_get("cover_url")?,
        play_count: row.try_get("play_count")?,
        created_at: row.try_get("created_at")?,
    })
}

fn community_from_row(row: &PgRow) -> Result<Community> {
    Ok(Community {
        id: row.try_get("id")?,
        artist_id: row.try_get("artist_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
    })
}

fn post_from_row(row: &PgRow) -> Result<CommunityPost> {
    Ok(CommunityPost {
        id: row.try_get("id")?,
        community_id: row.try_get("community_id")?,
        author_id: row.try_get("author_id")?,
        body: row.try_get("body")?,
        created_at: row.try_get("created_at")?,
    })
}

fn event_from_row(row: &PgRow) -> Result<Event> {
    Ok(Event {
        id: row.try_get("id")?,
        artist_id: row.try_get("artist_id")?,
        community_id: row.try_get("community_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        venue: row.try_get("venue")?,
        starts_at: row.try_get("starts_at")?,
        ticket_price_minor: row.try_get("ticket_price_minor")?,
        currency: row.try_get("currency")?,
        created_at: row.try_get("created_at")?,
    })
}

fn payment_from_row(row: &PgRow) -> Result<Payment> {
    Ok(Payment {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        artist_id: row.try_get("artist_id")?,
        provider: parse_text(row, "provider")?,
        purpose: parse_text(row, "purpose")?,
        provider_reference: row.try_get("provider_reference")?,
        amount_minor: row.try_get("amount_minor")?,
        currency: row.try_get("currency")?,
        status: parse_text(row, "status")?,
        provider_transaction_id: row.try_get("provider_transaction_id")?,
        failure_reason: row.try_get("failure_reason")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn donation_from_row(row: &PgRow) -> Result<Donation> {
    Ok(Donation {
        id: row.try_get("id")?,
        payment_id: row.try_get("payment_id")?,
        donor_id: row.try_get("donor_id")?,
        artist_id: row.try_get("artist_id")?,
        amount_minor: row.try_get("amount_minor")?,
        currency: row.try_get("currency")?,
        message: row.try_get("message")?,
        status: parse_text(row, "status")?,
        created_at: row.try_get("created_at")?,
    })
}

fn subscription_from_row(row: &PgRow) -> Result<Subscription> {
    Ok(Subscription {
        id: row.try_get("id")?,
        subscriber_id: row.try_get("subscriber_id")?,
        artist_id: row.try_get("artist_id")?,
        plan: parse_text(row, "plan")?,
        status: parse_text(row, "status")?,
        payment_id: row.try_get("payment_id")?,
        current_period_end: row.try_get("current_period_end")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn revenue_from_row(row: &PgRow) -> Result<RevenueTransaction> {
    Ok(RevenueTransaction {
        id: row.try_get("id")?,
        payment_id: row.try_get("payment_id")?,
        artist_id: row.try_get("artist_id")?,
        kind: parse_text(row, "kind")?,
        gross_minor: row.try_get("gross_minor")?,
        platform_fee_minor: row.try_get("platform_fee_minor")?,
        artist_share_minor: row.try_get("artist_share_minor")?,
        currency: row.try_get("currency")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<Profile> {
        let row = sqlx::query(
            "INSERT INTO profiles (id, role, display_name, bio, avatar_url, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (id) DO UPDATE SET
                role = EXCLUDED.role,
                display_name = EXCLUDED.display_name,
                bio = EXCLUDED.bio,
                avatar_url = EXCLUDED.avatar_url
             RETURNING id, role, display_name, bio, avatar_url, created_at",
        )
        .bind(profile.id)
        .bind(profile.role.as_str())
        .bind(&profile.display_name)
        .bind(&profile.bio)
        .bind(&profile.avatar_url)
        .bind(profile.created_at)
        .fetch_one(&self.pool)
        .await?;
        profile_from_row(&row)
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        let row = sqlx::query(
            "SELECT id, role, display_name, bio, avatar_url, created_at FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(profile_from_row).transpose()
    }

    async fn insert_album(&self, album: &Album) -> Result<()> {
        sqlx::query(
            "INSERT INTO albums (id, artist_id, title, cover_url, release_date, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(album.id)
        .bind(album.artist_id)
        .bind(&album.title)
        .bind(&album.cover_url)
        .bind(album.release_date)
        .bind(album.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_album(&self, id: Uuid) -> Result<Option<Album>> {
        let row = sqlx::query(
            "SELECT id, artist_id, title, cover_url, release_date, created_at FROM albums WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(album_from_row).transpose()
    }

    async fn list_albums(&self, artist_id: Uuid) -> Result<Vec<Album>> {
        let rows = sqlx::query(
            "SELECT id, artist_id, title, cover_url, release_date, created_at FROM albums
             WHERE artist_id = $1 ORDER BY created_at DESC",
        )
        .bind(artist_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(album_from_row).collect()
    }

    async fn insert_track(&self, track: &Track) -> Result<()> {
        sqlx::query(
            "INSERT INTO tracks (id, artist_id, album_id, title, genre, duration_seconds,
                                 audio_url, cover_url, play_count, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(track.id)
        .bind(track.artist_id)
        .bind(track.album_id)
        .bind(&track.title)
        .bind(&track.genre)
        .bind(track.duration_seconds)
        .bind(&track.audio_url)
        .bind(&track.cover_url)
        .bind(track.play_count)
        .bind(track.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_track(&self, id: Uuid) -> Result<Option<Track>> {
        let sql = format!("SELECT {} FROM tracks WHERE id = $1", TRACK_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(track_from_row).transpose()
    }

    async fn list_tracks(&self, filter: &TrackFilter) -> Result<Vec<Track>> {
        let sql = format!(
            "SELECT {} FROM tracks
             WHERE ($1::uuid IS NULL OR artist_id = $1)
               AND ($2::uuid IS NULL OR album_id = $2)
               AND ($3::text IS NULL OR lower(genre) = lower($3))
             ORDER BY created_at DESC
             LIMIT $4::bigint",
            TRACK_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(filter.artist_id)
            .bind(filter.album_id)
            .bind(&filter.genre)
            .bind(filter.limit.map(i64::from))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(track_from_row).collect()
    }

    async fn delete_track(&self, id: Uuid) -> Result<bool> {
        let res = sqlx::query("DELETE FROM tracks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn increment_play_count(&self, id: Uuid) -> Result<Option<i64>> {
        let count: Option<i64> = sqlx::query_scalar(
            "UPDATE tracks SET play_count = play_count + 1 WHERE id = $1 RETURNING play_count",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(count)
    }

    async fn insert_community(&self, community: &Community) -> Result<()> {
        sqlx::query(
            "INSERT INTO communities (id, artist_id, name, description, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(community.id)
        .bind(community.artist_id)
        .bind(&community.name)
        .bind(&community.description)
        .bind(community.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_community(&self, id: Uuid) -> Result<Option<Community>> {
        let row = sqlx::query(
            "SELECT id, artist_id, name, description, created_at FROM communities WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(community_from_row).transpose()
    }

    async fn list_communities(&self, artist_id: Option<Uuid>) -> Result<Vec<Community>> {
        let rows = sqlx::query(
            "SELECT id, artist_id, name, description, created_at FROM communities
             WHERE ($1::uuid IS NULL OR artist_id = $1)
             ORDER BY created_at DESC",
        )
        .bind(artist_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(community_from_row).collect()
    }

    async fn add_member(&self, member: &CommunityMember) -> Result<bool> {
        let res = sqlx::query(
            "INSERT INTO community_members (community_id, user_id, joined_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (community_id, user_id) DO NOTHING",
        )
        .bind(member.community_id)
        .bind(member.user_id)
        .bind(member.joined_at)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn remove_member(&self, community_id: Uuid, user_id: Uuid) -> Result<bool> {
        let res =
            sqlx::query("DELETE FROM community_members WHERE community_id = $1 AND user_id = $2")
                .bind(community_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn is_member(&self, community_id: Uuid, user_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM community_members WHERE community_id = $1 AND user_id = $2)",
        )
        .bind(community_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn count_members(&self, community_id: Uuid) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM community_members WHERE community_id = $1")
                .bind(community_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn insert_post(&self, post: &CommunityPost) -> Result<()> {
        sqlx::query(
            "INSERT INTO community_posts (id, community_id, author_id, body, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(post.id)
        .bind(post.community_id)
        .bind(post.author_id)
        .bind(&post.body)
        .bind(post.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_posts(&self, community_id: Uuid, limit: u32) -> Result<Vec<CommunityPost>> {
        let rows = sqlx::query(
            "SELECT id, community_id, author_id, body, created_at FROM community_posts
             WHERE community_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(community_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(post_from_row).collect()
    }

    async fn insert_event(&self, event: &Event) -> Result<()> {
        sqlx::query(
            "INSERT INTO events (id, artist_id, community_id, title, description, venue,
                                 starts_at, ticket_price_minor, currency, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(event.id)
        .bind(event.artist_id)
        .bind(event.community_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.venue)
        .bind(event.starts_at)
        .bind(event.ticket_price_minor)
        .bind(&event.currency)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_events(
        &self,
        artist_id: Option<Uuid>,
        from: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            "SELECT id, artist_id, community_id, title, description, venue, starts_at,
                    ticket_price_minor, currency, created_at
             FROM events
             WHERE starts_at >= $1 AND ($2::uuid IS NULL OR artist_id = $2)
             ORDER BY starts_at ASC LIMIT $3",
        )
        .bind(from)
        .bind(artist_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(event_from_row).collect()
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<()> {
        sqlx::query(
            "INSERT INTO payments (id, user_id, artist_id, provider, purpose, provider_reference,
                                   amount_minor, currency, status, provider_transaction_id,
                                   failure_reason, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(payment.id)
        .bind(payment.user_id)
        .bind(payment.artist_id)
        .bind(payment.provider.as_str())
        .bind(payment.purpose.as_str())
        .bind(&payment.provider_reference)
        .bind(payment.amount_minor)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(&payment.provider_transaction_id)
        .bind(&payment.failure_reason)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "payment reference"))?;
        Ok(())
    }

    async fn get_payment(&self, id: Uuid) -> Result<Option<Payment>> {
        let sql = format!("SELECT {} FROM payments WHERE id = $1", PAYMENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(payment_from_row).transpose()
    }

    async fn find_payment_by_reference(
        &self,
        provider: Provider,
        reference: &str,
    ) -> Result<Option<Payment>> {
        let sql = format!(
            "SELECT {} FROM payments WHERE provider = $1 AND provider_reference = $2",
            PAYMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(provider.as_str())
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(payment_from_row).transpose()
    }

    async fn set_payment_reference(&self, id: Uuid, reference: &str) -> Result<()> {
        let res = sqlx::query(
            "UPDATE payments SET provider_reference = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(reference)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "payment reference"))?;
        if res.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("payment {}", id)));
        }
        Ok(())
    }

    async fn compare_and_set_payment_status(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        update: &PaymentUpdate,
    ) -> Result<bool> {
        let res = sqlx::query(
            "UPDATE payments SET
                status = $3,
                provider_transaction_id = COALESCE($4, provider_transaction_id),
                failure_reason = CASE WHEN $3::text = 'completed' THEN NULL
                                      ELSE COALESCE($5, failure_reason) END,
                updated_at = now()
             WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(expected.as_str())
        .bind(update.status.as_str())
        .bind(&update.provider_transaction_id)
        .bind(&update.failure_reason)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn insert_donation(&self, donation: &Donation) -> Result<()> {
        sqlx::query(
            "INSERT INTO donations (id, payment_id, donor_id, artist_id, amount_minor, currency,
                                    message, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(donation.id)
        .bind(donation.payment_id)
        .bind(donation.donor_id)
        .bind(donation.artist_id)
        .bind(donation.amount_minor)
        .bind(&donation.currency)
        .bind(&donation.message)
        .bind(donation.status.as_str())
        .bind(donation.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_donation_by_payment(&self, payment_id: Uuid) -> Result<Option<Donation>> {
        let row = sqlx::query(
            "SELECT id, payment_id, donor_id, artist_id, amount_minor, currency, message, status,
                    created_at
             FROM donations WHERE payment_id = $1",
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(donation_from_row).transpose()
    }

    async fn set_donation_status(&self, payment_id: Uuid, status: PaymentStatus) -> Result<()> {
        sqlx::query("UPDATE donations SET status = $2 WHERE payment_id = $1")
            .bind(payment_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_subscription(&self, subscription: &Subscription) -> Result<()> {
        sqlx::query(
            "INSERT INTO subscriptions (id, subscriber_id, artist_id, plan, status, payment_id,
                                        current_period_end, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(subscription.id)
        .bind(subscription.subscriber_id)
        .bind(subscription.artist_id)
        .bind(subscription.plan.as_str())
        .bind(subscription.status.as_str())
        .bind(subscription.payment_id)
        .bind(subscription.current_period_end)
        .bind(subscription.created_at)
        .bind(subscription.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "subscription"))?;
        Ok(())
    }

    async fn get_subscription(&self, id: Uuid) -> Result<Option<Subscription>> {
        let sql = format!("SELECT {} FROM subscriptions WHERE id = $1", SUBSCRIPTION_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(subscription_from_row).transpose()
    }

    async fn find_subscription(
        &self,
        subscriber_id: Uuid,
        artist_id: Uuid,
    ) -> Result<Option<Subscription>> {
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE subscriber_id = $1 AND artist_id = $2",
            SUBSCRIPTION_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(subscriber_id)
            .bind(artist_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(subscription_from_row).transpose()
    }

    async fn find_subscription_by_payment(
        &self,
        payment_id: Uuid,
    ) -> Result<Option<Subscription>> {
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE payment_id = $1",
            SUBSCRIPTION_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(subscription_from_row).transpose()
    }

    async fn list_subscriptions(&self, subscriber_id: Uuid) -> Result<Vec<Subscription>> {
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE subscriber_id = $1 ORDER BY created_at DESC",
            SUBSCRIPTION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(subscriber_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(subscription_from_row).collect()
    }

    async fn update_subscription(&self, subscription: &Subscription) -> Result<()> {
        let res = sqlx::query(
            "UPDATE subscriptions SET plan = $2, status = $3, payment_id = $4,
                current_period_end = $5, updated_at = $6
             WHERE id = $1",
        )
        .bind(subscription.id)
        .bind(subscription.plan.as_str())
        .bind(subscription.status.as_str())
        .bind(subscription.payment_id)
        .bind(subscription.current_period_end)
        .bind(subscription.updated_at)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "subscription {}",
                subscription.id
            )));
        }
        Ok(())
    }

    async fn insert_revenue_transaction(&self, txn: &RevenueTransaction) -> Result<bool> {
        let res = sqlx::query(
            "INSERT INTO revenue_transactions (id, payment_id, artist_id, kind, gross_minor,
                                               platform_fee_minor, artist_share_minor, currency,
                                               created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (payment_id) DO NOTHING",
        )
        .bind(txn.id)
        .bind(txn.payment_id)
        .bind(txn.artist_id)
        .bind(txn.kind.as_str())
        .bind(txn.gross_minor)
        .bind(txn.platform_fee_minor)
        .bind(txn.artist_share_minor)
        .bind(&txn.currency)
        .bind(txn.created_at)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn list_revenue(&self, artist_id: Uuid) -> Result<Vec<RevenueTransaction>> {
        let rows = sqlx::query(
            "SELECT id, payment_id, artist_id, kind, gross_minor, platform_fee_minor,
                    artist_share_minor, currency, created_at
             FROM revenue_transactions WHERE artist_id = $1 ORDER BY created_at DESC",
        )
        .bind(artist_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(revenue_from_row).collect()
    }

    async fn has_revenue_transaction(&self, payment_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM revenue_transactions WHERE payment_id = $1)",
        )
        .bind(payment_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
