use crate::app::catalog::{CreateAlbumRequest, CreateTrackRequest, SignUploadRequest, TrackQuery};
use crate::transport::http::auth::CurrentUser;
use crate::transport::http::types::{created, json_422, ok, query_400, ApiResponse, AppState};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/albums",
    security(("bearer" = [])),
    request_body = CreateAlbumRequest,
    responses(
        (status = 201, description = "Album created", body = ApiResponse),
        (status = 403, description = "Caller is not an artist", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn create_album_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    request: Result<Json<CreateAlbumRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return json_422(e, r#"{"title": "..."}"#).into_response(),
    };
    created(state.services.catalog.create_album(user.id, request).await)
}

#[utoipa::path(
    get,
    path = "/api/albums/{id}",
    params(("id" = Uuid, Path, description = "Album id")),
    responses(
        (status = 200, description = "Album with its tracks", body = ApiResponse),
        (status = 404, description = "No such album", body = ApiResponse)
    )
)]
pub async fn get_album_handler(
    State(state): State<AppState>,
    Path(album_id): Path<Uuid>,
) -> Response {
    ok(state.services.catalog.album(album_id).await)
}

#[utoipa::path(
    post,
    path = "/api/tracks",
    security(("bearer" = [])),
    request_body = CreateTrackRequest,
    responses(
        (status = 201, description = "Track created", body = ApiResponse),
        (status = 400, description = "Invalid field or media URL", body = ApiResponse),
        (status = 403, description = "Caller is not an artist, or album belongs to someone else", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn create_track_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    request: Result<Json<CreateTrackRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => {
            return json_422(
                e,
                r#"{"title": "...", "duration_seconds": 180, "audio_url": "https://..."}"#,
            )
            .into_response()
        }
    };
    created(state.services.catalog.create_track(user.id, request).await)
}

#[utoipa::path(
    get,
    path = "/api/tracks",
    params(TrackQuery),
    responses(
        (status = 200, description = "Tracks, newest first", body = ApiResponse),
        (status = 400, description = "Invalid filter or limit", body = ApiResponse)
    )
)]
pub async fn list_tracks_handler(
    State(state): State<AppState>,
    query: Result<Query<TrackQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return query_400(e),
    };
    ok(state.services.catalog.list_tracks(query).await)
}

#[utoipa::path(
    get,
    path = "/api/tracks/{id}",
    params(("id" = Uuid, Path, description = "Track id")),
    responses(
        (status = 200, description = "Track", body = ApiResponse),
        (status = 404, description = "No such track", body = ApiResponse)
    )
)]
pub async fn get_track_handler(
    State(state): State<AppState>,
    Path(track_id): Path<Uuid>,
) -> Response {
    ok(state.services.catalog.track(track_id).await)
}

#[utoipa::path(
    delete,
    path = "/api/tracks/{id}",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Track id")),
    responses(
        (status = 200, description = "Track deleted", body = ApiResponse),
        (status = 403, description = "Caller does not own the track", body = ApiResponse),
        (status = 404, description = "No such track", body = ApiResponse)
    )
)]
pub async fn delete_track_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(track_id): Path<Uuid>,
) -> Response {
    let result = state.services.catalog.delete_track(user.id, track_id).await;
    ok(result.map(|()| serde_json::json!({ "deleted": track_id })))
}

#[utoipa::path(
    post,
    path = "/api/tracks/{id}/play",
    params(("id" = Uuid, Path, description = "Track id")),
    responses(
        (status = 200, description = "Play recorded", body = ApiResponse),
        (status = 404, description = "No such track", body = ApiResponse)
    )
)]
pub async fn play_track_handler(
    State(state): State<AppState>,
    Path(track_id): Path<Uuid>,
) -> Response {
    ok(state.services.catalog.record_play(track_id).await)
}

#[utoipa::path(
    post,
    path = "/api/uploads/sign",
    security(("bearer" = [])),
    request_body = SignUploadRequest,
    responses(
        (status = 200, description = "Signed direct-upload parameters", body = ApiResponse),
        (status = 403, description = "Only artists upload audio and covers", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse),
        (status = 503, description = "Media CDN not configured", body = ApiResponse)
    )
)]
pub async fn sign_upload_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    request: Result<Json<SignUploadRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return json_422(e, r#"{"kind": "audio|cover|avatar"}"#).into_response(),
    };
    ok(state.services.catalog.sign_upload(user.id, request.kind).await)
}
