use crate::app::profiles::UpdateProfileRequest;
use crate::transport::http::auth::CurrentUser;
use crate::transport::http::types::{json_422, ok, ApiResponse, AppState};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/me",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller's profile", body = ApiResponse),
        (status = 401, description = "Missing or invalid session", body = ApiResponse),
        (status = 404, description = "Profile not created yet", body = ApiResponse)
    )
)]
pub async fn get_me_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Response {
    ok(state.services.profiles.me(user.id).await)
}

#[utoipa::path(
    put,
    path = "/api/me",
    security(("bearer" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile created or updated", body = ApiResponse),
        (status = 400, description = "Invalid field", body = ApiResponse),
        (status = 401, description = "Missing or invalid session", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn update_me_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    request: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => {
            return json_422(e, r#"{"display_name": "...", "role": "artist|listener"}"#)
                .into_response()
        }
    };
    ok(state.services.profiles.update_me(user.id, request).await)
}

#[utoipa::path(
    get,
    path = "/api/artists/{id}",
    params(("id" = Uuid, Path, description = "Artist id")),
    responses(
        (status = 200, description = "Artist profile, albums and latest tracks", body = ApiResponse),
        (status = 404, description = "No such artist", body = ApiResponse)
    )
)]
pub async fn get_artist_handler(
    State(state): State<AppState>,
    Path(artist_id): Path<Uuid>,
) -> Response {
    ok(state.services.profiles.artist(artist_id).await)
}
