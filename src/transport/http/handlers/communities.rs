use crate::app::communities::{
    CreateCommunityRequest, CreateEventRequest, CreatePostRequest, ListQuery,
};
use crate::transport::http::auth::CurrentUser;
use crate::transport::http::types::{
    created, json_422, ok, query_400, ApiResponse, AppState, PageQuery,
};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/communities",
    security(("bearer" = [])),
    request_body = CreateCommunityRequest,
    responses(
        (status = 201, description = "Community created", body = ApiResponse),
        (status = 403, description = "Caller is not an artist", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn create_community_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    request: Result<Json<CreateCommunityRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return json_422(e, r#"{"name": "...", "description": "..."}"#).into_response(),
    };
    created(
        state
            .services
            .communities
            .create_community(user.id, request)
            .await,
    )
}

#[utoipa::path(
    get,
    path = "/api/communities",
    params(ListQuery),
    responses(
        (status = 200, description = "Communities, optionally of one artist", body = ApiResponse)
    )
)]
pub async fn list_communities_handler(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return query_400(e),
    };
    ok(state
        .services
        .communities
        .list_communities(query.artist_id)
        .await)
}

#[utoipa::path(
    get,
    path = "/api/communities/{id}",
    params(("id" = Uuid, Path, description = "Community id")),
    responses(
        (status = 200, description = "Community with member count", body = ApiResponse),
        (status = 404, description = "No such community", body = ApiResponse)
    )
)]
pub async fn get_community_handler(
    State(state): State<AppState>,
    Path(community_id): Path<Uuid>,
) -> Response {
    ok(state.services.communities.get_community(community_id).await)
}

#[utoipa::path(
    post,
    path = "/api/communities/{id}/join",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Community id")),
    responses(
        (status = 200, description = "Caller is a member", body = ApiResponse),
        (status = 403, description = "Caller has no profile", body = ApiResponse),
        (status = 404, description = "No such community", body = ApiResponse)
    )
)]
pub async fn join_community_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(community_id): Path<Uuid>,
) -> Response {
    ok(state.services.communities.join(user.id, community_id).await)
}

#[utoipa::path(
    post,
    path = "/api/communities/{id}/leave",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Community id")),
    responses(
        (status = 200, description = "Caller is no longer a member", body = ApiResponse),
        (status = 400, description = "The owner cannot leave", body = ApiResponse),
        (status = 404, description = "No such community", body = ApiResponse)
    )
)]
pub async fn leave_community_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(community_id): Path<Uuid>,
) -> Response {
    ok(state.services.communities.leave(user.id, community_id).await)
}

#[utoipa::path(
    get,
    path = "/api/communities/{id}/posts",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Community id"), PageQuery),
    responses(
        (status = 200, description = "Posts, newest first", body = ApiResponse),
        (status = 403, description = "Caller is not a member", body = ApiResponse),
        (status = 404, description = "No such community", body = ApiResponse)
    )
)]
pub async fn list_posts_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(community_id): Path<Uuid>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return query_400(e),
    };
    ok(state
        .services
        .communities
        .list_posts(user.id, community_id, query.limit)
        .await)
}

#[utoipa::path(
    post,
    path = "/api/communities/{id}/posts",
    security(("bearer" = [])),
    params(("id" = Uuid, Path, description = "Community id")),
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = ApiResponse),
        (status = 403, description = "Caller is not a member", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn create_post_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(community_id): Path<Uuid>,
    request: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return json_422(e, r#"{"body": "..."}"#).into_response(),
    };
    created(
        state
            .services
            .communities
            .create_post(user.id, community_id, request)
            .await,
    )
}

#[utoipa::path(
    post,
    path = "/api/events",
    security(("bearer" = [])),
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = ApiResponse),
        (status = 400, description = "Event in the past or bad ticket price", body = ApiResponse),
        (status = 403, description = "Caller is not an artist or does not own the community", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse)
    )
)]
pub async fn create_event_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    request: Result<Json<CreateEventRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => {
            return json_422(
                e,
                r#"{"title": "...", "venue": "...", "starts_at": "2030-01-01T20:00:00Z"}"#,
            )
            .into_response()
        }
    };
    created(state.services.communities.create_event(user.id, request).await)
}

#[utoipa::path(
    get,
    path = "/api/events",
    params(ListQuery),
    responses(
        (status = 200, description = "Upcoming events, soonest first", body = ApiResponse),
        (status = 400, description = "Invalid limit", body = ApiResponse)
    )
)]
pub async fn list_events_handler(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return query_400(e),
    };
    ok(state.services.communities.upcoming_events(query).await)
}
