//! Event routes, mounted under `/api/event`

use auth::{
    extract::{Json, Path, Query},
    middleware::{require_admin, require_auth},
};
use axum::{
    Router,
    extract::{Multipart, State},
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;

use super::single_upload_limit;
use crate::{
    AppState,
    error::{ApiError, ApiResult},
    models::{
        LimitQuery, ListQuery,
        event::{NewEvent, UpdateEvent},
    },
    uploads::UploadKind,
};

pub fn router(state: &AppState) -> Router<AppState> {
    let admin_routes = Router::new()
        .route("/", post(create_event))
        .route("/:id", put(update_event).delete(delete_event))
        .route("/upload", post(upload_image).layer(single_upload_limit()))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.jwt.clone(), require_auth));

    Router::new()
        .route("/", get(list_events))
        .route("/upcoming", get(upcoming_events))
        .route("/:id", get(get_event))
        .merge(admin_routes)
}

/// List events with an optional `search` term
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = state
        .events
        .find_all(query.page_request(), &query.filter())
        .await?;

    Ok(Json(page.into_json("events")))
}

pub async fn upcoming_events(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<impl IntoResponse> {
    let events = state.events.find_upcoming(query.limit_or(4)).await?;
    Ok(Json(json!({ "events": events })))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let event = state
        .events
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event"))?;

    Ok(Json(event))
}

pub async fn create_event(
    State(state): State<AppState>,
    Json(payload): Json<NewEvent>,
) -> ApiResult<impl IntoResponse> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Event name is required".to_string()));
    }

    let id = state.events.create(&payload).await?;
    let event = state
        .events
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event"))?;

    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateEvent>,
) -> ApiResult<impl IntoResponse> {
    if payload.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(ApiError::BadRequest("Event name is required".to_string()));
    }

    state.events.update(id, payload).await?;
    let event = state
        .events
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event"))?;

    Ok(Json(event))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    if !state.events.delete(id).await? {
        return Err(ApiError::not_found("Event"));
    }

    Ok(Json(json!({ "message": "Event deleted successfully" })))
}

/// Store an image sent as the `image` form field
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let stored = state
        .uploads
        .save_single(UploadKind::Events, multipart, "image")
        .await?;

    Ok(Json(json!({
        "message": "File uploaded successfully",
        "imageUrl": stored.url,
    })))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{app, send, token};
    use auth::Role;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn expired_or_garbage_tokens_are_rejected() {
        let (app, _) = app();
        let (status, body) = send(
            app,
            "PUT",
            "/api/event/3",
            Some("not-a-jwt"),
            Some(json!({"name": "Harvest Fair"})),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn admins_get_past_the_gate() {
        let (app, jwt) = app();
        let admin = token(&jwt, Role::Admin);

        let (status, body) = send(
            app,
            "POST",
            "/api/event",
            Some(&admin),
            Some(json!({"name": "", "date": "2025-07-14"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Event name is required");
    }
}
