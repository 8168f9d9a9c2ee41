//! Business directory routes, mounted under `/api/business`

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
        business::{NewBusiness, UpdateBusiness},
    },
    uploads::UploadKind,
};

pub fn router(state: &AppState) -> Router<AppState> {
    let admin_routes = Router::new()
        .route("/", post(create_business))
        .route("/:id", put(update_business).delete(delete_business))
        .route("/upload", post(upload_image).layer(single_upload_limit()))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.jwt.clone(), require_auth));

    Router::new()
        .route("/", get(list_businesses))
        .route("/featured", get(featured_businesses))
        .route("/:id", get(get_business))
        .merge(admin_routes)
}

/// List businesses with optional `category` and `search` filters
pub async fn list_businesses(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = state
        .businesses
        .find_all(query.page_request(), &query.filter())
        .await?;

    Ok(Json(page.into_json("businesses")))
}

pub async fn featured_businesses(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<impl IntoResponse> {
    let businesses = state.businesses.find_featured(query.limit_or(3)).await?;
    Ok(Json(json!({ "businesses": businesses })))
}

pub async fn get_business(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let business = state
        .businesses
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Business"))?;

    Ok(Json(business))
}

pub async fn create_business(
    State(state): State<AppState>,
    Json(payload): Json<NewBusiness>,
) -> ApiResult<impl IntoResponse> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Business name is required".to_string()));
    }

    let id = state.businesses.create(&payload).await?;
    let business = state
        .businesses
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Business"))?;

    Ok((StatusCode::CREATED, Json(business)))
}

pub async fn update_business(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateBusiness>,
) -> ApiResult<impl IntoResponse> {
    if payload.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(ApiError::BadRequest("Business name is required".to_string()));
    }

    state.businesses.update(id, payload).await?;
    let business = state
        .businesses
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Business"))?;

    Ok(Json(business))
}

pub async fn delete_business(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    if !state.businesses.delete(id).await? {
        return Err(ApiError::not_found("Business"));
    }

    Ok(Json(json!({ "message": "Business deleted successfully" })))
}

/// Store an image sent as the `image` form field
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let stored = state
        .uploads
        .save_single(UploadKind::Business, multipart, "image")
        .await?;

    Ok(Json(json!({
        "message": "File uploaded successfully",
        "imageUrl": stored.url,
    })))
}
