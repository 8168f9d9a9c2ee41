//! Tourism destination and gallery routes, mounted under `/api/tourism`

use std::collections::BTreeSet;

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
use tracing::info;

use super::{gallery_upload_limit, single_upload_limit};
use crate::{
    AppState,
    error::{ApiError, ApiResult},
    models::{
        LimitQuery, ListQuery,
        tourism::{
            NewTourismDestination, NewTourismImage, UpdateTourismDestination, UpdateTourismImage,
        },
    },
    uploads::{MAX_FILES, UploadKind},
};

pub fn router(state: &AppState) -> Router<AppState> {
    let admin_routes = Router::new()
        .route("/", post(create_destination))
        .route("/:id", put(update_destination).delete(delete_destination))
        .route("/upload", post(upload_image).layer(single_upload_limit()))
        .route("/:id/images", post(upload_gallery).layer(gallery_upload_limit()))
        .route("/images/:image_id/primary", put(set_primary_image))
        .route("/images/:image_id", put(update_image).delete(delete_image))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.jwt.clone(), require_auth));

    Router::new()
        .route("/", get(list_destinations))
        .route("/featured", get(featured_destinations))
        .route("/:id", get(get_destination))
        .route("/:id/images", get(get_destination_with_images))
        .merge(admin_routes)
}

fn destination_not_found() -> ApiError {
    ApiError::not_found("Tourism destination")
}

fn image_not_found() -> ApiError {
    ApiError::not_found("Image")
}

/// List destinations with optional `category` and `search` filters
pub async fn list_destinations(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = state
        .tourism
        .find_all(query.page_request(), &query.filter())
        .await?;

    Ok(Json(page.into_json("destinations")))
}

pub async fn featured_destinations(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<impl IntoResponse> {
    let destinations = state.tourism.find_featured(query.limit_or(5)).await?;
    Ok(Json(json!({ "destinations": destinations })))
}

pub async fn get_destination(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let destination = state
        .tourism
        .find_by_id(id)
        .await?
        .ok_or_else(destination_not_found)?;

    Ok(Json(destination))
}

/// Destination with its gallery, primary image first
pub async fn get_destination_with_images(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let destination = state
        .tourism
        .find_by_id_with_images(id)
        .await?
        .ok_or_else(destination_not_found)?;

    Ok(Json(destination))
}

pub async fn create_destination(
    State(state): State<AppState>,
    Json(payload): Json<NewTourismDestination>,
) -> ApiResult<impl IntoResponse> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Name is required".to_string()));
    }

    let id = state.tourism.create(&payload).await?;
    let destination = state
        .tourism
        .find_by_id(id)
        .await?
        .ok_or_else(destination_not_found)?;

    Ok((StatusCode::CREATED, Json(destination)))
}

pub async fn update_destination(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTourismDestination>,
) -> ApiResult<impl IntoResponse> {
    if payload.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(ApiError::BadRequest("Name is required".to_string()));
    }
    // The cover mirrors the primary image, so it can only be replaced here
    if payload.image_url.as_deref().is_some_and(|url| url.trim().is_empty()) {
        return Err(ApiError::BadRequest(
            "Image URL cannot be empty; delete the gallery images to remove the cover".to_string(),
        ));
    }

    state.tourism.update(id, payload).await?;
    let destination = state
        .tourism
        .find_by_id(id)
        .await?
        .ok_or_else(destination_not_found)?;

    Ok(Json(destination))
}

/// Delete a destination with its gallery, then remove the uploaded files
pub async fn delete_destination(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let images = state.tourism_images.find_by_tourism(id).await?;
    let destination = state
        .tourism
        .delete(id)
        .await?
        .ok_or_else(destination_not_found)?;

    let urls: BTreeSet<String> = images
        .into_iter()
        .map(|image| image.image_url)
        .chain(std::iter::once(destination.image_url))
        .filter(|url| !url.is_empty())
        .collect();
    for url in &urls {
        state.uploads.remove(url).await;
    }

    Ok(Json(json!({ "message": "Tourism destination deleted successfully" })))
}

/// Store an image sent as the `image` form field
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let stored = state
        .uploads
        .save_single(UploadKind::Tourism, multipart, "image")
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "File uploaded successfully",
            "imageUrl": stored.url,
        })),
    ))
}

/// Add up to ten images, sent as `images` form fields, to a destination's gallery
pub async fn upload_gallery(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    if state.tourism.find_by_id(id).await?.is_none() {
        return Err(destination_not_found());
    }

    let stored = state
        .uploads
        .save_multipart(UploadKind::Tourism, multipart, "images", MAX_FILES)
        .await?;
    if stored.is_empty() {
        return Err(ApiError::BadRequest("No image files provided".to_string()));
    }

    let mut images = Vec::with_capacity(stored.len());
    for (index, file) in stored.iter().enumerate() {
        let created = state
            .tourism_images
            .create(NewTourismImage {
                tourism_id: id,
                image_url: file.url.clone(),
                ..Default::default()
            })
            .await;

        match created {
            Ok(Some(image)) => images.push(image),
            outcome => {
                for orphan in &stored[index..] {
                    state.uploads.remove(&orphan.url).await;
                }
                return Err(match outcome {
                    Err(e) => e.into(),
                    _ => destination_not_found(),
                });
            }
        }
    }

    info!("Uploaded {} images for tourism destination {}", images.len(), id);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("{} images uploaded successfully", images.len()),
            "images": images,
        })),
    ))
}

pub async fn set_primary_image(
    State(state): State<AppState>,
    Path(image_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let image = state
        .tourism_images
        .set_primary(image_id)
        .await?
        .ok_or_else(image_not_found)?;
    let all_images = state.tourism_images.find_by_tourism(image.tourism_id).await?;

    Ok(Json(json!({
        "message": "Image set as primary successfully",
        "image": image,
        "allImages": all_images,
    })))
}

/// Update caption, display order or primary flag of one image
pub async fn update_image(
    State(state): State<AppState>,
    Path(image_id): Path<i64>,
    Json(payload): Json<UpdateTourismImage>,
) -> ApiResult<impl IntoResponse> {
    state.tourism_images.update(image_id, payload).await?;
    let image = state
        .tourism_images
        .find_by_id(image_id)
        .await?
        .ok_or_else(image_not_found)?;

    Ok(Json(json!({
        "message": "Image updated successfully",
        "image": image,
    })))
}

pub async fn delete_image(
    State(state): State<AppState>,
    Path(image_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let deleted = state
        .tourism_images
        .delete(image_id)
        .await?
        .ok_or_else(image_not_found)?;
    state.uploads.remove(&deleted.image_url).await;

    let images = state.tourism_images.find_by_tourism(deleted.tourism_id).await?;

    Ok(Json(json!({
        "message": "Image deleted successfully",
        "images": images,
    })))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{app, send, token};
    use auth::Role;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn gallery_writes_are_admin_only() {
        let (app, jwt) = app();
        let user = token(&jwt, Role::User);

        let (status, _) = send(
            app.clone(),
            "PUT",
            "/api/tourism/images/4/primary",
            Some(&user),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(app, "DELETE", "/api/tourism/images/4", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_requires_a_name() {
        let (app, jwt) = app();
        let admin = token(&jwt, Role::Admin);

        let (status, body) = send(
            app,
            "POST",
            "/api/tourism",
            Some(&admin),
            Some(json!({"location": "North shore"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Name is required");
    }

    #[tokio::test]
    async fn update_rejects_a_blank_cover() {
        let (app, jwt) = app();
        let admin = token(&jwt, Role::Admin);

        for image_url in ["", "   "] {
            let (status, body) = send(
                app.clone(),
                "PUT",
                "/api/tourism/1",
                Some(&admin),
                Some(json!({"name": "Lake X", "image_url": image_url})),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].as_str().unwrap().starts_with("Image URL cannot be empty"));
        }
    }
}
