//! Community forum routes, mounted under `/api/forum`
//!
//! Reading is open to everyone. Any signed-in user may open threads and reply;
//! editing and deleting is limited to the author or an administrator.
//! Categories are managed by administrators under `/admin`.

use auth::{
    AuthError, AuthUser,
    extract::{Json, Path, Query},
    middleware::{authorize_owner, optional_auth, require_admin, require_auth},
};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    models::{
        LimitQuery, ListQuery,
        forum::{
            NewForumCategory, NewForumPost, NewForumThread, NewPostRequest, NewThreadRequest,
            ThreadSort, ThreadWithPosts, UpdateForumCategory, UpdateForumPost, UpdateForumThread,
        },
    },
};

pub fn router(state: &AppState) -> Router<AppState> {
    let viewer_routes = Router::new()
        .route("/threads/:id", get(get_thread))
        .route_layer(from_fn_with_state(state.jwt.clone(), optional_auth));

    let member_routes = Router::new()
        .route("/categories/:id/threads", post(create_thread))
        .route("/threads/:id/posts", post(create_post))
        .route("/threads/:id", put(update_thread).delete(delete_thread))
        .route("/posts/:id", put(update_post).delete(delete_post))
        .route_layer(from_fn_with_state(state.jwt.clone(), require_auth));

    let admin_routes = Router::new()
        .route("/admin/categories", post(create_category))
        .route(
            "/admin/categories/:id",
            put(update_category).delete(delete_category),
        )
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.jwt.clone(), require_auth));

    Router::new()
        .route("/categories", get(list_categories))
        .route("/categories/:id", get(get_category))
        .route("/categories/:id/threads", get(list_threads))
        .route("/threads/recent", get(recent_threads))
        .route("/threads/search", get(search_threads))
        .route("/stats", get(forum_stats))
        .merge(viewer_routes)
        .merge(member_routes)
        .merge(admin_routes)
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: String,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

// The owner gate reports a missing resource generically; name it instead.
fn owner_gate(result: Result<(), AuthError>, what: &str) -> ApiResult<()> {
    result.map_err(|e| match e {
        AuthError::NotFound(_) => ApiError::not_found(what),
        other => other.into(),
    })
}

fn require_text(value: Option<&str>, message: &str) -> ApiResult<()> {
    if value.is_some_and(|v| v.trim().is_empty()) {
        return Err(ApiError::BadRequest(message.to_string()));
    }
    Ok(())
}

/// All categories with their thread counts
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let categories = state.forum_categories.find_all().await?;
    Ok(Json(categories))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let category = state
        .forum_categories
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category"))?;

    Ok(Json(category))
}

/// Threads of a category; `sort=popular` orders by reply count
pub async fn list_threads(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    if state.forum_categories.find_by_id(id).await?.is_none() {
        return Err(ApiError::not_found("Category"));
    }

    let sort = ThreadSort::parse(query.sort.as_deref());
    let page = state
        .forum_threads
        .find_by_category(id, query.page_request(), sort)
        .await?;

    Ok(Json(page.into_json("threads")))
}

pub async fn recent_threads(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<impl IntoResponse> {
    let threads = state.forum_threads.find_recent(query.limit_or(5)).await?;
    Ok(Json(threads))
}

pub async fn search_threads(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<impl IntoResponse> {
    if query.search.trim().is_empty() {
        return Err(ApiError::BadRequest("Search term is required".to_string()));
    }

    let page = common::pagination::PageRequest::new(query.page, query.limit);
    let threads = state
        .forum_threads
        .search(query.search.trim(), page)
        .await?;

    Ok(Json(threads.into_json("threads")))
}

pub async fn forum_stats(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.forum_threads.stats().await?))
}

/// A thread with its replies; signed-in callers learn whether they may edit it
pub async fn get_thread(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    viewer: Option<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let thread = state
        .forum_threads
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Thread with ID {id} not found")))?;
    let posts = state.forum_posts.find_by_thread(id).await?;

    let can_edit = viewer
        .as_ref()
        .is_some_and(|user| user.is_admin() || user.id == thread.thread.user_id);

    Ok(Json(ThreadWithPosts {
        thread,
        posts,
        can_edit,
    }))
}

pub async fn create_thread(
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
    user: AuthUser,
    Json(payload): Json<NewThreadRequest>,
) -> ApiResult<impl IntoResponse> {
    if payload.title.trim().is_empty() || payload.content.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Title and content are required".to_string(),
        ));
    }

    let created = state
        .forum_threads
        .create(&NewForumThread {
            title: payload.title,
            content: payload.content,
            user_id: user.id,
            category_id,
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Category"))?;
    let thread = state
        .forum_threads
        .find_by_id(created.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Thread"))?;

    Ok((StatusCode::CREATED, Json(thread)))
}

pub async fn create_post(
    State(state): State<AppState>,
    Path(thread_id): Path<i64>,
    user: AuthUser,
    Json(payload): Json<NewPostRequest>,
) -> ApiResult<impl IntoResponse> {
    if payload.content.trim().is_empty() {
        return Err(ApiError::BadRequest("Content is required".to_string()));
    }

    let post = state
        .forum_posts
        .create(&NewForumPost {
            content: payload.content,
            user_id: user.id,
            thread_id,
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Thread"))?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_thread(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: AuthUser,
    Json(payload): Json<UpdateForumThread>,
) -> ApiResult<impl IntoResponse> {
    owner_gate(
        authorize_owner(&user, || state.forum_threads.owner_id(id)).await,
        "Thread",
    )?;
    require_text(payload.title.as_deref(), "Title cannot be empty")?;
    require_text(payload.content.as_deref(), "Content cannot be empty")?;

    state.forum_threads.update(id, payload).await?;
    let thread = state
        .forum_threads
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Thread"))?;

    Ok(Json(thread))
}

pub async fn delete_thread(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    owner_gate(
        authorize_owner(&user, || state.forum_threads.owner_id(id)).await,
        "Thread",
    )?;

    if !state.forum_threads.delete(id).await? {
        return Err(ApiError::not_found("Thread"));
    }

    info!("User {} deleted thread {}", user.id, id);
    Ok(Json(json!({ "message": "Thread deleted successfully" })))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: AuthUser,
    Json(payload): Json<UpdateForumPost>,
) -> ApiResult<impl IntoResponse> {
    owner_gate(
        authorize_owner(&user, || state.forum_posts.owner_id(id)).await,
        "Post",
    )?;
    require_text(payload.content.as_deref(), "Content cannot be empty")?;

    state.forum_posts.update(id, payload).await?;
    let post = state
        .forum_posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Post"))?;

    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    owner_gate(
        authorize_owner(&user, || state.forum_posts.owner_id(id)).await,
        "Post",
    )?;

    if !state.forum_posts.delete(id).await? {
        return Err(ApiError::not_found("Post"));
    }

    info!("User {} deleted post {}", user.id, id);
    Ok(Json(json!({ "message": "Post deleted successfully" })))
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<NewForumCategory>,
) -> ApiResult<impl IntoResponse> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Category name is required".to_string()));
    }

    let id = state.forum_categories.create(&payload).await?;
    let category = state
        .forum_categories
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category"))?;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateForumCategory>,
) -> ApiResult<impl IntoResponse> {
    require_text(payload.name.as_deref(), "Category name is required")?;

    state.forum_categories.update(id, payload).await?;
    let category = state
        .forum_categories
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category"))?;

    Ok(Json(category))
}

/// Delete an empty category; categories holding threads are refused
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    if !state.forum_categories.delete(id).await? {
        return Err(ApiError::not_found("Category"));
    }

    Ok(Json(json!({ "message": "Category deleted successfully" })))
}
