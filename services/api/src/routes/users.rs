//! User profile and administration routes, mounted under `/api/users`

use auth::{
    AuthError, AuthUser,
    extract::{Json, Path, Query},
    middleware::{require_admin, require_auth},
    models::UpdateUser,
    validation::{
        Validator, normalize_email, validate_email, validate_full_name, validate_password,
    },
};
use axum::{
    Router,
    extract::State,
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    models::ListQuery,
};

pub fn router(state: &AppState) -> Router<AppState> {
    let admin_routes = Router::new()
        .route("/", get(list_users))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
        .route_layer(from_fn(require_admin));

    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .merge(admin_routes)
        .route_layer(from_fn_with_state(state.jwt.clone(), require_auth))
}

/// Profile changes a user may make to their own account
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

fn user_not_found() -> ApiError {
    ApiError::not_found("User")
}

// Field checks shared by the profile and admin updates
fn validate_changes(changes: &UpdateUser) -> Result<(), AuthError> {
    let mut validator = Validator::new();
    if let Some(email) = &changes.email {
        validator.check("email", validate_email(email));
    }
    if let Some(full_name) = &changes.full_name {
        validator.check("fullName", validate_full_name(full_name));
    }
    if let Some(password) = &changes.password {
        validator.check("password", validate_password(password));
    }
    validator.finish()
}

async fn ensure_email_free(state: &AppState, email: Option<&str>, user_id: Uuid) -> ApiResult<()> {
    if let Some(email) = email
        && state.users.email_exists(email, Some(user_id)).await?
    {
        return Err(ApiError::Conflict("Email already in use".to_string()));
    }
    Ok(())
}

fn user_body(message: &str, user: impl serde::Serialize) -> Value {
    json!({ "message": message, "data": user })
}

pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .users
        .find_by_id(auth.id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(user_body("User profile retrieved successfully", user)))
}

/// Update the caller's own name, email or password.
///
/// Changing the password requires the current one.
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ProfileUpdate>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .users
        .find_by_id(auth.id)
        .await?
        .ok_or_else(user_not_found)?;

    let changes = UpdateUser {
        email: payload
            .email
            .filter(|email| normalize_email(email) != normalize_email(&user.email)),
        password: payload.new_password.clone(),
        full_name: payload.full_name,
        role: None,
    };
    validate_changes(&changes)?;

    if payload.new_password.is_some() {
        let current = payload.current_password.unwrap_or_default();
        match state.users.authenticate(&user.email, &current).await {
            Ok(_) => {}
            Err(AuthError::InvalidCredentials) => {
                return Err(ApiError::BadRequest(
                    "Current password is incorrect".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }
    }
    ensure_email_free(&state, changes.email.as_deref(), user.id).await?;

    state.users.update(user.id, changes).await?;
    let updated = state
        .users
        .find_by_id(user.id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(user_body("User profile updated successfully", updated)))
}

/// Paginated list of all accounts
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = state.users.find_all(query.page_request()).await?;

    let mut body = page.into_json("users");
    if let Value::Object(map) = &mut body {
        map.insert("message".to_string(), json!("Users retrieved successfully"));
    }
    Ok(Json(body))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(user_body("User retrieved successfully", user)))
}

/// Update any account, role included
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUser>,
) -> ApiResult<impl IntoResponse> {
    validate_changes(&payload)?;
    if state.users.find_by_id(id).await?.is_none() {
        return Err(user_not_found());
    }
    ensure_email_free(&state, payload.email.as_deref(), id).await?;

    let role_change = payload.role;
    state.users.update(id, payload).await?;
    if let Some(role) = role_change {
        info!("User {} now has role {}", id, role);
    }

    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(user_body("User updated successfully", user)))
}

/// Delete an account other than the caller's own
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth: AuthUser,
) -> ApiResult<impl IntoResponse> {
    if auth.id == id {
        return Err(ApiError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    if !state.users.delete(id).await? {
        return Err(user_not_found());
    }

    info!("Admin {} deleted user {}", auth.id, id);
    Ok(Json(json!({ "message": "User deleted successfully" })))
}
