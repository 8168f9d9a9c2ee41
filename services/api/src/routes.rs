//! API service routes
//!
//! Every resource module exposes `router(&AppState)`; public reads are plain
//! routes, writes sit behind `require_auth` (and `require_admin` where only
//! administrators may write).

use auth::{
    extract::{Json, Path},
    routes::AuthState,
};
use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use serde_json::json;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    uploads::{self, MAX_FILE_SIZE, MAX_FILES},
};

pub mod business;
pub mod event;
pub mod forum;
pub mod tourism;
pub mod users;

/// Request body limit for single-image uploads
pub(crate) fn single_upload_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(MAX_FILE_SIZE + 64 * 1024)
}

/// Request body limit for gallery uploads
pub(crate) fn gallery_upload_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(MAX_FILES * MAX_FILE_SIZE + 256 * 1024)
}

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let auth_state = AuthState {
        users: state.users.clone(),
        jwt: state.jwt.clone(),
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/uploads/:kind/:file", get(serve_upload))
        .nest("/api/users", users::router(&state))
        .nest("/api/business", business::router(&state))
        .nest("/api/event", event::router(&state))
        .nest("/api/tourism", tourism::router(&state))
        .nest("/api/forum", forum::router(&state))
        .with_state(state)
        .nest("/api/auth", auth::routes::create_router(auth_state))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool)
        .await
        .unwrap_or(false);

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if database { "ok" } else { "degraded" },
            "service": "api-service",
            "database": if database { "up" } else { "down" },
        })),
    )
}

/// Serve a stored upload
pub async fn serve_upload(
    State(state): State<AppState>,
    Path((kind, file)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let bytes = state
        .uploads
        .read(&kind, &file)
        .await
        .ok_or_else(|| ApiError::not_found("File"))?;

    Ok(([(header::CONTENT_TYPE, uploads::content_type(&file))], bytes))
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Router fixtures: a lazily connected pool that is never reached, plus
    //! tokens for each role.

    use auth::{JwtConfig, JwtService, Role, User};
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use chrono::Utc;
    use common::database::{DatabaseConfig, lazy_pool};
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{AppState, uploads::UploadStore};

    pub fn app() -> (Router, JwtService) {
        let jwt = JwtService::new(JwtConfig::new("router-test-secret"));
        let pool = lazy_pool(&DatabaseConfig {
            database_url: "postgres://nobody@127.0.0.1:1/none".to_string(),
            max_connections: 1,
            min_connections: 0,
            connection_timeout: 1,
        })
        .unwrap();
        let uploads = UploadStore::new(std::env::temp_dir(), "http://localhost:3000");

        let state = AppState::new(pool, jwt.clone(), uploads);
        (super::create_router(state), jwt)
    }

    pub fn token(jwt: &JwtService, role: Role) -> String {
        let user = User {
            id: Uuid::new_v4(),
            email: "carol@test.com".to_string(),
            password_hash: String::new(),
            full_name: "Carol".to_string(),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        jwt.issue_access_token(&user).unwrap()
    }

    pub async fn send(
        app: Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{app, send};
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_reports_a_missing_database() {
        let (app, _) = app();
        let (status, body) = send(app, "GET", "/health", None, None).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["database"], "down");
    }

    #[tokio::test]
    async fn auth_routes_are_mounted() {
        let (app, _) = app();
        let (status, body) = send(app, "GET", "/api/auth/me", None, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentication required. No token provided.");
    }

    #[tokio::test]
    async fn non_numeric_ids_get_a_json_error() {
        let (app, _) = app();
        let (status, body) = send(app, "GET", "/api/business/abc", None, None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().is_some_and(|e| e.contains("abc")));
    }

    #[tokio::test]
    async fn malformed_login_bodies_get_a_json_error() {
        let (app, _) = app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
    }

    #[tokio::test]
    async fn uploads_outside_known_kinds_are_not_served() {
        let (app, _) = app();
        let (status, _) = send(app, "GET", "/uploads/secrets/passwd", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
