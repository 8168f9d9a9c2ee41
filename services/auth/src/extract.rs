//! Request extractors whose rejections use the JSON error body
//!
//! Drop-in replacements for axum's `Json`, `Path` and `Query`. A malformed
//! body, path segment or query string becomes `AuthError::BadRequest`
//! (400 `{"error": ...}`) instead of axum's plain-text 400/415/422.

use axum::{
    async_trait,
    extract::{
        FromRequest, FromRequestParts, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::debug;

use crate::error::AuthError;

/// JSON request body, also usable as a JSON response
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

/// Typed path parameters
#[derive(Debug)]
pub struct Path<T>(pub T);

/// Typed query string
#[derive(Debug)]
pub struct Query<T>(pub T);

fn bad_request(kind: &str, message: String) -> AuthError {
    debug!("Rejected malformed {}: {}", kind, message);
    AuthError::BadRequest(message)
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match &rejection {
            JsonRejection::MissingJsonContentType(_) => {
                "Expected a JSON body with Content-Type: application/json".to_string()
            }
            _ => rejection.body_text(),
        };
        bad_request("body", message)
    }
}

impl From<PathRejection> for AuthError {
    fn from(rejection: PathRejection) -> Self {
        bad_request("path", rejection.body_text())
    }
}

impl From<QueryRejection> for AuthError {
    fn from(rejection: QueryRejection) -> Self {
        bad_request("query", rejection.body_text())
    }
}

#[async_trait]
impl<T, S> FromRequest<S> for Json<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
        Ok(Json(value))
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for Path<T>
where
    axum::extract::Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Path(value) =
            axum::extract::Path::<T>::from_request_parts(parts, state).await?;
        Ok(Path(value))
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for Query<T>
where
    axum::extract::Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Query(value) =
            axum::extract::Query::<T>::from_request_parts(parts, state).await?;
        Ok(Query(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{StatusCode, header},
        routing::{get as route_get, post},
    };
    use serde::Deserialize;
    use serde_json::Value;
    use tower::ServiceExt;

    #[derive(Deserialize)]
    struct Login {
        email: String,
    }

    #[derive(Deserialize)]
    struct Paging {
        page: u32,
    }

    async fn echo_email(Json(login): Json<Login>) -> String {
        login.email
    }

    async fn echo_id(Path(id): Path<i64>) -> String {
        id.to_string()
    }

    async fn echo_page(Query(paging): Query<Paging>) -> String {
        paging.page.to_string()
    }

    fn app() -> Router {
        Router::new()
            .route("/login", post(echo_email))
            .route("/items/:id", route_get(echo_id))
            .route("/items", route_get(echo_page))
    }

    async fn call(request: axum::http::Request<Body>) -> (StatusCode, Option<String>, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (
            status,
            content_type,
            serde_json::from_slice(&bytes).unwrap_or(Value::Null),
        )
    }

    fn post_login(content_type: Option<&str>, body: &str) -> axum::http::Request<Body> {
        let mut request = axum::http::Request::builder().method("POST").uri("/login");
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        request.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn malformed_json_is_a_json_bad_request() {
        let (status, content_type, body) =
            call(post_login(Some("application/json"), "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn missing_content_type_is_a_bad_request() {
        let (status, _, body) = call(post_login(None, r#"{"email":"a@b.co"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Expected a JSON body with Content-Type: application/json"
        );
    }

    #[tokio::test]
    async fn wrongly_typed_fields_are_a_bad_request() {
        let (status, _, body) = call(post_login(Some("application/json"), r#"{"email":5}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn well_formed_json_passes_through() {
        let request = post_login(Some("application/json"), r#"{"email":"a@b.co"}"#);
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn non_numeric_ids_are_a_bad_request() {
        let (status, content_type, body) = call(get("/items/abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert!(body["error"].as_str().unwrap().contains("abc"));
    }

    #[tokio::test]
    async fn bad_query_strings_are_a_bad_request() {
        let (status, _, body) = call(get("/items?page=first")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}
