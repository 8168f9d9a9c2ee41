//! Authorization guard: bearer token middleware and access gates
//!
//! Routes are layered as
//!
//! ```text
//! require_auth  ->  require_admin (optional)  ->  handler (authorize_owner)
//! ```
//!
//! `require_auth` turns a bearer token into an [`AuthUser`] stored in the
//! request extensions; handlers pick it up through the extractor.
//! `optional_auth` does the same but lets anonymous requests through.

use std::future::Future;

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    error::AuthError,
    jwt::{Claims, JwtService, TokenType},
    models::Role,
};

/// Identity attached to an authenticated request
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: Role,
    pub full_name: Option<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role(),
            email: claims.email,
            full_name: claims.full_name,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}

/// Pull the bearer token out of the `Authorization` header
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

/// Verify an access token and build the request identity
pub fn authenticate(jwt: &JwtService, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::Unauthenticated)?;
    let claims = jwt.verify_as(&token, TokenType::Access)?;
    Ok(AuthUser::from(claims))
}

/// Reject requests without a valid access token
pub async fn require_auth(
    State(jwt): State<JwtService>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let user = authenticate(&jwt, req.headers()).inspect_err(|e| {
        warn!("Rejected request to {}: {}", req.uri().path(), e);
    })?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Attach an identity when a valid token is present, otherwise continue anonymously
pub async fn optional_auth(
    State(jwt): State<JwtService>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match authenticate(&jwt, req.headers()) {
        Ok(user) => {
            req.extensions_mut().insert(user);
        }
        Err(e) => debug!("Continuing anonymously: {}", e),
    }

    next.run(req).await
}

/// Gate for admin-only routes; must run after `require_auth`
pub async fn require_admin(req: Request<Body>, next: Next) -> Result<Response, AuthError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::Unauthenticated)?;

    authorize_roles(user, &[Role::Admin])?;
    Ok(next.run(req).await)
}

/// Fail with `Forbidden` unless the caller holds one of `allowed`
pub fn authorize_roles(user: &AuthUser, allowed: &[Role]) -> Result<(), AuthError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        warn!("User {} with role {} denied", user.id, user.role);
        Err(AuthError::Forbidden)
    }
}

/// Admins always pass. Everyone else must own the resource: `lookup` resolves
/// the owner's id, `None` meaning the resource does not exist.
pub async fn authorize_owner<F, Fut>(user: &AuthUser, lookup: F) -> Result<(), AuthError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<Option<Uuid>>>,
{
    if user.is_admin() {
        return Ok(());
    }

    match lookup().await? {
        None => Err(AuthError::NotFound("Resource not found".to_string())),
        Some(owner) if owner == user.id => Ok(()),
        Some(_) => {
            warn!("User {} is not the owner of the resource", user.id);
            Err(AuthError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{jwt::JwtConfig, models::User};
    use axum::{
        Router,
        body::to_bytes,
        http::{StatusCode, header},
        middleware::{from_fn, from_fn_with_state},
        routing::get,
    };
    use chrono::Utc;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn jwt() -> JwtService {
        JwtService::new(JwtConfig::new("middleware-secret"))
    }

    fn auth_user(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: None,
            role,
            full_name: None,
        }
    }

    fn token_for(jwt: &JwtService, role: Role) -> String {
        let user = User {
            id: Uuid::new_v4(),
            email: "bob@test.com".to_string(),
            password_hash: String::new(),
            full_name: "Bob".to_string(),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        jwt.issue_access_token(&user).unwrap()
    }

    async fn whoami(user: Option<AuthUser>) -> String {
        user.map(|u| u.role.to_string())
            .unwrap_or_else(|| "anonymous".to_string())
    }

    fn app(jwt: JwtService) -> Router {
        let protected = Router::new()
            .route("/me", get(whoami))
            .route_layer(from_fn_with_state(jwt.clone(), require_auth));

        let admin = Router::new()
            .route("/admin", get(whoami))
            .route_layer(from_fn(require_admin))
            .route_layer(from_fn_with_state(jwt.clone(), require_auth));

        let open = Router::new()
            .route("/open", get(whoami))
            .route_layer(from_fn_with_state(jwt, optional_auth));

        protected.merge(admin).merge(open)
    }

    async fn call(app: Router, uri: &str, token: Option<&str>) -> (StatusCode, String) {
        let mut request = Request::builder().uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn missing_token_is_unauthenticated() {
        let (status, body) = call(app(jwt()), "/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["error"], "Authentication required. No token provided.");
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let (status, body) = call(app(jwt()), "/me", Some("garbage")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let jwt = jwt();
        let refresh = jwt.issue_refresh_token(Uuid::new_v4()).unwrap();
        let (status, _) = call(app(jwt), "/me", Some(&refresh)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_reaches_handler() {
        let jwt = jwt();
        let token = token_for(&jwt, Role::User);
        let (status, body) = call(app(jwt), "/me", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "user");
    }

    #[tokio::test]
    async fn admin_gate_checks_role() {
        let jwt = jwt();
        let user_token = token_for(&jwt, Role::User);
        let admin_token = token_for(&jwt, Role::Admin);

        let (status, body) = call(app(jwt.clone()), "/admin", Some(&user_token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains("Insufficient permissions"));

        let (status, body) = call(app(jwt), "/admin", Some(&admin_token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "admin");
    }

    #[tokio::test]
    async fn optional_auth_ignores_bad_tokens() {
        let jwt = jwt();
        let (status, body) = call(app(jwt.clone()), "/open", Some("garbage")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");

        let token = token_for(&jwt, Role::Admin);
        let (_, body) = call(app(jwt), "/open", Some(&token)).await;
        assert_eq!(body, "admin");
    }

    #[test]
    fn role_gate() {
        assert!(authorize_roles(&auth_user(Role::Admin), &[Role::Admin]).is_ok());
        assert!(matches!(
            authorize_roles(&auth_user(Role::User), &[Role::Admin]),
            Err(AuthError::Forbidden)
        ));
        assert!(authorize_roles(&auth_user(Role::User), &[Role::Admin, Role::User]).is_ok());
    }

    #[tokio::test]
    async fn owner_gate_distinguishes_missing_from_foreign() {
        let owner = auth_user(Role::User);
        let stranger = auth_user(Role::User);
        let owner_id = owner.id;

        assert!(authorize_owner(&owner, || async move { Ok(Some(owner_id)) })
            .await
            .is_ok());
        assert!(matches!(
            authorize_owner(&stranger, || async move { Ok(Some(owner_id)) }).await,
            Err(AuthError::Forbidden)
        ));
        assert!(matches!(
            authorize_owner(&stranger, || async { Ok(None) }).await,
            Err(AuthError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn admin_bypasses_owner_lookup() {
        let looked_up = AtomicBool::new(false);
        let result = authorize_owner(&auth_user(Role::Admin), || async {
            looked_up.store(true, Ordering::SeqCst);
            Ok(None)
        })
        .await;

        assert!(result.is_ok());
        assert!(!looked_up.load(Ordering::SeqCst));
    }
}
