//! Authentication and authorization for the directory services
//!
//! - [`jwt`]: token issuance and verification
//! - [`password`] and [`repositories::UserRepository`]: the credential store
//! - [`middleware`]: bearer-token middleware, role and ownership gates
//! - [`routes`]: the `/api/auth` endpoints

pub mod error;
pub mod extract;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repositories;
pub mod routes;
pub mod validation;

pub use error::{AuthError, FieldError};
pub use jwt::{JwtConfig, JwtService};
pub use middleware::AuthUser;
pub use models::{Role, User};
