//! Directory API service: businesses, events, tourism destinations and the
//! community forum, served over one PostgreSQL pool.

pub mod config;
pub mod error;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod state;
pub mod uploads;

pub use error::{ApiError, ApiResult};
pub use state::AppState;
