//! Authentication models

pub mod role;
pub mod user;

pub use role::{Role, UnknownRole};
pub use user::{LoginCredentials, NewUser, UpdateUser, User};
