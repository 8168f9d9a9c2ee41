//! User repository: the credential store
//!
//! Owns every read and write of the `users` table. Passwords only ever reach
//! the database as argon2 digests, whichever path writes them. Emails are
//! stored trimmed and lowercased and compared case-insensitively.

use anyhow::{Context, Result};
use common::{
    error::is_unique_violation,
    pagination::{Page, PageRequest},
    patch::UpdateQuery,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::AuthError,
    models::{NewUser, Role, UpdateUser, User},
    password,
    validation::normalize_email,
};

const USER_COLUMNS: &str = "id, email, password_hash, full_name, role, created_at, updated_at";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register a new account with the `user` role.
    ///
    /// Fails with `Conflict` when the email is already taken.
    pub async fn register(&self, new_user: &NewUser) -> Result<User, AuthError> {
        let email = normalize_email(&new_user.email);
        if self.email_exists(&email, None).await? {
            return Err(AuthError::Conflict("Email already registered".to_string()));
        }

        let password_hash = password::hash_password(&new_user.password).await?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(&password_hash)
        .bind(&new_user.full_name)
        .bind(Role::User.as_str())
        .fetch_one(&self.pool)
        .await;

        let row = match row {
            Ok(row) => row,
            Err(e) if is_unique_violation(&e) => {
                return Err(AuthError::Conflict("Email already registered".to_string()));
            }
            Err(e) => return Err(anyhow::Error::new(e).context("failed to insert user").into()),
        };

        let user = user_from_row(&row)?;
        info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Check an email/password pair.
    ///
    /// Unknown emails and wrong passwords produce the same error, and an
    /// unknown email still pays for one hash verification.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let Some(user) = self.find_by_email(email).await? else {
            password::verify_dummy(password).await?;
            warn!("Login failed: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !password::verify_password(password, &user.password_hash).await? {
            warn!("Login failed: wrong password for user {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Replace a user's password with a fresh digest.
    ///
    /// Returns `false` when the user does not exist.
    pub async fn reset_password(&self, id: Uuid, new_password: &str) -> Result<bool> {
        let password_hash = password::hash_password(new_password).await?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(&password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = $1"))
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// List users, newest first
    pub async fn find_all(&self, page: PageRequest) -> Result<Page<User>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let users = rows.iter().map(user_from_row).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(users, total, page))
    }

    /// Whether another account already uses `email`
    pub async fn email_exists(&self, email: &str, exclude: Option<Uuid>) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE LOWER(email) = $1 AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(normalize_email(email))
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Apply a partial update; a present password is hashed first.
    ///
    /// Returns `false` for an empty patch or an unknown user.
    pub async fn update(&self, id: Uuid, changes: UpdateUser) -> Result<bool> {
        if changes.is_empty() {
            return Ok(false);
        }

        let password_hash = match changes.password.as_deref() {
            Some(plain) => Some(password::hash_password(plain).await?),
            None => None,
        };

        let mut update = UpdateQuery::new("users").touching("updated_at");
        update
            .set("email", changes.email.as_deref().map(normalize_email))
            .set("password_hash", password_hash)
            .set("full_name", changes.full_name)
            .set("role", changes.role.map(|r| r.as_str()));

        let Some(mut query) = update.finish("id", id) else {
            return Ok(false);
        };
        let result = query.build().execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a user
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let role: String = row.get("role");

    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        full_name: row.get("full_name"),
        role: role.parse().context("users.role holds an unknown role")?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
