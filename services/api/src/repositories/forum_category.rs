//! Forum category repository for database operations

use anyhow::Result;
use common::patch::UpdateQuery;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::forum::{
    CategorySummary, ForumCategory, NewForumCategory, UpdateForumCategory,
};

/// Why a category could not be deleted
#[derive(Debug, Error)]
pub enum CategoryDeleteError {
    /// Threads still reference the category
    #[error("Cannot delete category with existing threads")]
    HasThreads(i64),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Forum category repository for database operations
#[derive(Clone)]
pub struct ForumCategoryRepository {
    pool: PgPool,
}

impl ForumCategoryRepository {
    /// Create a new forum category repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All categories by name, each with its thread count
    pub async fn find_all(&self) -> Result<Vec<CategorySummary>> {
        let categories = sqlx::query_as::<_, CategorySummary>(
            r#"
            SELECT c.*, COUNT(t.id) AS thread_count
            FROM forum_categories c
            LEFT JOIN forum_threads t ON t.category_id = c.id
            GROUP BY c.id
            ORDER BY c.name ASC, c.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Find a category by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<ForumCategory>> {
        let category =
            sqlx::query_as::<_, ForumCategory>("SELECT * FROM forum_categories WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(category)
    }

    /// Insert a category and return its ID
    pub async fn create(&self, category: &NewForumCategory) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO forum_categories (name, description) VALUES ($1, $2) RETURNING id",
        )
        .bind(&category.name)
        .bind(&category.description)
        .fetch_one(&self.pool)
        .await?;

        info!("Created forum category {}", id);
        Ok(id)
    }

    /// Apply a partial update; `false` when nothing changed or the row is gone
    pub async fn update(&self, id: i64, changes: UpdateForumCategory) -> Result<bool> {
        let mut update = UpdateQuery::new("forum_categories").touching("updated_at");
        update
            .set("name", changes.name)
            .set("description", changes.description);

        let Some(mut query) = update.finish("id", id) else {
            return Ok(false);
        };
        let result = query.build().execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a category that no thread references.
    ///
    /// The category row stays locked between the check and the delete, so a
    /// thread cannot be filed under it in between.
    pub async fn delete(&self, id: i64) -> Result<bool, CategoryDeleteError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> =
            sqlx::query_scalar("SELECT id FROM forum_categories WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Ok(false);
        }

        let threads: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM forum_threads WHERE category_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if threads > 0 {
            warn!("Refusing to delete forum category {} with {} threads", id, threads);
            return Err(CategoryDeleteError::HasThreads(threads));
        }

        let result = sqlx::query("DELETE FROM forum_categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Deleted forum category {}", id);
        Ok(result.rows_affected() > 0)
    }
}
