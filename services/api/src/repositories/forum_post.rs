//! Forum post repository for database operations

use anyhow::Result;
use common::{error::is_foreign_key_violation, patch::UpdateQuery};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::forum::{ForumPost, NewForumPost, PostDetail, UpdateForumPost};

/// Forum post repository for database operations
#[derive(Clone)]
pub struct ForumPostRepository {
    pool: PgPool,
}

impl ForumPostRepository {
    /// Create a new forum post repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a post by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<ForumPost>> {
        let post = sqlx::query_as::<_, ForumPost>("SELECT * FROM forum_posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    /// Replies of a thread in posting order
    pub async fn find_by_thread(&self, thread_id: i64) -> Result<Vec<PostDetail>> {
        let posts = sqlx::query_as::<_, PostDetail>(
            r#"
            SELECT p.*,
                u.full_name AS author_name,
                (SELECT COUNT(*) FROM forum_reactions r
                    WHERE r.post_id = p.id AND r.reaction_type = 'like') AS like_count,
                (SELECT COUNT(*) FROM forum_reactions r
                    WHERE r.post_id = p.id AND r.reaction_type = 'dislike') AS dislike_count
            FROM forum_posts p
            JOIN users u ON u.id = p.user_id
            WHERE p.thread_id = $1
            ORDER BY p.created_at ASC, p.id ASC
            "#,
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    /// Insert a reply and return it; `None` when the thread is gone
    pub async fn create(&self, post: &NewForumPost) -> Result<Option<ForumPost>> {
        let inserted = sqlx::query_as::<_, ForumPost>(
            r#"
            INSERT INTO forum_posts (content, user_id, thread_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&post.content)
        .bind(post.user_id)
        .bind(post.thread_id)
        .fetch_one(&self.pool)
        .await;

        let created = match inserted {
            Ok(created) => created,
            Err(e) if is_foreign_key_violation(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        info!(
            "User {} replied to thread {} with post {}",
            created.user_id, created.thread_id, created.id
        );
        Ok(Some(created))
    }

    /// Apply a partial update; `false` when nothing changed or the row is gone
    pub async fn update(&self, id: i64, changes: UpdateForumPost) -> Result<bool> {
        let mut update = UpdateQuery::new("forum_posts").touching("updated_at");
        update.set("content", changes.content);

        let Some(mut query) = update.finish("id", id) else {
            return Ok(false);
        };
        let result = query.build().execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a post
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM forum_posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Author of a post
    pub async fn owner_id(&self, id: i64) -> Result<Option<Uuid>> {
        let owner = sqlx::query_scalar("SELECT user_id FROM forum_posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(owner)
    }
}
