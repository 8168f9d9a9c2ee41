//! Forum thread repository for database operations

use anyhow::Result;
use common::{
    error::is_foreign_key_violation,
    pagination::{Page, PageRequest},
    patch::UpdateQuery,
};
use sqlx::{PgPool, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use super::like_pattern;
use crate::models::forum::{
    ForumStats, ForumThread, NewForumThread, ThreadDetail, ThreadSort, ThreadSummary,
    UpdateForumThread,
};

const SUMMARY_SELECT: &str = r#"
    SELECT t.*,
        u.full_name AS author_name,
        c.name AS category_name,
        (SELECT COUNT(*) FROM forum_posts p WHERE p.thread_id = t.id) AS reply_count
    FROM forum_threads t
    JOIN users u ON u.id = t.user_id
    JOIN forum_categories c ON c.id = t.category_id
"#;

/// Forum thread repository for database operations
#[derive(Clone)]
pub struct ForumThreadRepository {
    pool: PgPool,
}

impl ForumThreadRepository {
    /// Create a new forum thread repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a thread with author, category and reaction counters
    pub async fn find_by_id(&self, id: i64) -> Result<Option<ThreadDetail>> {
        let thread = sqlx::query_as::<_, ThreadDetail>(
            r#"
            SELECT t.*,
                u.full_name AS author_name,
                c.name AS category_name,
                (SELECT COUNT(*) FROM forum_posts p WHERE p.thread_id = t.id) AS reply_count,
                (SELECT COUNT(*) FROM forum_reactions r
                    WHERE r.thread_id = t.id AND r.reaction_type = 'like') AS like_count,
                (SELECT COUNT(*) FROM forum_reactions r
                    WHERE r.thread_id = t.id AND r.reaction_type = 'dislike') AS dislike_count
            FROM forum_threads t
            JOIN users u ON u.id = t.user_id
            LEFT JOIN forum_categories c ON c.id = t.category_id
            WHERE t.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(thread)
    }

    /// Threads of one category
    pub async fn find_by_category(
        &self,
        category_id: i64,
        page: PageRequest,
        sort: ThreadSort,
    ) -> Result<Page<ThreadSummary>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM forum_threads WHERE category_id = $1")
                .bind(category_id)
                .fetch_one(&self.pool)
                .await?;

        let mut select = QueryBuilder::new(SUMMARY_SELECT);
        select.push(" WHERE t.category_id = ").push_bind(category_id);
        select.push(match sort {
            ThreadSort::Newest => " ORDER BY t.created_at DESC, t.id DESC",
            ThreadSort::Popular => " ORDER BY reply_count DESC, t.created_at DESC, t.id DESC",
        });
        select
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let threads = select
            .build_query_as::<ThreadSummary>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(threads, total, page))
    }

    /// Case-insensitive search over title and content, newest first
    pub async fn search(&self, term: &str, page: PageRequest) -> Result<Page<ThreadSummary>> {
        let pattern = like_pattern(term);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM forum_threads WHERE title ILIKE $1 OR content ILIKE $1",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let mut select = QueryBuilder::new(SUMMARY_SELECT);
        select
            .push(" WHERE t.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR t.content ILIKE ")
            .push_bind(pattern)
            .push(" ORDER BY t.created_at DESC, t.id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let threads = select
            .build_query_as::<ThreadSummary>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(threads, total, page))
    }

    /// Latest threads across all categories
    pub async fn find_recent(&self, limit: i64) -> Result<Vec<ThreadSummary>> {
        let mut select = QueryBuilder::new(SUMMARY_SELECT);
        select
            .push(" ORDER BY t.created_at DESC, t.id DESC LIMIT ")
            .push_bind(limit);
        let threads = select
            .build_query_as::<ThreadSummary>()
            .fetch_all(&self.pool)
            .await?;

        Ok(threads)
    }

    /// Insert a thread and return it.
    ///
    /// Returns `None` when the category or the author no longer exists.
    pub async fn create(&self, thread: &NewForumThread) -> Result<Option<ForumThread>> {
        let inserted = sqlx::query_as::<_, ForumThread>(
            r#"
            INSERT INTO forum_threads (title, content, user_id, category_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&thread.title)
        .bind(&thread.content)
        .bind(thread.user_id)
        .bind(thread.category_id)
        .fetch_one(&self.pool)
        .await;

        let created = match inserted {
            Ok(created) => created,
            Err(e) if is_foreign_key_violation(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        info!(
            "User {} opened thread {} in category {}",
            created.user_id, created.id, created.category_id
        );
        Ok(Some(created))
    }

    /// Apply a partial update; `false` when nothing changed or the row is gone
    pub async fn update(&self, id: i64, changes: UpdateForumThread) -> Result<bool> {
        let mut update = UpdateQuery::new("forum_threads").touching("updated_at");
        update
            .set("title", changes.title)
            .set("content", changes.content);

        let Some(mut query) = update.finish("id", id) else {
            return Ok(false);
        };
        let result = query.build().execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a thread and, by cascade, its posts
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM forum_threads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Author of a thread
    pub async fn owner_id(&self, id: i64) -> Result<Option<Uuid>> {
        let owner = sqlx::query_scalar("SELECT user_id FROM forum_threads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(owner)
    }

    /// Forum-wide counters
    pub async fn stats(&self) -> Result<ForumStats> {
        let stats = sqlx::query_as::<_, ForumStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM forum_threads) AS thread_count,
                (SELECT COUNT(*) FROM forum_posts) AS post_count,
                (SELECT COUNT(*) FROM users) AS user_count,
                COALESCE(
                    (SELECT full_name FROM users ORDER BY created_at DESC LIMIT 1),
                    'No users yet'
                ) AS newest_user
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}
