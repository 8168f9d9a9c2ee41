//! Forum models
//!
//! Counters (threads per category, replies, reactions) are never stored; the
//! read models below carry them as computed columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Forum category
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ForumCategory {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Category with the number of threads filed under it
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CategorySummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub category: ForumCategory,
    pub thread_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewForumCategory {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateForumCategory {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Forum thread
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ForumThread {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: Uuid,
    pub category_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Thread as shown in listings
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ThreadSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub thread: ForumThread,
    pub author_name: String,
    pub category_name: String,
    pub reply_count: i64,
}

/// Thread with author, category and reaction counters
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ThreadDetail {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub thread: ForumThread,
    pub author_name: String,
    pub category_name: Option<String>,
    pub reply_count: i64,
    pub like_count: i64,
    pub dislike_count: i64,
}

/// Thread page: the thread and its replies in posting order
#[derive(Debug, Clone, Serialize)]
pub struct ThreadWithPosts {
    #[serde(flatten)]
    pub thread: ThreadDetail,
    pub posts: Vec<PostDetail>,
    /// Whether the caller may edit or delete the thread
    pub can_edit: bool,
}

/// Listing order for threads in a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadSort {
    #[default]
    Newest,
    /// Most replies first
    Popular,
}

impl ThreadSort {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("popular") => ThreadSort::Popular,
            _ => ThreadSort::Newest,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewThreadRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct NewForumThread {
    pub title: String,
    pub content: String,
    pub user_id: Uuid,
    pub category_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateForumThread {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Forum post
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ForumPost {
    pub id: i64,
    pub content: String,
    pub user_id: Uuid,
    pub thread_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post with author and reaction counters
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PostDetail {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub post: ForumPost,
    pub author_name: String,
    pub like_count: i64,
    pub dislike_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewPostRequest {
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct NewForumPost {
    pub content: String,
    pub user_id: Uuid,
    pub thread_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateForumPost {
    pub content: Option<String>,
}

/// Site-wide forum numbers
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ForumStats {
    pub thread_count: i64,
    pub post_count: i64,
    pub user_count: i64,
    pub newest_user: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_sort_falls_back_to_newest() {
        assert_eq!(ThreadSort::parse(Some("popular")), ThreadSort::Popular);
        assert_eq!(ThreadSort::parse(Some("oldest")), ThreadSort::Newest);
        assert_eq!(ThreadSort::parse(None), ThreadSort::Newest);
    }

    #[test]
    fn thread_pages_name_the_edit_flag_like_their_other_fields() {
        let page = ThreadWithPosts {
            thread: ThreadDetail {
                thread: ForumThread {
                    id: 7,
                    title: "Ferry times".to_string(),
                    content: "Does the morning ferry run on Sundays?".to_string(),
                    user_id: Uuid::new_v4(),
                    category_id: 1,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                },
                author_name: "Ana".to_string(),
                category_name: Some("Travel".to_string()),
                reply_count: 0,
                like_count: 0,
                dislike_count: 0,
            },
            posts: Vec::new(),
            can_edit: true,
        };
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["can_edit"], true);
        assert_eq!(value["reply_count"], 0);
        assert!(value.get("canEdit").is_none());
    }
}
