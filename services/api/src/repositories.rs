//! Repositories for database operations

use sqlx::{Postgres, QueryBuilder};

use crate::models::ListFilter;

pub mod business;
pub mod event;
pub mod forum_category;
pub mod forum_post;
pub mod forum_thread;
pub mod tourism;
pub mod tourism_image;

pub use business::BusinessRepository;
pub use event::EventRepository;
pub use forum_category::{CategoryDeleteError, ForumCategoryRepository};
pub use forum_post::ForumPostRepository;
pub use forum_thread::ForumThreadRepository;
pub use tourism::TourismRepository;
pub use tourism_image::TourismImageRepository;

/// Escape `ILIKE` wildcards so user input only ever matches literally
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Append `WHERE category = $n AND (col ILIKE $m OR ...)` for the present filters
pub(crate) fn push_filter<'args>(
    builder: &mut QueryBuilder<'args, Postgres>,
    filter: &ListFilter,
    search_columns: &[&str],
) {
    let mut has_where = false;

    if let Some(category) = &filter.category {
        builder.push(" WHERE category = ").push_bind(category.clone());
        has_where = true;
    }

    if let Some(term) = &filter.search {
        builder.push(if has_where { " AND (" } else { " WHERE (" });
        let pattern = like_pattern(term);
        for (i, column) in search_columns.iter().enumerate() {
            if i > 0 {
                builder.push(" OR ");
            }
            builder
                .push(*column)
                .push(" ILIKE ")
                .push_bind(pattern.clone());
        }
        builder.push(")");
    }
}
