//! Business repository for database operations

use anyhow::Result;
use common::{
    pagination::{Page, PageRequest},
    patch::UpdateQuery,
};
use sqlx::{PgPool, QueryBuilder};
use tracing::info;

use super::push_filter;
use crate::models::{
    ListFilter,
    business::{Business, NewBusiness, UpdateBusiness},
};

const SEARCH_COLUMNS: &[&str] = &["name", "description", "location"];

/// Business repository for database operations
#[derive(Clone)]
pub struct BusinessRepository {
    pool: PgPool,
}

impl BusinessRepository {
    /// Create a new business repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a business by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Business>> {
        let business = sqlx::query_as::<_, Business>("SELECT * FROM businesses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(business)
    }

    /// List businesses, newest first, optionally filtered
    pub async fn find_all(&self, page: PageRequest, filter: &ListFilter) -> Result<Page<Business>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM businesses");
        push_filter(&mut count, filter, SEARCH_COLUMNS);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new("SELECT * FROM businesses");
        push_filter(&mut select, filter, SEARCH_COLUMNS);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let businesses = select
            .build_query_as::<Business>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(businesses, total, page))
    }

    /// Case-insensitive search over name, description and location
    pub async fn search(&self, term: &str, page: PageRequest) -> Result<Page<Business>> {
        self.find_all(page, &ListFilter::search(term)).await
    }

    /// The most recently added businesses
    pub async fn find_featured(&self, limit: i64) -> Result<Vec<Business>> {
        let businesses = sqlx::query_as::<_, Business>(
            "SELECT * FROM businesses ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(businesses)
    }

    /// Insert a business and return its ID
    pub async fn create(&self, business: &NewBusiness) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO businesses (name, description, location, category, contact, image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&business.name)
        .bind(&business.description)
        .bind(&business.location)
        .bind(&business.category)
        .bind(&business.contact)
        .bind(&business.image_url)
        .fetch_one(&self.pool)
        .await?;

        info!("Created business {}", id);
        Ok(id)
    }

    /// Apply a partial update; `false` when nothing changed or the row is gone
    pub async fn update(&self, id: i64, changes: UpdateBusiness) -> Result<bool> {
        let mut update = UpdateQuery::new("businesses").touching("updated_at");
        update
            .set("name", changes.name)
            .set("description", changes.description)
            .set("location", changes.location)
            .set("category", changes.category)
            .set("contact", changes.contact)
            .set("image_url", changes.image_url);

        let Some(mut query) = update.finish("id", id) else {
            return Ok(false);
        };
        let result = query.build().execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a business
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM businesses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
