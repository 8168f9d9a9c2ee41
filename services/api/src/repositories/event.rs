//! Event repository for database operations

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
    event::{Event, NewEvent, UpdateEvent},
};

const SEARCH_COLUMNS: &[&str] = &["name", "description", "location"];

/// Event repository for database operations
#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    /// Create a new event repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an event by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(event)
    }

    /// List events, latest date first; undated events go last.
    ///
    /// Events have no category, so only the search term applies.
    pub async fn find_all(&self, page: PageRequest, filter: &ListFilter) -> Result<Page<Event>> {
        let filter = &ListFilter {
            category: None,
            search: filter.search.clone(),
        };

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM events");
        push_filter(&mut count, filter, SEARCH_COLUMNS);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new("SELECT * FROM events");
        push_filter(&mut select, filter, SEARCH_COLUMNS);
        select
            .push(" ORDER BY event_date DESC NULLS LAST, id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let events = select
            .build_query_as::<Event>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(events, total, page))
    }

    /// Case-insensitive search over name, description and location
    pub async fn search(&self, term: &str, page: PageRequest) -> Result<Page<Event>> {
        self.find_all(page, &ListFilter::search(term)).await
    }

    /// Events from today onwards, soonest first
    pub async fn find_upcoming(&self, limit: i64) -> Result<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(
            r#"
            SELECT * FROM events
            WHERE event_date >= CURRENT_DATE
            ORDER BY event_date ASC, event_time ASC NULLS LAST, id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Insert an event and return its ID
    pub async fn create(&self, event: &NewEvent) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO events (name, description, location, event_date, event_time, image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&event.name)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.date)
        .bind(event.time)
        .bind(&event.image_url)
        .fetch_one(&self.pool)
        .await?;

        info!("Created event {}", id);
        Ok(id)
    }

    /// Apply a partial update; `false` when nothing changed or the row is gone
    pub async fn update(&self, id: i64, changes: UpdateEvent) -> Result<bool> {
        let mut update = UpdateQuery::new("events").touching("updated_at");
        update
            .set("name", changes.name)
            .set("description", changes.description)
            .set("location", changes.location)
            .set("event_date", changes.date)
            .set("event_time", changes.time)
            .set("image_url", changes.image_url);

        let Some(mut query) = update.finish("id", id) else {
            return Ok(false);
        };
        let result = query.build().execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete an event
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
