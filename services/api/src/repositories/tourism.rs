//! Tourism destination repository for database operations

use anyhow::Result;
use common::{
    pagination::{Page, PageRequest},
    patch::UpdateQuery,
};
use sqlx::{PgConnection, PgPool, QueryBuilder};
use tracing::info;

use super::{
    push_filter,
    tourism_image::{images_of, lock_destination, sync_primary},
};
use crate::models::{
    ListFilter,
    tourism::{
        NewTourismDestination, TourismDestination, TourismDestinationWithImages,
        UpdateTourismDestination,
    },
};

const SEARCH_COLUMNS: &[&str] = &["name", "description", "location"];

/// Tourism destination repository for database operations
#[derive(Clone)]
pub struct TourismRepository {
    pool: PgPool,
}

impl TourismRepository {
    /// Create a new tourism destination repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a destination by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<TourismDestination>> {
        let destination = sqlx::query_as::<_, TourismDestination>(
            "SELECT * FROM tourism_destinations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(destination)
    }

    /// Find a destination together with its gallery
    pub async fn find_by_id_with_images(
        &self,
        id: i64,
    ) -> Result<Option<TourismDestinationWithImages>> {
        let mut conn = self.pool.acquire().await?;

        let destination = sqlx::query_as::<_, TourismDestination>(
            "SELECT * FROM tourism_destinations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(destination) = destination else {
            return Ok(None);
        };
        let images = images_of(&mut conn, id).await?;

        Ok(Some(TourismDestinationWithImages {
            destination,
            images,
        }))
    }

    /// List destinations, newest first, optionally filtered
    pub async fn find_all(
        &self,
        page: PageRequest,
        filter: &ListFilter,
    ) -> Result<Page<TourismDestination>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM tourism_destinations");
        push_filter(&mut count, filter, SEARCH_COLUMNS);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new("SELECT * FROM tourism_destinations");
        push_filter(&mut select, filter, SEARCH_COLUMNS);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let destinations = select
            .build_query_as::<TourismDestination>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(destinations, total, page))
    }

    /// Case-insensitive search over name, description and location
    pub async fn search(&self, term: &str, page: PageRequest) -> Result<Page<TourismDestination>> {
        self.find_all(page, &ListFilter::search(term)).await
    }

    /// Featured destinations, newest first
    pub async fn find_featured(&self, limit: i64) -> Result<Vec<TourismDestination>> {
        let destinations = sqlx::query_as::<_, TourismDestination>(
            r#"
            SELECT * FROM tourism_destinations
            WHERE featured = TRUE
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(destinations)
    }

    /// Insert a destination and return its ID.
    ///
    /// A non-empty `image_url` becomes the destination's first, primary image.
    pub async fn create(&self, destination: &NewTourismDestination) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO tourism_destinations (name, description, location, category, image_url, featured)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&destination.name)
        .bind(&destination.description)
        .bind(&destination.location)
        .bind(&destination.category)
        .bind(&destination.image_url)
        .bind(destination.featured)
        .fetch_one(&mut *tx)
        .await?;

        if !destination.image_url.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO tourism_images (tourism_id, image_url, is_primary, display_order)
                VALUES ($1, $2, TRUE, 0)
                "#,
            )
            .bind(id)
            .bind(&destination.image_url)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!("Created tourism destination {}", id);
        Ok(id)
    }

    /// Apply a partial update; `false` when nothing changed or the row is gone.
    ///
    /// A non-empty `image_url` is written to the primary image (created when
    /// missing) and mirrored back, all in the same transaction. An empty one
    /// leaves the cover alone; the route refuses it before getting here.
    pub async fn update(&self, id: i64, changes: UpdateTourismDestination) -> Result<bool> {
        let image_url = changes.image_url.filter(|url| !url.is_empty());

        let mut update = UpdateQuery::new("tourism_destinations").touching("updated_at");
        update
            .set("name", changes.name)
            .set("description", changes.description)
            .set("location", changes.location)
            .set("category", changes.category)
            .set("featured", changes.featured);

        if update.is_empty() && image_url.is_none() {
            return Ok(false);
        }

        let mut tx = self.pool.begin().await?;

        if !lock_destination(&mut tx, id).await? {
            return Ok(false);
        }

        if let Some(mut query) = update.finish("id", id) {
            query.build().execute(&mut *tx).await?;
        }

        if let Some(url) = image_url {
            replace_primary_url(&mut tx, id, &url).await?;
            sync_primary(&mut tx, id).await?;
        }

        tx.commit().await?;

        info!("Updated tourism destination {}", id);
        Ok(true)
    }

    /// Delete a destination; its images go with it.
    ///
    /// Returns the removed record so the caller can clean up its file.
    pub async fn delete(&self, id: i64) -> Result<Option<TourismDestination>> {
        let deleted = sqlx::query_as::<_, TourismDestination>(
            "DELETE FROM tourism_destinations WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        if deleted.is_some() {
            info!("Deleted tourism destination {}", id);
        }
        Ok(deleted)
    }
}

// Point the primary image at `url`, or add a primary image when the
// destination has none yet.
async fn replace_primary_url(conn: &mut PgConnection, tourism_id: i64, url: &str) -> Result<()> {
    let updated = sqlx::query(
        "UPDATE tourism_images SET image_url = $2 WHERE tourism_id = $1 AND is_primary",
    )
    .bind(tourism_id)
    .bind(url)
    .execute(&mut *conn)
    .await?;

    if updated.rows_affected() == 0 {
        sqlx::query(
            r#"
            INSERT INTO tourism_images (tourism_id, image_url, is_primary, display_order)
            VALUES (
                $1, $2, TRUE,
                COALESCE((SELECT MAX(display_order) + 1 FROM tourism_images WHERE tourism_id = $1), 0)
            )
            "#,
        )
        .bind(tourism_id)
        .bind(url)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}
