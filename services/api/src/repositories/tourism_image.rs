//! Tourism image repository: the primary-image synchronizer
//!
//! Every write that can move the primary flag runs in one transaction that
//! first locks the owning destination row. Before committing, [`sync_primary`]
//! restores the invariant:
//!
//! - a destination with images has exactly one primary image (the lowest
//!   `display_order` is promoted when none is flagged);
//! - `tourism_destinations.image_url` equals the primary image's URL, or is
//!   empty when the destination has no images.

use anyhow::Result;
use common::patch::UpdateQuery;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};

use crate::models::tourism::{NewTourismImage, TourismImage, UpdateTourismImage};

/// Tourism image repository for database operations
#[derive(Clone)]
pub struct TourismImageRepository {
    pool: PgPool,
}

impl TourismImageRepository {
    /// Create a new tourism image repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Images of a destination, primary first then by display order
    pub async fn find_by_tourism(&self, tourism_id: i64) -> Result<Vec<TourismImage>> {
        let mut conn = self.pool.acquire().await?;
        images_of(&mut conn, tourism_id).await
    }

    /// Find an image by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<TourismImage>> {
        let image = sqlx::query_as::<_, TourismImage>("SELECT * FROM tourism_images WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(image)
    }

    /// Add an image to a destination.
    ///
    /// The first image of a destination is always primary. Returns `None`
    /// when the destination does not exist.
    pub async fn create(&self, image: NewTourismImage) -> Result<Option<TourismImage>> {
        let mut tx = self.pool.begin().await?;

        if !lock_destination(&mut tx, image.tourism_id).await? {
            return Ok(None);
        }

        let (count, max_order): (i64, Option<i32>) = sqlx::query_as(
            "SELECT COUNT(*), MAX(display_order) FROM tourism_images WHERE tourism_id = $1",
        )
        .bind(image.tourism_id)
        .fetch_one(&mut *tx)
        .await?;

        let is_primary = count == 0 || image.is_primary.unwrap_or(false);
        let display_order = image
            .display_order
            .unwrap_or_else(|| max_order.map_or(0, |max| max + 1));

        if is_primary {
            unset_primary(&mut tx, image.tourism_id, None).await?;
        }

        let created = sqlx::query_as::<_, TourismImage>(
            r#"
            INSERT INTO tourism_images (tourism_id, image_url, caption, is_primary, display_order)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(image.tourism_id)
        .bind(&image.image_url)
        .bind(&image.caption)
        .bind(is_primary)
        .bind(display_order)
        .fetch_one(&mut *tx)
        .await?;

        sync_primary(&mut tx, image.tourism_id).await?;
        tx.commit().await?;

        info!(
            "Added image {} to tourism destination {} (primary: {})",
            created.id, created.tourism_id, created.is_primary
        );
        Ok(Some(created))
    }

    /// Make an image the primary image of its destination.
    ///
    /// Returns the updated image, or `None` when it does not exist.
    pub async fn set_primary(&self, id: i64) -> Result<Option<TourismImage>> {
        let mut tx = self.pool.begin().await?;

        let Some(tourism_id) = lock_image_owner(&mut tx, id).await? else {
            return Ok(None);
        };

        unset_primary(&mut tx, tourism_id, Some(id)).await?;
        sqlx::query("UPDATE tourism_images SET is_primary = TRUE WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sync_primary(&mut tx, tourism_id).await?;
        let image = image_by_id(&mut tx, id).await?;
        tx.commit().await?;

        info!("Image {} is now primary for tourism destination {}", id, tourism_id);
        Ok(image)
    }

    /// Apply a partial update.
    ///
    /// `is_primary = true` demotes the siblings first. Clearing the flag on
    /// the only primary image hands it to the lowest display order, which
    /// may be the same image. Returns `false` for an empty patch or an
    /// unknown image.
    pub async fn update(&self, id: i64, changes: UpdateTourismImage) -> Result<bool> {
        if changes.is_empty() {
            return Ok(false);
        }

        let mut tx = self.pool.begin().await?;

        let Some(tourism_id) = lock_image_owner(&mut tx, id).await? else {
            return Ok(false);
        };

        if changes.is_primary == Some(true) {
            unset_primary(&mut tx, tourism_id, Some(id)).await?;
        }

        let mut update = UpdateQuery::new("tourism_images");
        update
            .set("caption", changes.caption)
            .set("is_primary", changes.is_primary)
            .set("display_order", changes.display_order);

        let Some(mut query) = update.finish("id", id) else {
            return Ok(false);
        };
        let result = query.build().execute(&mut *tx).await?;

        sync_primary(&mut tx, tourism_id).await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete an image, promoting a successor when it was the primary one.
    ///
    /// Returns the removed record so the caller can clean up its file.
    pub async fn delete(&self, id: i64) -> Result<Option<TourismImage>> {
        let mut tx = self.pool.begin().await?;

        let Some(tourism_id) = lock_image_owner(&mut tx, id).await? else {
            return Ok(None);
        };

        let deleted = sqlx::query_as::<_, TourismImage>(
            "DELETE FROM tourism_images WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        sync_primary(&mut tx, tourism_id).await?;
        tx.commit().await?;

        if deleted.is_some() {
            info!("Deleted image {} of tourism destination {}", id, tourism_id);
        }
        Ok(deleted)
    }
}

/// Lock a destination row for the rest of the transaction.
///
/// Returns `false` when the destination does not exist.
pub(crate) async fn lock_destination(conn: &mut PgConnection, tourism_id: i64) -> Result<bool> {
    let locked: Option<i64> =
        sqlx::query_scalar("SELECT id FROM tourism_destinations WHERE id = $1 FOR UPDATE")
            .bind(tourism_id)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(locked.is_some())
}

/// Restore the primary-image invariant for one destination
pub(crate) async fn sync_primary(conn: &mut PgConnection, tourism_id: i64) -> Result<()> {
    let promoted = sqlx::query(
        r#"
        UPDATE tourism_images SET is_primary = TRUE
        WHERE id = (
            SELECT id FROM tourism_images
            WHERE tourism_id = $1
            ORDER BY display_order ASC, id ASC
            LIMIT 1
        )
        AND NOT EXISTS (
            SELECT 1 FROM tourism_images WHERE tourism_id = $1 AND is_primary
        )
        "#,
    )
    .bind(tourism_id)
    .execute(&mut *conn)
    .await?;

    if promoted.rows_affected() > 0 {
        debug!("Promoted a new primary image for tourism destination {}", tourism_id);
    }

    sqlx::query(
        r#"
        UPDATE tourism_destinations
        SET image_url = COALESCE(
                (SELECT image_url FROM tourism_images WHERE tourism_id = $1 AND is_primary LIMIT 1),
                ''
            ),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(tourism_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn images_of(conn: &mut PgConnection, tourism_id: i64) -> Result<Vec<TourismImage>> {
    let images = sqlx::query_as::<_, TourismImage>(
        r#"
        SELECT * FROM tourism_images
        WHERE tourism_id = $1
        ORDER BY is_primary DESC, display_order ASC, id ASC
        "#,
    )
    .bind(tourism_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(images)
}

/// Clear the primary flag on every image of a destination except `keep`
pub(crate) async fn unset_primary(
    conn: &mut PgConnection,
    tourism_id: i64,
    keep: Option<i64>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE tourism_images SET is_primary = FALSE
        WHERE tourism_id = $1 AND is_primary AND ($2::bigint IS NULL OR id <> $2)
        "#,
    )
    .bind(tourism_id)
    .bind(keep)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// Resolve an image's destination and lock it. The owner is read again under
// the lock since the image may have been removed in the meantime.
async fn lock_image_owner(conn: &mut PgConnection, image_id: i64) -> Result<Option<i64>> {
    let Some(tourism_id) = owner_of(conn, image_id).await? else {
        return Ok(None);
    };

    if !lock_destination(conn, tourism_id).await? {
        return Ok(None);
    }

    Ok(owner_of(conn, image_id)
        .await?
        .filter(|owner| *owner == tourism_id))
}

async fn owner_of(conn: &mut PgConnection, image_id: i64) -> Result<Option<i64>> {
    let owner = sqlx::query_scalar("SELECT tourism_id FROM tourism_images WHERE id = $1")
        .bind(image_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(owner)
}

async fn image_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<TourismImage>> {
    let image = sqlx::query_as::<_, TourismImage>("SELECT * FROM tourism_images WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(image)
}
