//! Tourism destination and image models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Tourism destination
///
/// `image_url` mirrors the URL of the destination's primary image.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TourismDestination {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub location: String,
    pub category: String,
    pub image_url: String,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Destination together with its gallery, primary image first
#[derive(Debug, Clone, Serialize)]
pub struct TourismDestinationWithImages {
    #[serde(flatten)]
    pub destination: TourismDestination,
    pub images: Vec<TourismImage>,
}

/// New destination payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewTourismDestination {
    pub name: String,
    pub description: String,
    pub location: String,
    pub category: String,
    pub image_url: String,
    pub featured: bool,
}

/// Destination update payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTourismDestination {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub featured: Option<bool>,
}

/// Gallery image of a destination
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TourismImage {
    pub id: i64,
    pub tourism_id: i64,
    pub image_url: String,
    pub caption: Option<String>,
    pub is_primary: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

/// New image record; unset flags fall back to the gallery defaults
#[derive(Debug, Clone, Default)]
pub struct NewTourismImage {
    pub tourism_id: i64,
    pub image_url: String,
    pub caption: Option<String>,
    /// Defaults to `true` only for the first image of a destination
    pub is_primary: Option<bool>,
    /// Defaults to one past the current maximum
    pub display_order: Option<i32>,
}

/// Image update payload, named like the image record.
///
/// The camelCase spellings older clients send are accepted as aliases.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTourismImage {
    pub caption: Option<String>,
    #[serde(alias = "isPrimary")]
    pub is_primary: Option<bool>,
    #[serde(alias = "displayOrder")]
    pub display_order: Option<i32>,
}

impl UpdateTourismImage {
    pub fn is_empty(&self) -> bool {
        self.caption.is_none() && self.is_primary.is_none() && self.display_order.is_none()
    }
}
