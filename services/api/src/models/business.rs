//! Business models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Business listing
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Business {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub location: String,
    pub category: String,
    pub contact: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New business payload; omitted text fields are stored empty
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewBusiness {
    pub name: String,
    pub description: String,
    pub location: String,
    pub category: String,
    pub contact: String,
    pub image_url: String,
}

/// Business update payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBusiness {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub contact: Option<String>,
    pub image_url: Option<String>,
}
