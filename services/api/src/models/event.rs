//! Event models

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use sqlx::FromRow;

/// Event listing
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub location: String,
    #[sqlx(rename = "event_date")]
    pub date: Option<NaiveDate>,
    #[sqlx(rename = "event_time")]
    pub time: Option<NaiveTime>,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New event payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewEvent {
    pub name: String,
    pub description: String,
    pub location: String,
    #[serde(deserialize_with = "optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(deserialize_with = "optional_time")]
    pub time: Option<NaiveTime>,
    pub image_url: String,
}

/// Event update payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateEvent {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    #[serde(deserialize_with = "optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(deserialize_with = "optional_time")]
    pub time: Option<NaiveTime>,
    pub image_url: Option<String>,
}

// Empty strings come from cleared form inputs and mean "not given".
fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| {
            // Accept full timestamps by keeping the date part.
            let date = s.trim().get(..10).unwrap_or(s.trim());
            NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(de::Error::custom)
        })
        .transpose()
}

// HTML time inputs send "HH:MM"; databases hand back "HH:MM:SS".
fn optional_time<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| {
            let s = s.trim();
            NaiveTime::parse_from_str(s, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                .map_err(de::Error::custom)
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_short_times_and_blank_dates() {
        let event: NewEvent = serde_json::from_str(
            r#"{"name": "Harvest Fair", "date": "", "time": "18:30"}"#,
        )
        .unwrap();

        assert_eq!(event.date, None);
        assert_eq!(event.time, NaiveTime::from_hms_opt(18, 30, 0));
        assert_eq!(event.description, "");
    }

    #[test]
    fn keeps_date_part_of_timestamps() {
        let update: UpdateEvent =
            serde_json::from_str(r#"{"date": "2025-07-14T00:00:00.000Z"}"#).unwrap();
        assert_eq!(update.date, NaiveDate::from_ymd_opt(2025, 7, 14));
        assert!(update.name.is_none());
    }

    #[test]
    fn rejects_garbage_dates() {
        assert!(serde_json::from_str::<NewEvent>(r#"{"date": "next week"}"#).is_err());
    }
}
