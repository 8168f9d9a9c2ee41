//! Partial-update query builder
//!
//! Repositories describe an update as a patch struct whose members are all
//! `Option`s. [`UpdateQuery`] turns the present members into a parameterized
//! `UPDATE ... SET` statement; absent members are never written. A patch with
//! no present members produces no statement at all, so callers can report a
//! no-op without touching the database.
//!
//! ```rust
//! use common::patch::UpdateQuery;
//!
//! let mut update = UpdateQuery::new("businesses").touching("updated_at");
//! update
//!     .set("name", Some("Harbour Cafe".to_string()))
//!     .set("contact", None::<String>);
//!
//! let query = update.finish("id", 7_i64).expect("one field present");
//! assert_eq!(
//!     query.sql(),
//!     "UPDATE businesses SET name = $1, updated_at = NOW() WHERE id = $2"
//! );
//! ```

use sqlx::{Encode, Postgres, QueryBuilder, Type};

/// Builder for `UPDATE <table> SET <present fields> WHERE <key> = $n`
pub struct UpdateQuery<'args> {
    builder: QueryBuilder<'args, Postgres>,
    fields: usize,
    timestamp_column: Option<&'static str>,
}

impl<'args> UpdateQuery<'args> {
    pub fn new(table: &str) -> Self {
        let mut builder = QueryBuilder::new("UPDATE ");
        builder.push(table).push(" SET ");

        Self {
            builder,
            fields: 0,
            timestamp_column: None,
        }
    }

    /// Also set `column = NOW()` whenever at least one field is written
    pub fn touching(mut self, column: &'static str) -> Self {
        self.timestamp_column = Some(column);
        self
    }

    /// Bind `column = value` when the value is present.
    ///
    /// Use `Option<Option<T>>` for nullable columns: `Some(None)` writes NULL.
    pub fn set<T>(&mut self, column: &str, value: Option<T>) -> &mut Self
    where
        T: 'args + Encode<'args, Postgres> + Type<Postgres> + Send,
    {
        if let Some(value) = value {
            self.separator();
            self.builder.push(column).push(" = ").push_bind(value);
            self.fields += 1;
        }
        self
    }

    /// Number of fields that will be written
    pub fn len(&self) -> usize {
        self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields == 0
    }

    /// Close the statement with its key predicate.
    ///
    /// Returns `None` when no field was set.
    pub fn finish<K>(mut self, key_column: &str, key: K) -> Option<QueryBuilder<'args, Postgres>>
    where
        K: 'args + Encode<'args, Postgres> + Type<Postgres> + Send,
    {
        if self.is_empty() {
            return None;
        }

        if let Some(column) = self.timestamp_column {
            self.separator();
            self.builder.push(column).push(" = NOW()");
        }

        self.builder
            .push(" WHERE ")
            .push(key_column)
            .push(" = ")
            .push_bind(key);

        Some(self.builder)
    }

    fn separator(&mut self) {
        if self.fields > 0 {
            self.builder.push(", ");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_patch_builds_nothing() {
        let mut update = UpdateQuery::new("events").touching("updated_at");
        update
            .set("name", None::<String>)
            .set("location", None::<String>);

        assert!(update.is_empty());
        assert!(update.finish("id", 1_i64).is_none());
    }

    #[test]
    fn only_present_fields_are_written() {
        let mut update = UpdateQuery::new("tourism_destinations").touching("updated_at");
        update
            .set("name", Some("Lake X".to_string()))
            .set("description", None::<String>)
            .set("featured", Some(true));

        assert_eq!(update.len(), 2);
        let query = update.finish("id", 3_i64).unwrap();
        assert_eq!(
            query.sql(),
            "UPDATE tourism_destinations SET name = $1, featured = $2, updated_at = NOW() WHERE id = $3"
        );
    }

    #[test]
    fn nullable_column_can_be_cleared() {
        let mut update = UpdateQuery::new("tourism_images");
        update.set("caption", Some(None::<String>));

        let query = update.finish("id", 9_i64).unwrap();
        assert_eq!(query.sql(), "UPDATE tourism_images SET caption = $1 WHERE id = $2");
    }

    #[test]
    fn timestamp_alone_does_not_count_as_a_change() {
        let update = UpdateQuery::new("forum_posts").touching("updated_at");
        assert!(update.finish("id", 1_i64).is_none());
    }
}
