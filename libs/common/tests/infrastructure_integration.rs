//! Integration tests for the database plumbing
//!
//! These tests need a reachable PostgreSQL instance configured through
//! `DATABASE_URL`; run them with `cargo test -- --ignored`.

use common::{
    database::{DatabaseConfig, health_check, init_pool},
    patch::UpdateQuery,
};
use sqlx::Row;

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_pool_and_health_check() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    assert!(health_check(&pool).await?, "Database health check failed");

    let row = sqlx::query("SELECT 1 as result").fetch_one(&pool).await?;
    let result: i32 = row.get("result");
    assert_eq!(result, 1);

    Ok(())
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_update_query_touches_only_present_columns() -> Result<(), Box<dyn std::error::Error>>
{
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;
    let mut tx = pool.begin().await?;

    sqlx::query(
        "CREATE TEMP TABLE patch_probe (id BIGINT PRIMARY KEY, name TEXT, note TEXT, updated_at TIMESTAMPTZ)",
    )
    .execute(&mut *tx)
    .await?;
    sqlx::query("INSERT INTO patch_probe VALUES (1, 'before', 'kept', NULL)")
        .execute(&mut *tx)
        .await?;

    let mut update = UpdateQuery::new("patch_probe").touching("updated_at");
    update
        .set("name", Some("after".to_string()))
        .set("note", None::<String>);
    let mut query = update.finish("id", 1_i64).expect("name is present");
    let result = query.build().execute(&mut *tx).await?;
    assert_eq!(result.rows_affected(), 1);

    let row = sqlx::query("SELECT name, note, updated_at IS NOT NULL AS touched FROM patch_probe")
        .fetch_one(&mut *tx)
        .await?;
    assert_eq!(row.get::<String, _>("name"), "after");
    assert_eq!(row.get::<String, _>("note"), "kept");
    assert!(row.get::<bool, _>("touched"));

    tx.rollback().await?;
    Ok(())
}
