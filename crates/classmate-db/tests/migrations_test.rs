//! Integration tests for embedded migrations.

use classmate_db::config::DbConfig;
use classmate_db::pool;
use classmate_db::queries::schedule_events;
use classmate_test_utils::{create_test_db, drop_test_db, pg_url};
use uuid::Uuid;

#[tokio::test]
async fn migrations_create_schedule_table() {
    let (pool, db_name) = create_test_db().await;

    assert_eq!(schedule_events::count_events(&pool).await.unwrap(), 0);

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let (pool, db_name) = create_test_db().await;

    // create_test_db already ran them once.
    pool::migrate(&pool).await.unwrap();
    pool::migrate(&pool).await.unwrap();

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn event_type_is_constrained() {
    let (pool, db_name) = create_test_db().await;

    let result = sqlx::query(
        "INSERT INTO schedule_events (title, date, event_type) VALUES ('x', '2024-05-01', 'party')",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err());

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn missing_database_is_created_once() {
    let db_name = format!("classmate_init_{}", Uuid::new_v4().simple());
    let config = DbConfig::new(format!("{}/{db_name}", pg_url().await));

    assert!(pool::create_database_if_missing(&config).await.unwrap());
    assert!(!pool::create_database_if_missing(&config).await.unwrap());

    let pool = pool::connect(&config).await.unwrap();
    pool::migrate(&pool).await.unwrap();
    assert_eq!(schedule_events::count_events(&pool).await.unwrap(), 0);
    pool.close().await;

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn unnamed_database_is_an_error() {
    let config = DbConfig::new(pg_url().await);
    let err = pool::create_database_if_missing(&config).await.unwrap_err();
    assert!(err.to_string().contains("does not name a database"));
}
