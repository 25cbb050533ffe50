use bloom_database::*;

#[tokio::test]
async fn connect_in_memory_and_health_check() {
    let db = Database::builder()
        .url("mem://")
        .session("test_ns", "test_db")
        .init()
        .await
        .expect("connect to mem://");

    // Health should be OK for mem://
    db.health().await.expect("health check");
    db.use_ns("test_ns").use_db("test_db").await.expect("session switch");
}

#[tokio::test]
async fn missing_parameters_fail_validation() {
    let err = Database::builder().init().await.unwrap_err();
    assert!(matches!(err, DatabaseError::Validation { .. }));
}

#[tokio::test]
async fn schema_bootstrap_is_idempotent() {
    // Two inits against the same embedded engine instance would each see their
    // own store for mem://, so idempotence is checked through the ledger table.
    let db = Database::builder()
        .url("mem://")
        .session("test_ns", "migrations")
        .init()
        .await
        .expect("connect to mem://");

    let mut response = db.query("SELECT slice_key FROM migration").await.expect("ledger query");
    let rows = response.take::<Vec<surrealdb::types::Value>>(0).expect("ledger rows");
    assert!(!rows.is_empty(), "bootstrap should record applied migrations");
}
