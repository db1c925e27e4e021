//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and truncate the tables
//! before each test, so they run serially. Run with:
//!
//! ```bash
//! cargo test -p delivery-store --test postgres_integration
//! ```

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use delivery_store::{
    DeliveryId, DeliveryStatus, DeliveryStore, ListQuery, PostgresDeliveryStore, ShippingAddress,
    StoreError, TrackingNumber, UpdateDelivery,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresDeliveryStore::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresDeliveryStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE delivery_events, delivery_addresses, deliveries")
        .execute(&pool)
        .await
        .unwrap();

    PostgresDeliveryStore::new(pool)
}

fn address() -> ShippingAddress {
    ShippingAddress::new("1 Infinite Loop", "Cupertino", "CA", "US", "95014")
}

async fn count(store: &PostgresDeliveryStore, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(store.pool())
        .await
        .unwrap()
}

#[tokio::test]
#[serial]
async fn create_persists_all_three_records() {
    let store = get_test_store().await;

    let delivery = store.create_delivery("ORD-1", &address()).await.unwrap();
    assert_eq!(delivery.status.as_str(), DeliveryStatus::PENDING);
    assert!(delivery.tracking_number.is_well_formed());

    let stored = store.get_delivery(delivery.id).await.unwrap().unwrap();
    assert_eq!(stored, delivery);
    assert_eq!(stored.shipping_address, address());

    let events = store.events_for_delivery(delivery.id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].location, "Warehouse");
    assert_eq!(events[0].timestamp, delivery.created_at);
}

#[tokio::test]
#[serial]
async fn estimated_delivery_is_three_days_out() {
    let store = get_test_store().await;
    let delivery = store.create_delivery("ORD-1", &address()).await.unwrap();
    assert_eq!(
        delivery.estimated_delivery_time - delivery.created_at,
        TimeDelta::hours(72)
    );
}

/// Runs `create_delivery` while a temporary CHECK constraint on `table`
/// rejects one of its inserts, then removes the constraint again.
async fn create_with_failing_insert(
    store: &PostgresDeliveryStore,
    table: &str,
    check: &str,
    shipping: &ShippingAddress,
) -> delivery_store::Result<delivery_store::Delivery> {
    sqlx::query(&format!(
        "ALTER TABLE {table} ADD CONSTRAINT reject_insert CHECK ({check})"
    ))
    .execute(store.pool())
    .await
    .unwrap();

    let result = store.create_delivery("ORD-1", shipping).await;

    sqlx::query(&format!(
        "ALTER TABLE {table} DROP CONSTRAINT IF EXISTS reject_insert"
    ))
    .execute(store.pool())
    .await
    .unwrap();
    result
}

async fn assert_nothing_persisted(store: &PostgresDeliveryStore) {
    assert_eq!(count(store, "deliveries").await, 0);
    assert_eq!(count(store, "delivery_addresses").await, 0);
    assert_eq!(count(store, "delivery_events").await, 0);
}

#[tokio::test]
#[serial]
async fn failed_address_insert_rolls_back_the_delivery() {
    let store = get_test_store().await;
    let mut shipping = address();
    shipping.zip_code = "00000".to_string();

    let err = create_with_failing_insert(
        &store,
        "delivery_addresses",
        "zip_code <> '00000'",
        &shipping,
    )
    .await
    .unwrap_err();

    assert!(
        matches!(
            &err,
            StoreError::ConstraintViolation { constraint: Some(name), .. } if name == "reject_insert"
        ),
        "{err:?}"
    );
    assert_nothing_persisted(&store).await;
}

#[tokio::test]
#[serial]
async fn failed_event_insert_rolls_back_the_delivery_and_address() {
    let store = get_test_store().await;

    let err = create_with_failing_insert(
        &store,
        "delivery_events",
        "location <> 'Warehouse'",
        &address(),
    )
    .await
    .unwrap_err();

    assert!(
        matches!(
            &err,
            StoreError::ConstraintViolation { constraint: Some(name), .. } if name == "reject_insert"
        ),
        "{err:?}"
    );
    assert_nothing_persisted(&store).await;

    // The store is usable again once the constraint is gone.
    store.create_delivery("ORD-1", &address()).await.unwrap();
    assert_eq!(count(&store, "delivery_events").await, 1);
}

#[tokio::test]
#[serial]
async fn duplicate_tracking_number_is_a_constraint_violation() {
    let store = get_test_store().await;
    let first = store.create_delivery("ORD-1", &address()).await.unwrap();

    let now = Utc::now();
    let err: StoreError = sqlx::query(
        r#"
        INSERT INTO deliveries (id, order_id, status, tracking_number,
            estimated_delivery_time, created_at, updated_at)
        VALUES ($1, 'ORD-2', 'PENDING', $2, $3, $3, $3)
        "#,
    )
    .bind(DeliveryId::new().as_uuid())
    .bind(first.tracking_number.as_str())
    .bind(now)
    .execute(store.pool())
    .await
    .unwrap_err()
    .into();

    match err {
        StoreError::ConstraintViolation { constraint, .. } => {
            assert_eq!(constraint.as_deref(), Some("unique_tracking_number"));
        }
        other => panic!("expected constraint violation, got {other:?}"),
    }
}

#[tokio::test]
#[serial]
async fn update_appends_event_with_transaction_timestamp() {
    let store = get_test_store().await;
    let delivery = store.create_delivery("ORD-1", &address()).await.unwrap();

    let updated = store
        .update_delivery(&UpdateDelivery::new(
            delivery.id,
            "IN_TRANSIT",
            "Sort Center",
            "Departed facility",
        ))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.status.as_str(), "IN_TRANSIT");
    assert!(updated.actual_delivery_time.is_none());

    let events = store.events_for_delivery(delivery.id).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].status.as_str(), "IN_TRANSIT");
    assert_eq!(events[1].timestamp, updated.updated_at);
}

#[tokio::test]
#[serial]
async fn delivered_update_stamps_actual_delivery_time() {
    let store = get_test_store().await;
    let delivery = store.create_delivery("ORD-1", &address()).await.unwrap();

    let delivered = store
        .update_delivery(&UpdateDelivery::new(
            delivery.id,
            DeliveryStatus::DELIVERED,
            "Customer",
            "Handed to recipient",
        ))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(delivered.actual_delivery_time, Some(delivered.updated_at));

    let later = store
        .update_delivery(&UpdateDelivery::new(delivery.id, "RETURNED", "Depot", ""))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(later.actual_delivery_time, delivered.actual_delivery_time);
}

#[tokio::test]
#[serial]
async fn update_unknown_delivery_leaves_no_trace() {
    let store = get_test_store().await;
    store.create_delivery("ORD-1", &address()).await.unwrap();

    let result = store
        .update_delivery(&UpdateDelivery::new(
            DeliveryId::new(),
            "DELIVERED",
            "Nowhere",
            "Ghost",
        ))
        .await
        .unwrap();

    assert!(result.is_none());
    assert_eq!(count(&store, "delivery_events").await, 1);
    assert_eq!(count(&store, "deliveries").await, 1);
}

#[tokio::test]
#[serial]
async fn concurrent_updates_are_serialized() {
    let store = get_test_store().await;
    let delivery = store.create_delivery("ORD-1", &address()).await.unwrap();

    let updates = (0..8).map(|i| {
        let store = store.clone();
        let update = UpdateDelivery::new(delivery.id, format!("HOP_{i}"), "Hub", "");
        async move { store.update_delivery(&update).await }
    });
    let results = futures_util::future::join_all(updates).await;
    assert!(results.iter().all(|r| matches!(r, Ok(Some(_)))));

    let events = store.events_for_delivery(delivery.id).await.unwrap();
    assert_eq!(events.len(), 9);

    let final_delivery = store.get_delivery(delivery.id).await.unwrap().unwrap();
    assert!(final_delivery.status.as_str().starts_with("HOP_"));
    assert!(events.iter().any(|e| e.status == final_delivery.status));
}

#[tokio::test]
#[serial]
async fn list_paginates_with_deterministic_tie_break() {
    let store = get_test_store().await;
    let mut ids = Vec::new();
    for _ in 0..5 {
        ids.push(store.create_delivery("ORD-1", &address()).await.unwrap().id);
    }
    store.create_delivery("ORD-2", &address()).await.unwrap();

    // Force identical creation timestamps.
    sqlx::query("UPDATE deliveries SET created_at = $1")
        .bind(Utc::now())
        .execute(store.pool())
        .await
        .unwrap();

    let page1 = store
        .list_deliveries(&ListQuery::new("ORD-1", 1, 3))
        .await
        .unwrap();
    let page2 = store
        .list_deliveries(&ListQuery::new("ORD-1", 2, 3))
        .await
        .unwrap();

    assert_eq!(page1.total, 5);
    assert_eq!(page2.total, 5);
    assert_eq!(page1.deliveries.len(), 3);
    assert_eq!(page2.deliveries.len(), 2);

    let listed: Vec<DeliveryId> = page1
        .deliveries
        .iter()
        .chain(page2.deliveries.iter())
        .map(|d| d.id)
        .collect();
    ids.sort();
    assert_eq!(listed, ids);
}

#[tokio::test]
#[serial]
async fn list_total_matches_rows_under_concurrent_creates() {
    let store = get_test_store().await;

    let writer = {
        let store = store.clone();
        tokio::spawn(async move {
            for _ in 0..60 {
                store.create_delivery("ORD-1", &address()).await.unwrap();
            }
        })
    };

    while !writer.is_finished() {
        let page = store
            .list_deliveries(&ListQuery::new("ORD-1", 1, 100))
            .await
            .unwrap();
        assert_eq!(page.deliveries.len() as u64, page.total);
    }
    writer.await.unwrap();

    let page = store
        .list_deliveries(&ListQuery::new("ORD-1", 1, 100))
        .await
        .unwrap();
    assert_eq!(page.total, 60);
    assert_eq!(page.deliveries.len(), 60);
}

#[tokio::test]
#[serial]
async fn list_without_filter_counts_everything() {
    let store = get_test_store().await;
    store.create_delivery("ORD-1", &address()).await.unwrap();
    store.create_delivery("ORD-2", &address()).await.unwrap();

    let page = store.list_deliveries(&ListQuery::all(1, 10)).await.unwrap();
    assert_eq!(page.total, 2);

    let empty = store
        .list_deliveries(&ListQuery::new("ORD-404", 1, 10))
        .await
        .unwrap();
    assert_eq!(empty.total, 0);
    assert!(empty.deliveries.is_empty());
}

#[tokio::test]
#[serial]
async fn track_returns_chronological_events() {
    let store = get_test_store().await;
    let delivery = store.create_delivery("ORD-1", &address()).await.unwrap();
    store
        .update_delivery(&UpdateDelivery::new(
            delivery.id,
            "DELIVERED",
            "Customer",
            "Handed to recipient",
        ))
        .await
        .unwrap();

    let tracked = store
        .track_delivery(&delivery.tracking_number)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tracked.delivery.id, delivery.id);
    let statuses: Vec<_> = tracked.events.iter().map(|e| e.status.as_str()).collect();
    assert_eq!(statuses, vec!["PENDING", "DELIVERED"]);

    let missing = store
        .track_delivery(&TrackingNumber::from("TRK-NOPE0000"))
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
#[serial]
async fn closed_pool_reports_unavailable() {
    let store = get_test_store().await;
    store.close().await;

    let err = store.get_delivery(DeliveryId::new()).await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)), "{err:?}");
}
