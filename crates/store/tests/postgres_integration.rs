//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use common::{OrderId, UserId};
use domain::{
    Customer, LedgerEntry, NewOrder, Order, OrderNumber, OrderPatch, OrderStatus, ProductType,
    Role, User, Vendor,
};
use serial_test::serial;
use sqlx::PgPool;
use store::{OrderFilter, PostgresShopStore, ShopStore, StoreError};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run migrations using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_shop_tables.sql"
            ))
            .execute(&temp_pool)
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
async fn get_test_store() -> PostgresShopStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation. TRUNCATE does not fire the row-level
    // append-only trigger, so the ledger table can be reset here.
    sqlx::query(
        "TRUNCATE TABLE order_ledger_entries, orders, customers, vendors, product_types, users",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresShopStore::new(pool)
}

/// Seeds the master data an order row needs, returning the actor's id.
async fn seed_master_data(store: &PostgresShopStore) -> (Customer, ProductType, Vendor, UserId) {
    let customer = Customer::new("Corner Cafe", Some("555-0101".to_string()), None);
    store.insert_customer(&customer).await.unwrap();

    let product_type = ProductType::new("Flyer");
    store.insert_product_type(&product_type).await.unwrap();

    let vendor = Vendor::new("Laminating Co", None);
    store.insert_vendor(&vendor).await.unwrap();

    let user = User::new("owner", "Shop Owner", "digest$test", Role::Owner);
    let user_id = user.id.clone();
    store.insert_user(&user).await.unwrap();

    (customer, product_type, vendor, user_id)
}

fn build_order(
    number: &str,
    customer: &Customer,
    product_type: &ProductType,
    promised: NaiveDate,
) -> Order {
    Order::create(
        NewOrder {
            id: OrderId::generate(),
            order_number: OrderNumber::parse(number).unwrap(),
            customer_id: customer.id.clone(),
            product_type_id: product_type.id.clone(),
            title: "500 flyers".to_string(),
            description: None,
            quantity: Some(500),
            received_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            promised_date: promised,
            internal_due_date: None,
            notes: None,
            is_test: false,
        },
        Utc::now(),
    )
}

#[tokio::test]
#[serial]
async fn insert_and_retrieve_order_with_ledger() {
    let store = get_test_store().await;
    let (customer, product_type, _, actor) = seed_master_data(&store).await;

    let order = build_order(
        "2602-0001",
        &customer,
        &product_type,
        NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(),
    );
    let entry = LedgerEntry::created(&order, &actor, order.created_at);
    store.insert_order(&order, &entry).await.unwrap();

    let stored = store.get_order(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.order_number, order.order_number);
    assert_eq!(stored.status, OrderStatus::New);
    assert_eq!(stored.revision, 1);

    let ledger = store.get_ledger_for_order(&order.id).await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].summary, entry.summary);
    assert!(ledger[0].seq > 0);
    assert_eq!(ledger[0].payload, entry.payload);
}

#[tokio::test]
#[serial]
async fn duplicate_order_number_rolls_back_both_writes() {
    let store = get_test_store().await;
    let (customer, product_type, _, actor) = seed_master_data(&store).await;
    let promised = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();

    let first = build_order("2602-0001", &customer, &product_type, promised);
    let entry = LedgerEntry::created(&first, &actor, first.created_at);
    store.insert_order(&first, &entry).await.unwrap();

    let second = build_order("2602-0001", &customer, &product_type, promised);
    let entry = LedgerEntry::created(&second, &actor, second.created_at);
    let result = store.insert_order(&second, &entry).await;

    assert!(matches!(
        result,
        Err(StoreError::DuplicateOrderNumber { .. })
    ));
    assert!(store.get_order(&second.id).await.unwrap().is_none());
    assert!(
        store
            .get_ledger_for_order(&second.id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
#[serial]
async fn update_order_guards_on_revision() {
    let store = get_test_store().await;
    let (customer, product_type, _, actor) = seed_master_data(&store).await;

    let order = build_order(
        "2602-0001",
        &customer,
        &product_type,
        NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(),
    );
    let entry = LedgerEntry::created(&order, &actor, order.created_at);
    store.insert_order(&order, &entry).await.unwrap();

    let patch = OrderPatch {
        title: Some("750 flyers".to_string()),
        ..OrderPatch::default()
    };
    let mutation = order.revise(&patch, &actor, Utc::now()).unwrap();
    store
        .update_order(order.revision, &mutation.after, &mutation.entry)
        .await
        .unwrap();

    let stored = store.get_order(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "750 flyers");
    assert_eq!(stored.revision, 2);

    // a writer still holding revision 1 must be rejected without side effects
    let stale = order
        .revise(
            &OrderPatch {
                title: Some("600 flyers".to_string()),
                ..OrderPatch::default()
            },
            &actor,
            Utc::now(),
        )
        .unwrap();
    let result = store
        .update_order(order.revision, &stale.after, &stale.entry)
        .await;
    assert!(matches!(result, Err(StoreError::RevisionConflict { .. })));

    let ledger = store.get_ledger_for_order(&order.id).await.unwrap();
    assert_eq!(ledger.len(), 2);
}

#[tokio::test]
#[serial]
async fn ledger_rows_cannot_be_updated() {
    let store = get_test_store().await;
    let (customer, product_type, _, actor) = seed_master_data(&store).await;

    let order = build_order(
        "2602-0001",
        &customer,
        &product_type,
        NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(),
    );
    let entry = LedgerEntry::created(&order, &actor, order.created_at);
    store.insert_order(&order, &entry).await.unwrap();

    // bypass the store API entirely: the trigger must still reject the write
    let result = sqlx::query("UPDATE order_ledger_entries SET summary = 'rewritten history'")
        .execute(store.pool())
        .await;

    let err = result.unwrap_err().to_string();
    assert!(err.contains("append-only"), "unexpected error: {err}");

    let ledger = store.get_ledger_for_order(&order.id).await.unwrap();
    assert_eq!(ledger[0].summary, entry.summary);
}

#[tokio::test]
#[serial]
async fn ledger_rows_cannot_be_deleted() {
    let store = get_test_store().await;
    let (customer, product_type, _, actor) = seed_master_data(&store).await;

    let order = build_order(
        "2602-0001",
        &customer,
        &product_type,
        NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(),
    );
    let entry = LedgerEntry::created(&order, &actor, order.created_at);
    store.insert_order(&order, &entry).await.unwrap();

    let result = sqlx::query("DELETE FROM order_ledger_entries")
        .execute(store.pool())
        .await;

    let err = result.unwrap_err().to_string();
    assert!(err.contains("append-only"), "unexpected error: {err}");

    assert_eq!(store.get_ledger_for_order(&order.id).await.unwrap().len(), 1);
}

#[tokio::test]
#[serial]
async fn max_order_number_is_scoped_to_month() {
    let store = get_test_store().await;
    let (customer, product_type, _, actor) = seed_master_data(&store).await;
    let promised = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();

    for number in ["2601-0009", "2602-0002", "2602-0010"] {
        let order = build_order(number, &customer, &product_type, promised);
        let entry = LedgerEntry::created(&order, &actor, order.created_at);
        store.insert_order(&order, &entry).await.unwrap();
    }

    let max = store.max_order_number("2602").await.unwrap().unwrap();
    assert_eq!(max.as_str(), "2602-0010");
    assert!(store.max_order_number("2603").await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn list_orders_filters_and_orders_coarsely() {
    let store = get_test_store().await;
    let (customer, product_type, vendor, actor) = seed_master_data(&store).await;

    let soon = NaiveDate::from_ymd_opt(2026, 2, 5).unwrap();
    let later = NaiveDate::from_ymd_opt(2026, 2, 20).unwrap();

    let urgent = build_order("2602-0001", &customer, &product_type, soon);
    let entry = LedgerEntry::created(&urgent, &actor, urgent.created_at);
    store.insert_order(&urgent, &entry).await.unwrap();

    let relaxed = build_order("2602-0002", &customer, &product_type, later);
    let entry = LedgerEntry::created(&relaxed, &actor, relaxed.created_at);
    store.insert_order(&relaxed, &entry).await.unwrap();

    let listed = store.list_orders(&OrderFilter::default()).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, urgent.id);

    // send one to a vendor and filter on it
    let mutation = urgent
        .change_status(OrderStatus::InProgress, &actor, Utc::now())
        .unwrap()
        .unwrap();
    store
        .update_order(urgent.revision, &mutation.after, &mutation.entry)
        .await
        .unwrap();
    let with_vendor = mutation
        .after
        .assign_vendor(Some(vendor.id.clone()), &actor, Utc::now())
        .unwrap();
    store
        .update_order(
            mutation.after.revision,
            &with_vendor.after,
            &with_vendor.entry,
        )
        .await
        .unwrap();

    let filter = OrderFilter {
        vendor_id: Some(vendor.id.clone()),
        ..OrderFilter::default()
    };
    let listed = store.list_orders(&filter).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, urgent.id);

    let filter = OrderFilter {
        promised_to: Some(NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()),
        ..OrderFilter::default()
    };
    let listed = store.list_orders(&filter).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, urgent.id);
}

#[tokio::test]
#[serial]
async fn users_roundtrip_with_role() {
    let store = get_test_store().await;

    let user = User::new("meral", "Meral", "digest$abc", Role::Employee);
    store.insert_user(&user).await.unwrap();

    let by_id = store.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(by_id.role, Role::Employee);

    let by_name = store.get_user_by_username("meral").await.unwrap().unwrap();
    assert_eq!(by_name.id, user.id);

    assert!(
        store
            .get_user_by_username("nobody")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
#[serial]
async fn replayed_ledger_matches_stored_projection() {
    let store = get_test_store().await;
    let (customer, product_type, vendor, actor) = seed_master_data(&store).await;

    let order = build_order(
        "2602-0001",
        &customer,
        &product_type,
        NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(),
    );
    let entry = LedgerEntry::created(&order, &actor, order.created_at);
    store.insert_order(&order, &entry).await.unwrap();

    let m1 = order
        .change_status(OrderStatus::InProgress, &actor, Utc::now())
        .unwrap()
        .unwrap();
    store
        .update_order(order.revision, &m1.after, &m1.entry)
        .await
        .unwrap();

    let m2 = m1
        .after
        .assign_vendor(Some(vendor.id.clone()), &actor, Utc::now())
        .unwrap();
    store
        .update_order(m1.after.revision, &m2.after, &m2.entry)
        .await
        .unwrap();

    let stored = store.get_order(&order.id).await.unwrap().unwrap();
    let ledger = store.get_ledger_for_order(&order.id).await.unwrap();
    let replayed = domain::replay(&ledger).unwrap();

    // compare field by field: Postgres stores timestamps at microsecond
    // precision, so exact timestamp equality belongs to the in-memory tests
    assert_eq!(replayed.id, stored.id);
    assert_eq!(replayed.status, stored.status);
    assert_eq!(replayed.current_vendor_id, stored.current_vendor_id);
    assert_eq!(replayed.revision, stored.revision);
}
