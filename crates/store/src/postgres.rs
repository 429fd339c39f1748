use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};

use common::{CustomerId, LedgerEntryId, OrderId, ProductTypeId, UserId, VendorId};
use domain::{
    Customer, DiffPayload, EventType, LedgerEntry, Order, OrderNumber, OrderStatus, ProductType,
    Role, User, Vendor,
};

use crate::{
    Result, StoreError,
    config::StoreConfig,
    store::{OrderFilter, ShopStore},
};

/// Unique constraint backing order-number allocation; a violation here means
/// the caller lost the allocation race and should retry with a fresh number.
const ORDER_NUMBER_CONSTRAINT: &str = "orders_order_number_key";

/// PostgreSQL-backed shop store.
#[derive(Clone)]
pub struct PostgresShopStore {
    pool: PgPool,
}

impl PostgresShopStore {
    /// Creates a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a new pool from configuration.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_customer(row: PgRow) -> Result<Customer> {
        Ok(Customer {
            id: CustomerId::from_string(row.try_get::<String, _>("id")?),
            name: row.try_get("name")?,
            phone: row.try_get("phone")?,
            email: row.try_get("email")?,
            active: row.try_get("active")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_vendor(row: PgRow) -> Result<Vendor> {
        Ok(Vendor {
            id: VendorId::from_string(row.try_get::<String, _>("id")?),
            name: row.try_get("name")?,
            phone: row.try_get("phone")?,
            active: row.try_get("active")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_product_type(row: PgRow) -> Result<ProductType> {
        Ok(ProductType {
            id: ProductTypeId::from_string(row.try_get::<String, _>("id")?),
            name: row.try_get("name")?,
            active: row.try_get("active")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_user(row: PgRow) -> Result<User> {
        let role: String = row.try_get("role")?;
        Ok(User {
            id: UserId::from_string(row.try_get::<String, _>("id")?),
            username: row.try_get("username")?,
            display_name: row.try_get("display_name")?,
            password_digest: row.try_get("password_digest")?,
            role: Role::parse(&role)
                .ok_or_else(|| StoreError::Corrupt(format!("unknown role {role:?}")))?,
            active: row.try_get("active")?,
            sessions_revoked_at: row.try_get("sessions_revoked_at")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let number: String = row.try_get("order_number")?;
        let status: String = row.try_get("status")?;
        Ok(Order {
            id: OrderId::from_string(row.try_get::<String, _>("id")?),
            order_number: OrderNumber::parse(&number)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            customer_id: CustomerId::from_string(row.try_get::<String, _>("customer_id")?),
            product_type_id: ProductTypeId::from_string(
                row.try_get::<String, _>("product_type_id")?,
            ),
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            quantity: row.try_get("quantity")?,
            status: OrderStatus::parse(&status)
                .ok_or_else(|| StoreError::Corrupt(format!("unknown status {status:?}")))?,
            process_stage: row.try_get("process_stage")?,
            current_vendor_id: row
                .try_get::<Option<String>, _>("current_vendor_id")?
                .map(VendorId::from_string),
            received_date: row.try_get::<NaiveDate, _>("received_date")?,
            promised_date: row.try_get::<NaiveDate, _>("promised_date")?,
            internal_due_date: row.try_get::<Option<NaiveDate>, _>("internal_due_date")?,
            delivered_at: row.try_get::<Option<DateTime<Utc>>, _>("delivered_at")?,
            notes: row.try_get("notes")?,
            is_deleted: row.try_get("is_deleted")?,
            is_test: row.try_get("is_test")?,
            revision: row.try_get("revision")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_entry(row: PgRow) -> Result<LedgerEntry> {
        let event_type: String = row.try_get("event_type")?;
        let payload: serde_json::Value = row.try_get("payload")?;
        Ok(LedgerEntry {
            id: LedgerEntryId::from_string(row.try_get::<String, _>("id")?),
            order_id: OrderId::from_string(row.try_get::<String, _>("order_id")?),
            seq: row.try_get("seq")?,
            actor_user_id: UserId::from_string(row.try_get::<String, _>("actor_user_id")?),
            event_type: EventType::parse(&event_type).ok_or_else(|| {
                StoreError::Corrupt(format!("unknown event type {event_type:?}"))
            })?,
            occurred_at: row.try_get("occurred_at")?,
            summary: row.try_get("summary")?,
            payload: serde_json::from_value::<DiffPayload>(payload)?,
            is_deleted: row.try_get("is_deleted")?,
            is_test: row.try_get("is_test")?,
        })
    }

    /// Appends the ledger entry inside the caller's transaction. `seq` is
    /// assigned by the database.
    async fn append_entry(conn: &mut PgConnection, entry: &LedgerEntry) -> Result<()> {
        let payload = serde_json::to_value(&entry.payload)?;
        sqlx::query(
            r#"
            INSERT INTO order_ledger_entries
                (id, order_id, actor_user_id, event_type, occurred_at, summary, payload, is_deleted, is_test)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id.as_str())
        .bind(entry.order_id.as_str())
        .bind(entry.actor_user_id.as_str())
        .bind(entry.event_type.as_str())
        .bind(entry.occurred_at)
        .bind(&entry.summary)
        .bind(payload)
        .bind(entry.is_deleted)
        .bind(entry.is_test)
        .execute(conn)
        .await?;
        Ok(())
    }

    async fn write_order_row(conn: &mut PgConnection, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders
                (id, order_number, customer_id, product_type_id, title, description, quantity,
                 status, process_stage, current_vendor_id, received_date, promised_date,
                 internal_due_date, delivered_at, notes, is_deleted, is_test, revision,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            "#,
        )
        .bind(order.id.as_str())
        .bind(order.order_number.as_str())
        .bind(order.customer_id.as_str())
        .bind(order.product_type_id.as_str())
        .bind(&order.title)
        .bind(&order.description)
        .bind(order.quantity)
        .bind(order.status.as_str())
        .bind(&order.process_stage)
        .bind(order.current_vendor_id.as_ref().map(|v| v.as_str()))
        .bind(order.received_date)
        .bind(order.promised_date)
        .bind(order.internal_due_date)
        .bind(order.delivered_at)
        .bind(&order.notes)
        .bind(order.is_deleted)
        .bind(order.is_test)
        .bind(order.revision)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(conn)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some(ORDER_NUMBER_CONSTRAINT)
            {
                return StoreError::DuplicateOrderNumber {
                    order_number: order.order_number.to_string(),
                };
            }
            StoreError::Database(e)
        })?;
        Ok(())
    }
}

#[async_trait]
impl ShopStore for PostgresShopStore {
    async fn insert_customer(&self, customer: &Customer) -> Result<()> {
        sqlx::query(
            "INSERT INTO customers (id, name, phone, email, active, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(customer.id.as_str())
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(customer.active)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_customer(&self, id: &CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query("SELECT * FROM customers WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_customer).transpose()
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        let rows = sqlx::query("SELECT * FROM customers ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_customer).collect()
    }

    async fn set_customer_active(
        &self,
        id: &CustomerId,
        active: bool,
    ) -> Result<Option<Customer>> {
        let row = sqlx::query("UPDATE customers SET active = $2 WHERE id = $1 RETURNING *")
            .bind(id.as_str())
            .bind(active)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_customer).transpose()
    }

    async fn insert_vendor(&self, vendor: &Vendor) -> Result<()> {
        sqlx::query(
            "INSERT INTO vendors (id, name, phone, active, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(vendor.id.as_str())
        .bind(&vendor.name)
        .bind(&vendor.phone)
        .bind(vendor.active)
        .bind(vendor.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_vendor(&self, id: &VendorId) -> Result<Option<Vendor>> {
        let row = sqlx::query("SELECT * FROM vendors WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_vendor).transpose()
    }

    async fn list_vendors(&self) -> Result<Vec<Vendor>> {
        let rows = sqlx::query("SELECT * FROM vendors ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_vendor).collect()
    }

    async fn set_vendor_active(&self, id: &VendorId, active: bool) -> Result<Option<Vendor>> {
        let row = sqlx::query("UPDATE vendors SET active = $2 WHERE id = $1 RETURNING *")
            .bind(id.as_str())
            .bind(active)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_vendor).transpose()
    }

    async fn insert_product_type(&self, product_type: &ProductType) -> Result<()> {
        sqlx::query(
            "INSERT INTO product_types (id, name, active, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(product_type.id.as_str())
        .bind(&product_type.name)
        .bind(product_type.active)
        .bind(product_type.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_product_type(&self, id: &ProductTypeId) -> Result<Option<ProductType>> {
        let row = sqlx::query("SELECT * FROM product_types WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_product_type).transpose()
    }

    async fn list_product_types(&self) -> Result<Vec<ProductType>> {
        let rows = sqlx::query("SELECT * FROM product_types ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_product_type).collect()
    }

    async fn set_product_type_active(
        &self,
        id: &ProductTypeId,
        active: bool,
    ) -> Result<Option<ProductType>> {
        let row = sqlx::query("UPDATE product_types SET active = $2 WHERE id = $1 RETURNING *")
            .bind(id.as_str())
            .bind(active)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_product_type).transpose()
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, username, display_name, password_digest, role, active, sessions_revoked_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id.as_str())
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(&user.password_digest)
        .bind(user.role.as_str())
        .bind(user.active)
        .bind(user.sessions_revoked_at)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_user).transpose()
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_user).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY username ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_user).collect()
    }

    async fn max_order_number(&self, month_key: &str) -> Result<Option<OrderNumber>> {
        let max: Option<String> = sqlx::query_scalar(
            "SELECT MAX(order_number) FROM orders WHERE order_number LIKE $1 || '-%'",
        )
        .bind(month_key)
        .fetch_one(&self.pool)
        .await?;

        max.map(|value| {
            OrderNumber::parse(&value).map_err(|e| StoreError::Corrupt(e.to_string()))
        })
        .transpose()
    }

    async fn insert_order(&self, order: &Order, entry: &LedgerEntry) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::write_order_row(&mut tx, order).await?;
        Self::append_entry(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_order(
        &self,
        expected_revision: i64,
        after: &Order,
        entry: &LedgerEntry,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                customer_id = $3, product_type_id = $4, title = $5, description = $6,
                quantity = $7, status = $8, process_stage = $9, current_vendor_id = $10,
                received_date = $11, promised_date = $12, internal_due_date = $13,
                delivered_at = $14, notes = $15, is_deleted = $16, revision = $17,
                updated_at = $18
            WHERE id = $1 AND revision = $2
            "#,
        )
        .bind(after.id.as_str())
        .bind(expected_revision)
        .bind(after.customer_id.as_str())
        .bind(after.product_type_id.as_str())
        .bind(&after.title)
        .bind(&after.description)
        .bind(after.quantity)
        .bind(after.status.as_str())
        .bind(&after.process_stage)
        .bind(after.current_vendor_id.as_ref().map(|v| v.as_str()))
        .bind(after.received_date)
        .bind(after.promised_date)
        .bind(after.internal_due_date)
        .bind(after.delivered_at)
        .bind(&after.notes)
        .bind(after.is_deleted)
        .bind(after.revision)
        .bind(after.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // stale read: the diff was computed from a revision that is gone
            tx.rollback().await?;
            return Err(StoreError::RevisionConflict {
                order_id: after.id.clone(),
                expected: expected_revision,
            });
        }

        Self::append_entry(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_order).transpose()
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        let mut sql = String::from("SELECT * FROM orders WHERE is_deleted = FALSE");
        let mut param_count = 0;

        if !filter.include_test {
            sql.push_str(" AND is_test = FALSE");
        }
        if filter.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }
        if filter.customer_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND customer_id = ${param_count}"));
        }
        if filter.vendor_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND current_vendor_id = ${param_count}"));
        }
        if filter.product_type_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND product_type_id = ${param_count}"));
        }
        if filter.promised_from.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND promised_date >= ${param_count}"));
        }
        if filter.promised_to.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND promised_date <= ${param_count}"));
        }

        sql.push_str(" ORDER BY promised_date ASC, updated_at DESC");

        let mut query = sqlx::query(&sql);
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(ref customer_id) = filter.customer_id {
            query = query.bind(customer_id.as_str());
        }
        if let Some(ref vendor_id) = filter.vendor_id {
            query = query.bind(vendor_id.as_str());
        }
        if let Some(ref product_type_id) = filter.product_type_id {
            query = query.bind(product_type_id.as_str());
        }
        if let Some(from) = filter.promised_from {
            query = query.bind(from);
        }
        if let Some(to) = filter.promised_to {
            query = query.bind(to);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn get_ledger_for_order(&self, order_id: &OrderId) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM order_ledger_entries WHERE order_id = $1 ORDER BY occurred_at ASC, seq ASC",
        )
        .bind(order_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_entry).collect()
    }
}
