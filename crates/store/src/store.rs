use async_trait::async_trait;
use chrono::NaiveDate;

use common::{CustomerId, OrderId, ProductTypeId, UserId, VendorId};
use domain::{Customer, LedgerEntry, Order, OrderNumber, OrderStatus, ProductType, User, Vendor};

use crate::Result;

/// Structural filters for listing orders, applied as conjunctive predicates.
///
/// Soft-deleted orders are always excluded; test orders are excluded unless
/// `include_test` is set. Computed predicates (delay) and free-text search
/// are applied by the caller, because they depend on `now` and on joined
/// customer names.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<CustomerId>,
    pub vendor_id: Option<VendorId>,
    pub product_type_id: Option<ProductTypeId>,
    pub promised_from: Option<NaiveDate>,
    pub promised_to: Option<NaiveDate>,
    pub include_test: bool,
}

/// Storage engine for master data, the order projection table and the
/// order ledger.
///
/// The ledger contract is deliberately asymmetric: `insert_order` and
/// `update_order` each append exactly one ledger entry atomically with the
/// projection write, and no update or delete operation for ledger entries
/// exists anywhere on this interface. The PostgreSQL implementation backs
/// that up with a schema-level trigger, so the append-only invariant holds
/// even against direct SQL.
#[async_trait]
pub trait ShopStore: Send + Sync {
    // --- customers ---

    /// Inserts a new customer.
    async fn insert_customer(&self, customer: &Customer) -> Result<()>;

    /// Fetches a customer by id.
    async fn get_customer(&self, id: &CustomerId) -> Result<Option<Customer>>;

    /// Lists all customers, active and inactive, by name.
    async fn list_customers(&self) -> Result<Vec<Customer>>;

    /// Flips a customer's active flag. Returns the updated row, or `None`
    /// if the customer does not exist.
    async fn set_customer_active(&self, id: &CustomerId, active: bool)
    -> Result<Option<Customer>>;

    // --- vendors ---

    /// Inserts a new vendor.
    async fn insert_vendor(&self, vendor: &Vendor) -> Result<()>;

    /// Fetches a vendor by id.
    async fn get_vendor(&self, id: &VendorId) -> Result<Option<Vendor>>;

    /// Lists all vendors by name.
    async fn list_vendors(&self) -> Result<Vec<Vendor>>;

    /// Flips a vendor's active flag.
    async fn set_vendor_active(&self, id: &VendorId, active: bool) -> Result<Option<Vendor>>;

    // --- product types ---

    /// Inserts a new product type.
    async fn insert_product_type(&self, product_type: &ProductType) -> Result<()>;

    /// Fetches a product type by id.
    async fn get_product_type(&self, id: &ProductTypeId) -> Result<Option<ProductType>>;

    /// Lists all product types by name.
    async fn list_product_types(&self) -> Result<Vec<ProductType>>;

    /// Flips a product type's active flag.
    async fn set_product_type_active(
        &self,
        id: &ProductTypeId,
        active: bool,
    ) -> Result<Option<ProductType>>;

    // --- users ---

    /// Inserts a new user account.
    async fn insert_user(&self, user: &User) -> Result<()>;

    /// Fetches a user by id.
    async fn get_user(&self, id: &UserId) -> Result<Option<User>>;

    /// Fetches a user by username.
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Lists all user accounts by username.
    async fn list_users(&self) -> Result<Vec<User>>;

    // --- orders & ledger ---

    /// Returns the highest order number whose month prefix equals
    /// `month_key`, across every order including soft-deleted and test rows
    /// (uniqueness is global).
    async fn max_order_number(&self, month_key: &str) -> Result<Option<OrderNumber>>;

    /// Inserts a new projection row and its `ORDER_CREATED` ledger entry in
    /// one transaction. Fails with `DuplicateOrderNumber` if the number is
    /// already taken, leaving no trace of either write.
    async fn insert_order(&self, order: &Order, entry: &LedgerEntry) -> Result<()>;

    /// Writes an updated projection row and appends its ledger entry in one
    /// transaction, guarded by `expected_revision`. If the stored revision
    /// no longer matches, nothing is written and `RevisionConflict` is
    /// returned so the caller can reload and retry.
    async fn update_order(
        &self,
        expected_revision: i64,
        after: &Order,
        entry: &LedgerEntry,
    ) -> Result<()>;

    /// Fetches an order by id, including soft-deleted rows; visibility is
    /// the caller's concern.
    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>>;

    /// Lists orders matching the filter, coarsely ordered by promised date
    /// then recency. The caller applies delay ordering on top.
    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>>;

    /// Returns all ledger entries for an order in `(occurred_at, seq)`
    /// order, the audit timeline.
    async fn get_ledger_for_order(&self, order_id: &OrderId) -> Result<Vec<LedgerEntry>>;
}
