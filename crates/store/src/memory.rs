use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use common::{CustomerId, OrderId, ProductTypeId, UserId, VendorId};
use domain::{Customer, LedgerEntry, Order, OrderNumber, ProductType, User, Vendor};

use crate::{
    Result, StoreError,
    store::{OrderFilter, ShopStore},
};

/// In-memory shop store for tests.
///
/// Mirrors the PostgreSQL implementation's semantics: order-number
/// uniqueness, revision-guarded updates, and a ledger that only ever grows.
/// Append-only enforcement here is structural: the entry vector is private
/// and nothing on the interface can reach back into it.
#[derive(Clone, Default)]
pub struct InMemoryShopStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    customers: HashMap<CustomerId, Customer>,
    vendors: HashMap<VendorId, Vendor>,
    product_types: HashMap<ProductTypeId, ProductType>,
    users: HashMap<UserId, User>,
    orders: HashMap<OrderId, Order>,
    ledger: Vec<LedgerEntry>,
    next_seq: i64,
}

impl Inner {
    fn append_entry(&mut self, entry: &LedgerEntry) {
        self.next_seq += 1;
        let mut entry = entry.clone();
        entry.seq = self.next_seq;
        self.ledger.push(entry);
    }
}

impl InMemoryShopStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of ledger entries stored.
    pub async fn ledger_len(&self) -> usize {
        self.inner.read().await.ledger.len()
    }
}

#[async_trait]
impl ShopStore for InMemoryShopStore {
    async fn insert_customer(&self, customer: &Customer) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .customers
            .insert(customer.id.clone(), customer.clone());
        Ok(())
    }

    async fn get_customer(&self, id: &CustomerId) -> Result<Option<Customer>> {
        Ok(self.inner.read().await.customers.get(id).cloned())
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        let inner = self.inner.read().await;
        let mut customers: Vec<_> = inner.customers.values().cloned().collect();
        customers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(customers)
    }

    async fn set_customer_active(
        &self,
        id: &CustomerId,
        active: bool,
    ) -> Result<Option<Customer>> {
        let mut inner = self.inner.write().await;
        Ok(inner.customers.get_mut(id).map(|customer| {
            customer.active = active;
            customer.clone()
        }))
    }

    async fn insert_vendor(&self, vendor: &Vendor) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.vendors.insert(vendor.id.clone(), vendor.clone());
        Ok(())
    }

    async fn get_vendor(&self, id: &VendorId) -> Result<Option<Vendor>> {
        Ok(self.inner.read().await.vendors.get(id).cloned())
    }

    async fn list_vendors(&self) -> Result<Vec<Vendor>> {
        let inner = self.inner.read().await;
        let mut vendors: Vec<_> = inner.vendors.values().cloned().collect();
        vendors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(vendors)
    }

    async fn set_vendor_active(&self, id: &VendorId, active: bool) -> Result<Option<Vendor>> {
        let mut inner = self.inner.write().await;
        Ok(inner.vendors.get_mut(id).map(|vendor| {
            vendor.active = active;
            vendor.clone()
        }))
    }

    async fn insert_product_type(&self, product_type: &ProductType) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .product_types
            .insert(product_type.id.clone(), product_type.clone());
        Ok(())
    }

    async fn get_product_type(&self, id: &ProductTypeId) -> Result<Option<ProductType>> {
        Ok(self.inner.read().await.product_types.get(id).cloned())
    }

    async fn list_product_types(&self) -> Result<Vec<ProductType>> {
        let inner = self.inner.read().await;
        let mut product_types: Vec<_> = inner.product_types.values().cloned().collect();
        product_types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(product_types)
    }

    async fn set_product_type_active(
        &self,
        id: &ProductTypeId,
        active: bool,
    ) -> Result<Option<ProductType>> {
        let mut inner = self.inner.write().await;
        Ok(inner.product_types.get_mut(id).map(|product_type| {
            product_type.active = active;
            product_type.clone()
        }))
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.inner.read().await.users.get(id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let inner = self.inner.read().await;
        let mut users: Vec<_> = inner.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn max_order_number(&self, month_key: &str) -> Result<Option<OrderNumber>> {
        let inner = self.inner.read().await;
        Ok(inner
            .orders
            .values()
            .map(|order| &order.order_number)
            .filter(|number| number.month_prefix() == month_key)
            .max()
            .cloned())
    }

    async fn insert_order(&self, order: &Order, entry: &LedgerEntry) -> Result<()> {
        let mut inner = self.inner.write().await;

        if inner
            .orders
            .values()
            .any(|existing| existing.order_number == order.order_number)
        {
            return Err(StoreError::DuplicateOrderNumber {
                order_number: order.order_number.to_string(),
            });
        }

        inner.orders.insert(order.id.clone(), order.clone());
        inner.append_entry(entry);
        Ok(())
    }

    async fn update_order(
        &self,
        expected_revision: i64,
        after: &Order,
        entry: &LedgerEntry,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;

        let stale = match inner.orders.get(&after.id) {
            Some(current) => current.revision != expected_revision,
            None => true,
        };
        if stale {
            return Err(StoreError::RevisionConflict {
                order_id: after.id.clone(),
                expected: expected_revision,
            });
        }

        inner.orders.insert(after.id.clone(), after.clone());
        inner.append_entry(entry);
        Ok(())
    }

    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>> {
        Ok(self.inner.read().await.orders.get(id).cloned())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        let mut orders: Vec<_> = inner
            .orders
            .values()
            .filter(|order| {
                if order.is_deleted {
                    return false;
                }
                if order.is_test && !filter.include_test {
                    return false;
                }
                if let Some(status) = filter.status
                    && order.status != status
                {
                    return false;
                }
                if let Some(ref customer_id) = filter.customer_id
                    && &order.customer_id != customer_id
                {
                    return false;
                }
                if let Some(ref vendor_id) = filter.vendor_id
                    && order.current_vendor_id.as_ref() != Some(vendor_id)
                {
                    return false;
                }
                if let Some(ref product_type_id) = filter.product_type_id
                    && &order.product_type_id != product_type_id
                {
                    return false;
                }
                if let Some(from) = filter.promised_from
                    && order.promised_date < from
                {
                    return false;
                }
                if let Some(to) = filter.promised_to
                    && order.promised_date > to
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();

        orders.sort_by(|a, b| {
            a.promised_date
                .cmp(&b.promised_date)
                .then(b.updated_at.cmp(&a.updated_at))
        });
        Ok(orders)
    }

    async fn get_ledger_for_order(&self, order_id: &OrderId) -> Result<Vec<LedgerEntry>> {
        let inner = self.inner.read().await;
        let mut entries: Vec<_> = inner
            .ledger
            .iter()
            .filter(|entry| &entry.order_id == order_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at).then(a.seq.cmp(&b.seq)));
        Ok(entries)
    }
}
