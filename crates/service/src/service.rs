//! Order service: the orchestrator.
//!
//! Every mutation follows the same shape: authorize, load current state,
//! validate, then commit the projection update and the ledger append as one
//! atomic store call. A denied or invalid call short-circuits before any
//! ledger or projection work begins.

use chrono::{DateTime, NaiveDate, Utc};
use common::{OrderId, VendorId};
use serde::Serialize;

use domain::{
    Action, Actor, LedgerEntry, Mutation, NewOrder, Order, OrderNumber, OrderPatch, OrderStatus,
    authorize,
};
use store::{OrderFilter, ShopStore, StoreError};

use crate::error::ServiceError;
use crate::list::{DEFAULT_PAGE_SIZE, ListOrdersRequest, MAX_PAGE_SIZE, Page, SortKey};

/// Bounded retries for order-number allocation, backstopped by the unique
/// constraint on `order_number`.
const NUMBER_ALLOC_RETRIES: u32 = 3;

/// Bounded retries for revision-guarded updates that lose a concurrent race.
const REVISION_RETRIES: u32 = 3;

/// An order projection together with its computed delay fields.
///
/// Delay is derived at read time from `(promised_date, status, now)` and
/// never stored.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub is_delayed: bool,
    pub days_delayed: i64,
}

impl OrderView {
    /// Computes the view of an order at a fixed instant.
    pub fn at(order: Order, now: DateTime<Utc>) -> Self {
        let is_delayed = order.is_delayed(now);
        let days_delayed = order.days_delayed(now);
        Self {
            order,
            is_delayed,
            days_delayed,
        }
    }
}

/// Input for creating an order.
#[derive(Debug, Clone)]
pub struct CreateOrderInput {
    pub customer_id: common::CustomerId,
    pub product_type_id: common::ProductTypeId,
    pub title: String,
    pub description: Option<String>,
    pub quantity: Option<i32>,
    /// Defaults to today when absent.
    pub received_date: Option<NaiveDate>,
    pub promised_date: NaiveDate,
    pub internal_due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub is_test: bool,
}

/// Service for managing orders against a shop store.
pub struct ShopService<S: ShopStore> {
    store: S,
}

impl<S: ShopStore> ShopService<S> {
    /// Creates a new service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates a new order with status `NEW` and writes its `ORDER_CREATED`
    /// ledger entry.
    ///
    /// The order number is allocated inside the insert path: read the
    /// current month maximum, compute the next number, insert. Losing the
    /// allocation race surfaces as a unique-constraint violation, which is
    /// retried with a freshly computed number a bounded number of times.
    #[tracing::instrument(skip(self, input))]
    pub async fn create_order(
        &self,
        input: CreateOrderInput,
        actor: &Actor,
    ) -> Result<OrderView, ServiceError> {
        authorize(actor, Action::CreateOrder)?;

        if input.title.trim().is_empty() {
            return Err(ServiceError::Validation("title is required".to_string()));
        }
        if let Some(quantity) = input.quantity
            && quantity <= 0
        {
            return Err(ServiceError::Validation(format!(
                "quantity must be positive, got {quantity}"
            )));
        }
        self.require_customer(&input.customer_id).await?;
        self.require_product_type(&input.product_type_id).await?;

        let mut attempt = 1;
        loop {
            let now = Utc::now();
            let month_key = OrderNumber::month_key(now.date_naive());
            let order_number = match self.store.max_order_number(&month_key).await? {
                Some(max) => max.next()?,
                None => OrderNumber::first(&month_key),
            };

            let order = Order::create(
                NewOrder {
                    id: OrderId::generate(),
                    order_number,
                    customer_id: input.customer_id.clone(),
                    product_type_id: input.product_type_id.clone(),
                    title: input.title.clone(),
                    description: input.description.clone(),
                    quantity: input.quantity,
                    received_date: input.received_date.unwrap_or_else(|| now.date_naive()),
                    promised_date: input.promised_date,
                    internal_due_date: input.internal_due_date,
                    notes: input.notes.clone(),
                    is_test: input.is_test,
                },
                now,
            );
            let entry = LedgerEntry::created(&order, &actor.user_id, now);

            match self.store.insert_order(&order, &entry).await {
                Ok(()) => {
                    metrics::counter!("orders_created_total").increment(1);
                    metrics::counter!("ledger_entries_written_total").increment(1);
                    tracing::info!(
                        order_id = %order.id,
                        order_number = %order.order_number,
                        "order created"
                    );
                    return Ok(OrderView::at(order, now));
                }
                Err(StoreError::DuplicateOrderNumber { order_number })
                    if attempt < NUMBER_ALLOC_RETRIES =>
                {
                    tracing::warn!(%order_number, attempt, "order number taken, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Applies a field patch, writing one `ORDER_UPDATED` entry with the
    /// resulting diff. A patch that changes nothing writes no entry.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_order(
        &self,
        order_id: &OrderId,
        patch: OrderPatch,
        actor: &Actor,
    ) -> Result<OrderView, ServiceError> {
        authorize(actor, Action::UpdateOrder)?;

        if let Some(ref title) = patch.title
            && title.trim().is_empty()
        {
            return Err(ServiceError::Validation("title cannot be empty".to_string()));
        }
        if let Some(Some(quantity)) = patch.quantity
            && quantity <= 0
        {
            return Err(ServiceError::Validation(format!(
                "quantity must be positive, got {quantity}"
            )));
        }
        if let Some(ref customer_id) = patch.customer_id {
            self.require_customer(customer_id).await?;
        }
        if let Some(ref product_type_id) = patch.product_type_id {
            self.require_product_type(product_type_id).await?;
        }

        self.mutate(order_id, false, |order, now| {
            Ok(order.revise(&patch, &actor.user_id, now))
        })
        .await
    }

    /// Moves the order to a new workflow status. Terminal orders reject any
    /// further transition with `CONFLICT`.
    #[tracing::instrument(skip(self))]
    pub async fn change_status(
        &self,
        order_id: &OrderId,
        new_status: OrderStatus,
        actor: &Actor,
    ) -> Result<OrderView, ServiceError> {
        authorize(actor, Action::ChangeStatus)?;

        self.mutate(order_id, false, |order, now| {
            order
                .change_status(new_status, &actor.user_id, now)
                .map_err(ServiceError::from)
        })
        .await
    }

    /// Assigns the order to a vendor, or clears the assignment with `None`.
    #[tracing::instrument(skip(self))]
    pub async fn assign_vendor(
        &self,
        order_id: &OrderId,
        vendor_id: Option<VendorId>,
        actor: &Actor,
    ) -> Result<OrderView, ServiceError> {
        authorize(actor, Action::AssignVendor)?;

        if let Some(ref vendor_id) = vendor_id {
            let vendor = self.store.get_vendor(vendor_id).await?;
            if !vendor.is_some_and(|v| v.active) {
                return Err(ServiceError::Validation(format!(
                    "vendor {vendor_id} does not exist or is inactive"
                )));
            }
        }

        self.mutate(order_id, false, |order, now| {
            Ok(order.assign_vendor(vendor_id.clone(), &actor.user_id, now))
        })
        .await
    }

    /// Marks the order delivered, stamping status and `delivered_at` in one
    /// combined update. Fails with `CONFLICT` if already terminal.
    #[tracing::instrument(skip(self))]
    pub async fn mark_delivered(
        &self,
        order_id: &OrderId,
        actor: &Actor,
    ) -> Result<OrderView, ServiceError> {
        authorize(actor, Action::MarkDelivered)?;

        self.mutate(order_id, false, |order, now| {
            order
                .mark_delivered(&actor.user_id, now)
                .map(Some)
                .map_err(ServiceError::from)
        })
        .await
    }

    /// Cancels the order, recording the reason in the ledger payload. Fails
    /// with `CONFLICT` if already terminal.
    #[tracing::instrument(skip(self, reason))]
    pub async fn cancel_order(
        &self,
        order_id: &OrderId,
        reason: Option<String>,
        actor: &Actor,
    ) -> Result<OrderView, ServiceError> {
        authorize(actor, Action::CancelOrder)?;

        self.mutate(order_id, false, |order, now| {
            order
                .cancel(reason.clone(), &actor.user_id, now)
                .map(Some)
                .map_err(ServiceError::from)
        })
        .await
    }

    /// Soft-deletes the order. The row is hidden from reads and lists but
    /// never physically removed.
    #[tracing::instrument(skip(self))]
    pub async fn soft_delete_order(
        &self,
        order_id: &OrderId,
        actor: &Actor,
    ) -> Result<OrderView, ServiceError> {
        authorize(actor, Action::SoftDeleteOrder)?;

        self.mutate(order_id, false, |order, now| {
            Ok(order.soft_delete(&actor.user_id, now))
        })
        .await
    }

    /// Restores a soft-deleted order.
    #[tracing::instrument(skip(self))]
    pub async fn restore_order(
        &self,
        order_id: &OrderId,
        actor: &Actor,
    ) -> Result<OrderView, ServiceError> {
        authorize(actor, Action::RestoreOrder)?;

        self.mutate(order_id, true, |order, now| {
            Ok(order.restore(&actor.user_id, now))
        })
        .await
    }

    /// Fetches an order with its computed delay fields. Soft-deleted orders
    /// read as `NOT_FOUND`.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: &OrderId) -> Result<OrderView, ServiceError> {
        let order = self.load(order_id, false).await?;
        Ok(OrderView::at(order, Utc::now()))
    }

    /// Returns the order's audit timeline: every ledger entry in strict
    /// chronological order. Readable for soft-deleted orders, since the
    /// audit trail outlives the row's visibility.
    #[tracing::instrument(skip(self))]
    pub async fn get_ledger(&self, order_id: &OrderId) -> Result<Vec<LedgerEntry>, ServiceError> {
        // existence check only; deleted orders keep a readable history
        self.load(order_id, true).await?;
        Ok(self.store.get_ledger_for_order(order_id).await?)
    }

    /// Lists orders for the control-tower view: conjunctive filters, free
    /// text search, delay-first composite ordering, cursor pagination.
    #[tracing::instrument(skip(self, request))]
    pub async fn list_orders(
        &self,
        request: ListOrdersRequest,
    ) -> Result<Page<OrderView>, ServiceError> {
        let page_size = request.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ServiceError::Validation(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"
            )));
        }
        let after = request
            .cursor
            .as_deref()
            .map(SortKey::decode)
            .transpose()?;

        let filter = OrderFilter {
            status: request.status,
            customer_id: request.customer_id.clone(),
            vendor_id: request.vendor_id.clone(),
            product_type_id: request.product_type_id.clone(),
            promised_from: request.promised_from,
            promised_to: request.promised_to,
            include_test: request.include_test,
        };
        let mut orders = self.store.list_orders(&filter).await?;

        if let Some(ref search) = request.search {
            let needle = search.to_lowercase();
            let customers = self.store.list_customers().await?;
            orders.retain(|order| {
                let customer_name = customers
                    .iter()
                    .find(|c| c.id == order.customer_id)
                    .map(|c| c.name.to_lowercase())
                    .unwrap_or_default();
                order.order_number.as_str().to_lowercase().contains(&needle)
                    || order.title.to_lowercase().contains(&needle)
                    || customer_name.contains(&needle)
            });
        }

        // delay is computed, not stored, so the delayed-only filter and the
        // composite ordering are evaluated here for one fixed `now`
        let now = Utc::now();
        if request.delayed_only {
            orders.retain(|order| order.is_delayed(now));
        }

        let mut keyed: Vec<(SortKey, Order)> = orders
            .into_iter()
            .map(|order| (SortKey::of(&order, now), order))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp_list(&b.0));

        if let Some(after) = after {
            keyed.retain(|(key, _)| after.cmp_list(key) == std::cmp::Ordering::Less);
        }

        let has_more = keyed.len() > page_size;
        keyed.truncate(page_size);
        let next_cursor = if has_more {
            keyed.last().map(|(key, _)| key.encode())
        } else {
            None
        };

        Ok(Page {
            items: keyed
                .into_iter()
                .map(|(_, order)| OrderView::at(order, now))
                .collect(),
            next_cursor,
        })
    }

    /// Loads an order or fails `NOT_FOUND`, optionally seeing through the
    /// soft-delete flag.
    async fn load(&self, order_id: &OrderId, include_deleted: bool) -> Result<Order, ServiceError> {
        match self.store.get_order(order_id).await? {
            Some(order) if include_deleted || !order.is_deleted => Ok(order),
            _ => Err(ServiceError::NotFound(format!(
                "order {order_id} not found"
            ))),
        }
    }

    /// Load-mutate-commit with a bounded retry on revision conflicts.
    ///
    /// The command closure is pure; it is re-run against a freshly loaded
    /// state on each attempt, so a diff is never committed from a stale
    /// read. A command returning `None` is a no-op: the current state is
    /// returned and nothing is written.
    async fn mutate<F>(
        &self,
        order_id: &OrderId,
        include_deleted: bool,
        command: F,
    ) -> Result<OrderView, ServiceError>
    where
        F: Fn(&Order, DateTime<Utc>) -> Result<Option<Mutation>, ServiceError>,
    {
        let mut attempt = 1;
        loop {
            let order = self.load(order_id, include_deleted).await?;
            let now = Utc::now();

            let Some(Mutation { after, entry }) = command(&order, now)? else {
                return Ok(OrderView::at(order, now));
            };

            match self.store.update_order(order.revision, &after, &entry).await {
                Ok(()) => {
                    metrics::counter!("order_mutations_total").increment(1);
                    metrics::counter!("ledger_entries_written_total").increment(1);
                    tracing::info!(
                        %order_id,
                        event_type = %entry.event_type,
                        summary = %entry.summary,
                        "order mutated"
                    );
                    return Ok(OrderView::at(after, now));
                }
                Err(StoreError::RevisionConflict { .. }) if attempt < REVISION_RETRIES => {
                    tracing::warn!(%order_id, attempt, "revision conflict, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn require_customer(&self, id: &common::CustomerId) -> Result<(), ServiceError> {
        let customer = self.store.get_customer(id).await?;
        if customer.is_some_and(|c| c.active) {
            Ok(())
        } else {
            Err(ServiceError::Validation(format!(
                "customer {id} does not exist or is inactive"
            )))
        }
    }

    async fn require_product_type(&self, id: &common::ProductTypeId) -> Result<(), ServiceError> {
        let product_type = self.store.get_product_type(id).await?;
        if product_type.is_some_and(|pt| pt.active) {
            Ok(())
        } else {
            Err(ServiceError::Validation(format!(
                "product type {id} does not exist or is inactive"
            )))
        }
    }
}
