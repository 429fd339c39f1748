//! Order projection: the current-state row for one job.

use chrono::{DateTime, NaiveDate, Utc};
use common::{CustomerId, OrderId, ProductTypeId, UserId, VendorId};
use serde::{Deserialize, Serialize};

use super::{EventType, LedgerEntry, OrderError, OrderNumber, OrderStatus};

/// Current-state snapshot of one print job.
///
/// The projection is a derived cache over the order's ledger history: at any
/// instant it must equal the result of replaying all non-deleted ledger
/// entries for the order in `occurred_at` order. It is mutated only through
/// the command methods below, never by direct field writes from callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,

    /// Human-readable number, unique and immutable after creation.
    pub order_number: OrderNumber,

    /// Customer the job belongs to.
    pub customer_id: CustomerId,

    /// What kind of product is being produced.
    pub product_type_id: ProductTypeId,

    /// Short job title shown in the order list.
    pub title: String,

    /// Longer free-text description.
    pub description: Option<String>,

    /// Number of pieces, when meaningful for the product.
    pub quantity: Option<i32>,

    /// Workflow status.
    pub status: OrderStatus,

    /// Free-text production stage note (e.g. "plates made").
    pub process_stage: Option<String>,

    /// Outside vendor currently working the job, if any.
    pub current_vendor_id: Option<VendorId>,

    /// Day the order was taken.
    pub received_date: NaiveDate,

    /// Day promised to the customer. Always set.
    pub promised_date: NaiveDate,

    /// Internal target, usually earlier than the promised date.
    pub internal_due_date: Option<NaiveDate>,

    /// Set if and only if the status is `Delivered`.
    pub delivered_at: Option<DateTime<Utc>>,

    /// Free-text notes.
    pub notes: Option<String>,

    /// Soft-delete flag; deleted orders are hidden, never removed.
    pub is_deleted: bool,

    /// Marks test traffic so it can be filtered from real work.
    pub is_test: bool,

    /// Optimistic-concurrency counter; equals the number of ledger entries
    /// recorded for this order.
    pub revision: i64,

    /// When the order was created.
    pub created_at: DateTime<Utc>,

    /// When the order was last mutated.
    pub updated_at: DateTime<Utc>,
}

/// Initial field set for a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub customer_id: CustomerId,
    pub product_type_id: ProductTypeId,
    pub title: String,
    pub description: Option<String>,
    pub quantity: Option<i32>,
    pub received_date: NaiveDate,
    pub promised_date: NaiveDate,
    pub internal_due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub is_test: bool,
}

/// Partial update to an order's editable fields.
///
/// Outer `None` leaves a field unchanged; for nullable fields the inner
/// `None` clears the stored value. Status, vendor and delete flags have
/// their own commands and are deliberately absent here.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub customer_id: Option<CustomerId>,
    pub product_type_id: Option<ProductTypeId>,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub quantity: Option<Option<i32>>,
    pub process_stage: Option<Option<String>>,
    pub received_date: Option<NaiveDate>,
    pub promised_date: Option<NaiveDate>,
    pub internal_due_date: Option<Option<NaiveDate>>,
    pub notes: Option<Option<String>>,
}

/// Result of a successful order command: the after-state row and the ledger
/// entry to persist with it, atomically.
#[derive(Debug, Clone)]
pub struct Mutation {
    pub after: Order,
    pub entry: LedgerEntry,
}

impl Order {
    /// Creates the initial projection row with status `New`.
    pub fn create(new: NewOrder, at: DateTime<Utc>) -> Self {
        Self {
            id: new.id,
            order_number: new.order_number,
            customer_id: new.customer_id,
            product_type_id: new.product_type_id,
            title: new.title,
            description: new.description,
            quantity: new.quantity,
            status: OrderStatus::New,
            process_stage: None,
            current_vendor_id: None,
            received_date: new.received_date,
            promised_date: new.promised_date,
            internal_due_date: new.internal_due_date,
            delivered_at: None,
            notes: new.notes,
            is_deleted: false,
            is_test: new.is_test,
            revision: 1,
            created_at: at,
            updated_at: at,
        }
    }

    /// Returns true if the order is past its promise and still open.
    ///
    /// Delivered and cancelled orders are never delayed, whatever their
    /// dates. This is a pure function of `(promised_date, status, now)` and
    /// is never stored.
    pub fn is_delayed(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal() && now.date_naive() > self.promised_date
    }

    /// Whole days past the promised date, or 0 when not delayed.
    pub fn days_delayed(&self, now: DateTime<Utc>) -> i64 {
        if self.is_delayed(now) {
            (now.date_naive() - self.promised_date).num_days().max(0)
        } else {
            0
        }
    }

    /// Applies a field patch, producing an `ORDER_UPDATED` mutation.
    ///
    /// Returns `None` when the patch changes nothing; a no-op must not
    /// write a spurious ledger entry.
    pub fn revise(&self, patch: &OrderPatch, actor: &UserId, at: DateTime<Utc>) -> Option<Mutation> {
        let mut after = self.clone();
        if let Some(customer_id) = &patch.customer_id {
            after.customer_id = customer_id.clone();
        }
        if let Some(product_type_id) = &patch.product_type_id {
            after.product_type_id = product_type_id.clone();
        }
        if let Some(title) = &patch.title {
            after.title = title.clone();
        }
        if let Some(description) = &patch.description {
            after.description = description.clone();
        }
        if let Some(quantity) = &patch.quantity {
            after.quantity = *quantity;
        }
        if let Some(process_stage) = &patch.process_stage {
            after.process_stage = process_stage.clone();
        }
        if let Some(received_date) = patch.received_date {
            after.received_date = received_date;
        }
        if let Some(promised_date) = patch.promised_date {
            after.promised_date = promised_date;
        }
        if let Some(internal_due_date) = &patch.internal_due_date {
            after.internal_due_date = *internal_due_date;
        }
        if let Some(notes) = &patch.notes {
            after.notes = notes.clone();
        }

        self.finish(after, EventType::OrderUpdated, actor, None, at)
    }

    /// Moves the order to a new workflow status, producing `STATUS_CHANGED`.
    ///
    /// Terminal orders reject any further transition. Changing to the
    /// current status is a no-op. A change to `Delivered` also stamps
    /// `delivered_at` so the projection invariant holds.
    pub fn change_status(
        &self,
        new_status: OrderStatus,
        actor: &UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<Mutation>, OrderError> {
        if new_status == self.status {
            return Ok(None);
        }
        if self.status.is_terminal() {
            return Err(OrderError::TerminalStatus {
                status: self.status,
                action: "change status of",
            });
        }
        if !self.status.can_transition_to(new_status) {
            return Err(OrderError::IllegalTransition {
                from: self.status,
                to: new_status,
            });
        }

        let mut after = self.clone();
        after.status = new_status;
        if new_status == OrderStatus::Delivered {
            after.delivered_at = Some(at);
        }

        Ok(self.finish(after, EventType::StatusChanged, actor, None, at))
    }

    /// Assigns or clears the outside vendor, producing `VENDOR_CHANGED`.
    ///
    /// Re-assigning the same vendor is a no-op.
    pub fn assign_vendor(
        &self,
        vendor_id: Option<VendorId>,
        actor: &UserId,
        at: DateTime<Utc>,
    ) -> Option<Mutation> {
        let mut after = self.clone();
        after.current_vendor_id = vendor_id;

        self.finish(after, EventType::VendorChanged, actor, None, at)
    }

    /// Marks the order delivered, producing `DELIVERED_MARKED`.
    ///
    /// Sets status and `delivered_at` in one combined update. Fails if the
    /// order is already in a terminal status.
    pub fn mark_delivered(&self, actor: &UserId, at: DateTime<Utc>) -> Result<Mutation, OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::TerminalStatus {
                status: self.status,
                action: "deliver",
            });
        }

        let mut after = self.clone();
        after.status = OrderStatus::Delivered;
        after.delivered_at = Some(at);

        // Status always changes here, so the diff is never empty.
        Ok(self
            .finish(after, EventType::DeliveredMarked, actor, None, at)
            .expect("delivery always changes status"))
    }

    /// Cancels the order, producing `CANCELLED_MARKED` with the reason in
    /// the payload. Fails if the order is already in a terminal status.
    pub fn cancel(
        &self,
        reason: Option<String>,
        actor: &UserId,
        at: DateTime<Utc>,
    ) -> Result<Mutation, OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::TerminalStatus {
                status: self.status,
                action: "cancel",
            });
        }

        let mut after = self.clone();
        after.status = OrderStatus::Cancelled;

        Ok(self
            .finish(after, EventType::CancelledMarked, actor, reason, at)
            .expect("cancellation always changes status"))
    }

    /// Soft-deletes the order, producing `SOFT_DELETED`. No-op if already
    /// deleted.
    pub fn soft_delete(&self, actor: &UserId, at: DateTime<Utc>) -> Option<Mutation> {
        let mut after = self.clone();
        after.is_deleted = true;

        self.finish(after, EventType::SoftDeleted, actor, None, at)
    }

    /// Restores a soft-deleted order, producing `RESTORED`. No-op if not
    /// deleted.
    pub fn restore(&self, actor: &UserId, at: DateTime<Utc>) -> Option<Mutation> {
        let mut after = self.clone();
        after.is_deleted = false;

        self.finish(after, EventType::Restored, actor, None, at)
    }

    /// Builds the ledger entry for a candidate after-state and stamps the
    /// bookkeeping columns. Returns `None` when nothing changed.
    fn finish(
        &self,
        mut after: Order,
        event_type: EventType,
        actor: &UserId,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> Option<Mutation> {
        let entry = LedgerEntry::changed(event_type, self, &after, actor, reason, at)?;
        after.revision += 1;
        after.updated_at = at;
        Some(Mutation { after, entry })
    }
}
