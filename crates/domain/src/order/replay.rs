//! Rebuilding a projection row from its ledger history.
//!
//! The ledger is authoritative; the projection is a derived cache. This fold
//! is the rebuild path: for every order, replaying all its non-deleted
//! ledger entries in `(occurred_at, seq)` order reproduces the stored
//! projection row exactly.

use serde_json::Value;

use super::{EventType, LedgerEntry, Order, OrderField};

/// Folds a ledger slice back into the projection row it describes.
///
/// Entries are sorted by `(occurred_at, seq)` before folding, so callers may
/// pass them in any order. Returns `None` when the slice is empty, starts
/// with anything other than an `ORDER_CREATED` entry, or contains a change
/// value that does not deserialize into its field. Each of those means the
/// ledger cannot describe a well-formed order.
pub fn replay(entries: &[LedgerEntry]) -> Option<Order> {
    let mut live: Vec<&LedgerEntry> = entries.iter().filter(|e| !e.is_deleted).collect();
    live.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at).then(a.seq.cmp(&b.seq)));

    let (first, rest) = live.split_first()?;
    if first.event_type != EventType::OrderCreated {
        return None;
    }

    let mut order = from_created(first)?;
    for entry in rest {
        for (field, change) in &entry.payload.changes {
            apply_change(&mut order, *field, &change.to)?;
        }
        order.updated_at = entry.occurred_at;
        order.revision += 1;
    }

    Some(order)
}

/// Builds the initial row from an `ORDER_CREATED` entry's full field set.
fn from_created(entry: &LedgerEntry) -> Option<Order> {
    fn to_value<'a>(entry: &'a LedgerEntry, field: OrderField) -> &'a Value {
        entry
            .payload
            .changes
            .get(&field)
            .map(|c| &c.to)
            .unwrap_or(&Value::Null)
    }

    fn get<T: serde::de::DeserializeOwned>(entry: &LedgerEntry, field: OrderField) -> Option<T> {
        serde_json::from_value(to_value(entry, field).clone()).ok()
    }

    Some(Order {
        id: entry.order_id.clone(),
        order_number: get(entry, OrderField::OrderNumber)?,
        customer_id: get(entry, OrderField::CustomerId)?,
        product_type_id: get(entry, OrderField::ProductTypeId)?,
        title: get(entry, OrderField::Title)?,
        description: get(entry, OrderField::Description)?,
        quantity: get(entry, OrderField::Quantity)?,
        status: get(entry, OrderField::Status)?,
        process_stage: get(entry, OrderField::ProcessStage)?,
        current_vendor_id: get(entry, OrderField::CurrentVendorId)?,
        received_date: get(entry, OrderField::ReceivedDate)?,
        promised_date: get(entry, OrderField::PromisedDate)?,
        internal_due_date: get(entry, OrderField::InternalDueDate)?,
        delivered_at: get(entry, OrderField::DeliveredAt)?,
        notes: get(entry, OrderField::Notes)?,
        is_deleted: get(entry, OrderField::IsDeleted)?,
        is_test: get(entry, OrderField::IsTest)?,
        revision: 1,
        created_at: entry.occurred_at,
        updated_at: entry.occurred_at,
    })
}

/// Sets one field from a diff's `to` value.
fn apply_change(order: &mut Order, field: OrderField, to: &Value) -> Option<()> {
    fn get<T: serde::de::DeserializeOwned>(value: &Value) -> Option<T> {
        serde_json::from_value(value.clone()).ok()
    }

    match field {
        OrderField::OrderNumber => order.order_number = get(to)?,
        OrderField::CustomerId => order.customer_id = get(to)?,
        OrderField::ProductTypeId => order.product_type_id = get(to)?,
        OrderField::Title => order.title = get(to)?,
        OrderField::Description => order.description = get(to)?,
        OrderField::Quantity => order.quantity = get(to)?,
        OrderField::Status => order.status = get(to)?,
        OrderField::ProcessStage => order.process_stage = get(to)?,
        OrderField::CurrentVendorId => order.current_vendor_id = get(to)?,
        OrderField::ReceivedDate => order.received_date = get(to)?,
        OrderField::PromisedDate => order.promised_date = get(to)?,
        OrderField::InternalDueDate => order.internal_due_date = get(to)?,
        OrderField::DeliveredAt => order.delivered_at = get(to)?,
        OrderField::Notes => order.notes = get(to)?,
        OrderField::IsDeleted => order.is_deleted = get(to)?,
        OrderField::IsTest => order.is_test = get(to)?,
    }

    Some(())
}
