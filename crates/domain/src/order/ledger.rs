//! Immutable ledger entries and field-level diff payloads.
//!
//! Every order mutation is recorded as exactly one [`LedgerEntry`]. The entry
//! payload carries the fields that actually changed as `{field: {from, to}}`
//! pairs over a closed field set, so consumers can pattern-match on the event
//! type and know which fields to expect.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{LedgerEntryId, OrderId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Order;

/// Kind of mutation a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    OrderCreated,
    OrderUpdated,
    StatusChanged,
    VendorChanged,
    DeliveredMarked,
    CancelledMarked,
    SoftDeleted,
    Restored,
}

impl EventType {
    /// Returns the stored wire name of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::OrderCreated => "ORDER_CREATED",
            EventType::OrderUpdated => "ORDER_UPDATED",
            EventType::StatusChanged => "STATUS_CHANGED",
            EventType::VendorChanged => "VENDOR_CHANGED",
            EventType::DeliveredMarked => "DELIVERED_MARKED",
            EventType::CancelledMarked => "CANCELLED_MARKED",
            EventType::SoftDeleted => "SOFT_DELETED",
            EventType::Restored => "RESTORED",
        }
    }

    /// Parses a stored wire name back into an event type.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ORDER_CREATED" => Some(EventType::OrderCreated),
            "ORDER_UPDATED" => Some(EventType::OrderUpdated),
            "STATUS_CHANGED" => Some(EventType::StatusChanged),
            "VENDOR_CHANGED" => Some(EventType::VendorChanged),
            "DELIVERED_MARKED" => Some(EventType::DeliveredMarked),
            "CANCELLED_MARKED" => Some(EventType::CancelledMarked),
            "SOFT_DELETED" => Some(EventType::SoftDeleted),
            "RESTORED" => Some(EventType::Restored),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The closed set of order fields that can appear in a diff payload.
///
/// `created_at`, `updated_at` and `revision` are bookkeeping columns derived
/// during replay and are never part of a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderField {
    OrderNumber,
    CustomerId,
    ProductTypeId,
    Title,
    Description,
    Quantity,
    Status,
    ProcessStage,
    CurrentVendorId,
    ReceivedDate,
    PromisedDate,
    InternalDueDate,
    DeliveredAt,
    Notes,
    IsDeleted,
    IsTest,
}

impl OrderField {
    /// Every diffable field, in projection column order.
    pub const ALL: [OrderField; 16] = [
        OrderField::OrderNumber,
        OrderField::CustomerId,
        OrderField::ProductTypeId,
        OrderField::Title,
        OrderField::Description,
        OrderField::Quantity,
        OrderField::Status,
        OrderField::ProcessStage,
        OrderField::CurrentVendorId,
        OrderField::ReceivedDate,
        OrderField::PromisedDate,
        OrderField::InternalDueDate,
        OrderField::DeliveredAt,
        OrderField::Notes,
        OrderField::IsDeleted,
        OrderField::IsTest,
    ];

    /// Returns the stored column name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderField::OrderNumber => "order_number",
            OrderField::CustomerId => "customer_id",
            OrderField::ProductTypeId => "product_type_id",
            OrderField::Title => "title",
            OrderField::Description => "description",
            OrderField::Quantity => "quantity",
            OrderField::Status => "status",
            OrderField::ProcessStage => "process_stage",
            OrderField::CurrentVendorId => "current_vendor_id",
            OrderField::ReceivedDate => "received_date",
            OrderField::PromisedDate => "promised_date",
            OrderField::InternalDueDate => "internal_due_date",
            OrderField::DeliveredAt => "delivered_at",
            OrderField::Notes => "notes",
            OrderField::IsDeleted => "is_deleted",
            OrderField::IsTest => "is_test",
        }
    }

    /// Extracts this field's current value from an order as JSON.
    pub fn value_of(&self, order: &Order) -> Value {
        match self {
            OrderField::OrderNumber => json(&order.order_number),
            OrderField::CustomerId => json(&order.customer_id),
            OrderField::ProductTypeId => json(&order.product_type_id),
            OrderField::Title => json(&order.title),
            OrderField::Description => json(&order.description),
            OrderField::Quantity => json(&order.quantity),
            OrderField::Status => json(&order.status),
            OrderField::ProcessStage => json(&order.process_stage),
            OrderField::CurrentVendorId => json(&order.current_vendor_id),
            OrderField::ReceivedDate => json(&order.received_date),
            OrderField::PromisedDate => json(&order.promised_date),
            OrderField::InternalDueDate => json(&order.internal_due_date),
            OrderField::DeliveredAt => json(&order.delivered_at),
            OrderField::Notes => json(&order.notes),
            OrderField::IsDeleted => json(&order.is_deleted),
            OrderField::IsTest => json(&order.is_test),
        }
    }
}

impl std::fmt::Display for OrderField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn json<T: Serialize>(value: &T) -> Value {
    // All projection field types serialize to plain JSON scalars.
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// One field transition inside a diff payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Value before the mutation (`null` for a freshly created order).
    pub from: Value,

    /// Value after the mutation.
    pub to: Value,
}

/// Structured diff payload of a ledger entry.
///
/// Shaped as `{ "changes": { field: { "from": v, "to": v } }, "reason"? }`.
/// Unchanged fields are omitted to keep entries compact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DiffPayload {
    /// Fields that changed in this mutation.
    pub changes: BTreeMap<OrderField, FieldChange>,

    /// Optional free-text reason supplied by the actor (e.g. on cancellation).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// One immutable, append-only record of a single order mutation.
///
/// Entries are created here, persisted by the storage engine inside the same
/// transaction as the projection write, and never mutated or removed
/// thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry identifier.
    pub id: LedgerEntryId,

    /// Order this entry belongs to.
    pub order_id: OrderId,

    /// Storage-assigned insertion sequence; the tie-break for entries with
    /// equal `occurred_at`. Zero until the entry is persisted.
    pub seq: i64,

    /// User who performed the mutation.
    pub actor_user_id: UserId,

    /// Kind of mutation recorded.
    pub event_type: EventType,

    /// When the mutation happened.
    pub occurred_at: DateTime<Utc>,

    /// Human-readable one-liner describing the mutation.
    pub summary: String,

    /// Field-level diff restricted to fields that actually changed.
    pub payload: DiffPayload,

    /// Carried for schema parity with other tables; always false.
    pub is_deleted: bool,

    /// Mirrors the order's test flag so test traffic can be filtered.
    pub is_test: bool,
}

impl LedgerEntry {
    /// Builds the `ORDER_CREATED` entry for a new order.
    ///
    /// The payload is the full initial field set, diffed from nothing: every
    /// field goes from `null` to its initial value.
    pub fn created(order: &Order, actor: &UserId, at: DateTime<Utc>) -> Self {
        let changes = OrderField::ALL
            .iter()
            .map(|field| {
                (
                    *field,
                    FieldChange {
                        from: Value::Null,
                        to: field.value_of(order),
                    },
                )
            })
            .collect();

        Self {
            id: LedgerEntryId::generate(),
            order_id: order.id.clone(),
            seq: 0,
            actor_user_id: actor.clone(),
            event_type: EventType::OrderCreated,
            occurred_at: at,
            summary: format!(
                "created order {} for customer {}",
                order.order_number, order.customer_id
            ),
            payload: DiffPayload {
                changes,
                reason: None,
            },
            is_deleted: false,
            is_test: order.is_test,
        }
    }

    /// Builds a change entry from the before and after states of a mutation.
    ///
    /// Returns `None` when no field differs; the caller must not write a
    /// ledger entry for a no-op.
    pub fn changed(
        event_type: EventType,
        before: &Order,
        after: &Order,
        actor: &UserId,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> Option<Self> {
        let changes = diff(before, after);
        if changes.is_empty() {
            return None;
        }

        let summary = summarize(event_type, &changes);

        Some(Self {
            id: LedgerEntryId::generate(),
            order_id: after.id.clone(),
            seq: 0,
            actor_user_id: actor.clone(),
            event_type,
            occurred_at: at,
            summary,
            payload: DiffPayload { changes, reason },
            is_deleted: false,
            is_test: after.is_test,
        })
    }
}

/// Computes the field-level diff between two order states, restricted to
/// fields that actually changed.
pub fn diff(before: &Order, after: &Order) -> BTreeMap<OrderField, FieldChange> {
    OrderField::ALL
        .iter()
        .filter_map(|field| {
            let from = field.value_of(before);
            let to = field.value_of(after);
            (from != to).then_some((*field, FieldChange { from, to }))
        })
        .collect()
}

fn summarize(event_type: EventType, changes: &BTreeMap<OrderField, FieldChange>) -> String {
    fn scalar(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Null => "none".to_string(),
            other => other.to_string(),
        }
    }

    match event_type {
        EventType::OrderCreated => "created order".to_string(),
        EventType::StatusChanged | EventType::DeliveredMarked | EventType::CancelledMarked => {
            match changes.get(&OrderField::Status) {
                Some(change) => format!(
                    "changed status from {} to {}",
                    scalar(&change.from),
                    scalar(&change.to)
                ),
                None => "changed status".to_string(),
            }
        }
        EventType::VendorChanged => match changes.get(&OrderField::CurrentVendorId) {
            Some(change) if change.to.is_null() => "cleared vendor".to_string(),
            Some(change) => format!("assigned vendor {}", scalar(&change.to)),
            None => "changed vendor".to_string(),
        },
        EventType::SoftDeleted => "deleted order".to_string(),
        EventType::Restored => "restored order".to_string(),
        EventType::OrderUpdated => {
            let fields: Vec<&str> = changes.keys().map(OrderField::as_str).collect();
            format!("updated {}", fields.join(", "))
        }
    }
}
