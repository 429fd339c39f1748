//! Order status machine.

use serde::{Deserialize, Serialize};

/// Workflow status of an order.
///
/// Status transitions:
/// ```text
/// New ◄──► InProgress ◄──► Ready ──► Delivered
///  │            │            │
///  └────────────┴────────────┴─────► Cancelled
/// ```
///
/// `Delivered` and `Cancelled` are terminal; no further transition is legal
/// once either is reached. The non-terminal statuses may move freely among
/// each other, which matches how jobs bounce between the counter and the
/// production floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order has been taken but work has not started.
    #[default]
    New,

    /// Order is being produced, possibly at an outside vendor.
    InProgress,

    /// Order is finished and waiting for pickup or delivery.
    Ready,

    /// Order has been handed to the customer (terminal state).
    Delivered,

    /// Order was cancelled (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// All statuses an order can legally move to from this one.
    pub fn legal_next(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::New => &[
                OrderStatus::InProgress,
                OrderStatus::Ready,
                OrderStatus::Delivered,
                OrderStatus::Cancelled,
            ],
            OrderStatus::InProgress => &[
                OrderStatus::New,
                OrderStatus::Ready,
                OrderStatus::Delivered,
                OrderStatus::Cancelled,
            ],
            OrderStatus::Ready => &[
                OrderStatus::New,
                OrderStatus::InProgress,
                OrderStatus::Delivered,
                OrderStatus::Cancelled,
            ],
            OrderStatus::Delivered | OrderStatus::Cancelled => &[],
        }
    }

    /// Returns true if this status may transition to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.legal_next().contains(&next)
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns the stored wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::InProgress => "IN_PROGRESS",
            OrderStatus::Ready => "READY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Parses a stored wire name back into a status.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "NEW" => Some(OrderStatus::New),
            "IN_PROGRESS" => Some(OrderStatus::InProgress),
            "READY" => Some(OrderStatus::Ready),
            "DELIVERED" => Some(OrderStatus::Delivered),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
