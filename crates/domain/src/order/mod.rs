//! Order projection, ledger and related types.

mod ledger;
mod number;
mod projection;
mod replay;
mod status;

pub use ledger::{DiffPayload, EventType, FieldChange, LedgerEntry, OrderField, diff};
pub use number::OrderNumber;
pub use projection::{Mutation, NewOrder, Order, OrderPatch};
pub use replay::replay;
pub use status::OrderStatus;

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The order is in a terminal status and admits no further transition.
    #[error("cannot {action} order in terminal status {status}")]
    TerminalStatus {
        status: OrderStatus,
        action: &'static str,
    },

    /// The requested status transition is not in the transition table.
    #[error("illegal status transition from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    /// The per-month order number sequence ran out.
    #[error("order number sequence exhausted for month {month_key}")]
    SequenceExhausted { month_key: String },

    /// A stored order number does not have the `YYMM-NNNN` shape.
    #[error("malformed order number: {value}")]
    MalformedOrderNumber { value: String },
}
