//! Domain model for the print-shop order ledger and projection engine.
//!
//! This crate holds the pure domain logic:
//! - the order projection with its status machine and command methods
//! - immutable ledger entries with field-level diff payloads
//! - the replay fold that rebuilds a projection from its ledger history
//! - per-month order number sequencing
//! - master data entities and the role-based access guard
//!
//! No I/O happens here; persistence lives in the store crate and
//! orchestration in the service crate.

pub mod access;
pub mod master;
pub mod order;

pub use access::{Action, Actor, Forbidden, Role, authorize};
pub use master::{Customer, ProductType, User, Vendor};
pub use order::{
    DiffPayload, EventType, FieldChange, LedgerEntry, Mutation, NewOrder, Order, OrderError,
    OrderField, OrderNumber, OrderPatch, OrderStatus, diff, replay,
};
