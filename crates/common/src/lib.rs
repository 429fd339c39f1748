//! Shared types for the print-shop order system.

pub mod id;

pub use id::{CustomerId, LedgerEntryId, OrderId, ProductTypeId, UserId, VendorId};
