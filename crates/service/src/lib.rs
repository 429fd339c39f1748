//! Order service for the print-shop ledger and projection engine.
//!
//! The service validates input, consults the access guard, computes derived
//! fields, executes the ledger-plus-projection transaction through the
//! store, and exposes the query surface: get, audit timeline, and the
//! filtered, sorted, cursor-paginated order list.

pub mod envelope;
pub mod error;
pub mod list;
pub mod master;
pub mod service;

pub use envelope::{Envelope, ErrorBody};
pub use error::{ErrorCode, ServiceError};
pub use list::{DEFAULT_PAGE_SIZE, ListOrdersRequest, MAX_PAGE_SIZE, Page, SortKey};
pub use master::{CreateCustomerInput, CreateUserInput, CreateVendorInput};
pub use service::{CreateOrderInput, OrderView, ShopService};
