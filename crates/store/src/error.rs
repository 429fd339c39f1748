use thiserror::Error;

use common::OrderId;

/// Errors that can occur when interacting with the shop store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An order update lost the optimistic-concurrency race: the row's
    /// revision no longer matches the one the caller read.
    #[error("order {order_id} was modified concurrently (expected revision {expected})")]
    RevisionConflict { order_id: OrderId, expected: i64 },

    /// The order number is already taken; the caller should recompute and
    /// retry the allocation.
    #[error("duplicate order number {order_number}")]
    DuplicateOrderNumber { order_number: String },

    /// A stored value could not be mapped back into its domain type.
    #[error("corrupt stored value: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
