//! The control-tower list: composite ordering and cursor pagination.
//!
//! Default ordering puts the most delayed work first: days delayed
//! descending, then soonest promised date, then most recently updated, with
//! the order id as a final total-order tie-break. Delay is computed, not
//! stored, so this ordering is evaluated here rather than in SQL.

use std::cmp::Ordering;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, NaiveDate, Utc};
use common::{CustomerId, ProductTypeId, VendorId};
use serde::{Deserialize, Serialize};

use domain::{Order, OrderStatus};

use crate::error::ServiceError;

/// Page size applied when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Hard ceiling on page size, bounding a single response.
pub const MAX_PAGE_SIZE: usize = 200;

/// Query surface of `list_orders`.
#[derive(Debug, Clone, Default)]
pub struct ListOrdersRequest {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<CustomerId>,
    pub vendor_id: Option<VendorId>,
    pub product_type_id: Option<ProductTypeId>,
    pub delayed_only: bool,
    pub promised_from: Option<NaiveDate>,
    pub promised_to: Option<NaiveDate>,
    /// Case-insensitive match against customer name, order number and title.
    pub search: Option<String>,
    pub include_test: bool,
    /// Opaque cursor returned by a previous page, or `None` for the first.
    pub cursor: Option<String>,
    pub page_size: Option<usize>,
}

/// The composite sort key of one listed order, also the cursor payload.
///
/// Encoding the full key (rather than an offset) means a page boundary
/// stays stable as long as no underlying row changes its sort key between
/// fetches: no item is skipped or duplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub days_delayed: i64,
    pub promised_date: NaiveDate,
    pub updated_at: DateTime<Utc>,
    pub id: String,
}

impl SortKey {
    /// Computes the sort key of an order for a fixed `now`.
    pub fn of(order: &Order, now: DateTime<Utc>) -> Self {
        Self {
            days_delayed: order.days_delayed(now),
            promised_date: order.promised_date,
            updated_at: order.updated_at,
            id: order.id.to_string(),
        }
    }

    /// List ordering: most delayed first, then soonest promise, then most
    /// recently updated, then id for a deterministic total order.
    pub fn cmp_list(&self, other: &Self) -> Ordering {
        other
            .days_delayed
            .cmp(&self.days_delayed)
            .then(self.promised_date.cmp(&other.promised_date))
            .then(other.updated_at.cmp(&self.updated_at))
            .then(self.id.cmp(&other.id))
    }

    /// Encodes the key as an opaque, URL-safe cursor token.
    pub fn encode(&self) -> String {
        // the key is a plain serializable struct; this cannot fail
        let json = serde_json::to_vec(self).expect("sort key serializes");
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decodes a cursor token back into a sort key.
    pub fn decode(cursor: &str) -> Result<Self, ServiceError> {
        let malformed = || ServiceError::Validation("malformed pagination cursor".to_string());
        let bytes = URL_SAFE_NO_PAD.decode(cursor).map_err(|_| malformed())?;
        serde_json::from_slice(&bytes).map_err(|_| malformed())
    }
}

/// One page of results plus the cursor for the next page, if any.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}
