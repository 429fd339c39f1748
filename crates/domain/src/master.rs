//! Master data referenced by orders.
//!
//! Customers, vendors, product types and users are deactivated, never
//! deleted, so historical orders stay resolvable after a vendor or product
//! type is retired.

use chrono::{DateTime, Utc};
use common::{CustomerId, ProductTypeId, UserId, VendorId};
use serde::{Deserialize, Serialize};

use crate::access::Role;

/// A customer the shop takes orders for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Creates a new active customer.
    pub fn new(name: impl Into<String>, phone: Option<String>, email: Option<String>) -> Self {
        Self {
            id: CustomerId::generate(),
            name: name.into(),
            phone,
            email,
            active: true,
            created_at: Utc::now(),
        }
    }
}

/// An outside vendor jobs can be sent to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    pub name: String,
    pub phone: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Vendor {
    /// Creates a new active vendor.
    pub fn new(name: impl Into<String>, phone: Option<String>) -> Self {
        Self {
            id: VendorId::generate(),
            name: name.into(),
            phone,
            active: true,
            created_at: Utc::now(),
        }
    }
}

/// A kind of product the shop produces (flyers, banners, business cards).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductType {
    pub id: ProductTypeId,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl ProductType {
    /// Creates a new active product type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ProductTypeId::generate(),
            name: name.into(),
            active: true,
            created_at: Utc::now(),
        }
    }
}

/// A user account.
///
/// The password digest is opaque to the core; hashing and verification live
/// in the auth layer. `sessions_revoked_at` is the watermark that layer uses
/// to invalidate sessions issued before a revocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub password_digest: String,
    pub role: Role,
    pub active: bool,
    pub sessions_revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates a new active user account with a pre-hashed password digest.
    pub fn new(
        username: impl Into<String>,
        display_name: impl Into<String>,
        password_digest: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: UserId::generate(),
            username: username.into(),
            display_name: display_name.into(),
            password_digest: password_digest.into(),
            role,
            active: true,
            sessions_revoked_at: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entities_start_active() {
        let customer = Customer::new("Corner Cafe", Some("555-0101".to_string()), None);
        assert!(customer.active);
        assert!(customer.id.as_str().starts_with("C-"));

        let vendor = Vendor::new("Laminating Co", None);
        assert!(vendor.active);
        assert!(vendor.id.as_str().starts_with("V-"));

        let product_type = ProductType::new("Flyer");
        assert!(product_type.active);
        assert!(product_type.id.as_str().starts_with("PT-"));
    }

    #[test]
    fn test_new_user_carries_role_and_digest() {
        let user = User::new("meral", "Meral", "digest$abc", Role::Employee);
        assert!(user.active);
        assert_eq!(user.role, Role::Employee);
        assert_eq!(user.password_digest, "digest$abc");
        assert!(user.sessions_revoked_at.is_none());
        assert!(user.id.as_str().starts_with("U-"));
    }
}
