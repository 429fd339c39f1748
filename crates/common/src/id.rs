//! Typed, prefixed entity identifiers.
//!
//! Every entity kind gets its own newtype so ids cannot be mixed up across
//! tables. The wire form is `"<prefix>-<random>"` where the random segment is
//! 12 hex characters (48 bits) drawn from a v4 UUID, more than enough at the
//! scale of hundreds of entities per month.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of hex characters in the random segment of a generated id.
const SUFFIX_LEN: usize = 12;

fn random_suffix() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..SUFFIX_LEN].to_string()
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generates a new random identifier.
            pub fn generate() -> Self {
                Self(format!("{}-{}", $prefix, random_suffix()))
            }

            /// Wraps an existing identifier string.
            pub fn from_string(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns the prefix tag for this entity kind.
            pub const fn prefix() -> &'static str {
                $prefix
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

entity_id!(
    /// Unique identifier for an order.
    OrderId,
    "O"
);

entity_id!(
    /// Unique identifier for a customer.
    CustomerId,
    "C"
);

entity_id!(
    /// Unique identifier for a vendor.
    VendorId,
    "V"
);

entity_id!(
    /// Unique identifier for a user account.
    UserId,
    "U"
);

entity_id!(
    /// Unique identifier for a product type.
    ProductTypeId,
    "PT"
);

entity_id!(
    /// Unique identifier for an order ledger entry.
    LedgerEntryId,
    "LE"
);

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn generated_ids_carry_their_prefix() {
        assert!(OrderId::generate().as_str().starts_with("O-"));
        assert!(CustomerId::generate().as_str().starts_with("C-"));
        assert!(VendorId::generate().as_str().starts_with("V-"));
        assert!(UserId::generate().as_str().starts_with("U-"));
        assert!(ProductTypeId::generate().as_str().starts_with("PT-"));
        assert!(LedgerEntryId::generate().as_str().starts_with("LE-"));
    }

    #[test]
    fn generated_suffix_is_hex_of_expected_length() {
        let id = OrderId::generate();
        let suffix = id.as_str().strip_prefix("O-").unwrap();
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_ids_are_statistically_unique() {
        let ids: HashSet<_> = (0..10_000).map(|_| OrderId::generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn serialization_is_transparent() {
        let id = OrderId::from_string("O-abc123def456");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"O-abc123def456\"");

        let back: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
