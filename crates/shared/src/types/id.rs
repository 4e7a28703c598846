//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `ResourceId` where a
//! `UnitId` is expected. The storage layer uses plain `i32` surrogate keys;
//! the wrappers exist at the API seams.

use serde::{Deserialize, Serialize};

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i32);

        impl $name {
            /// Creates an ID from a raw key.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Returns the raw key.
            #[must_use]
            pub const fn into_inner(self) -> i32 {
                self.0
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

typed_id!(ResourceId, "Unique identifier for a resource.");
typed_id!(UnitId, "Unique identifier for a unit of measurement.");
typed_id!(ClientId, "Unique identifier for a client.");
typed_id!(ReceiptDocumentId, "Unique identifier for a receipt document.");
typed_id!(ShipmentDocumentId, "Unique identifier for a shipment document.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let id = ResourceId::new(42);
        assert_eq!(id.into_inner(), 42);
        assert_eq!(ResourceId::from(42), id);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_serde_transparent() {
        let id = UnitId::new(7);
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
        let back: UnitId = serde_json::from_str("7").unwrap();
        assert_eq!(back, id);
    }
}
