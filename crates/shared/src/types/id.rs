//! Typed IDs for type-safe entity references.
//!
//! Rows use plain integer keys; the typed wrappers exist where mixing them up
//! would be an authorization bug (a user id passed as a branch id).

use serde::{Deserialize, Serialize};

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i32);

        impl $name {
            /// Creates an ID from a raw key.
            #[must_use]
            pub const fn new(raw: i32) -> Self {
                Self(raw)
            }

            /// Returns the raw key.
            #[must_use]
            pub const fn into_inner(self) -> i32 {
                self.0
            }
        }

        impl From<i32> for $name {
            fn from(raw: i32) -> Self {
                Self(raw)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse()?))
            }
        }
    };
}

typed_id!(BranchId, "Unique identifier for a branch.");
typed_id!(UserId, "Unique identifier for an acting user.");

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_typed_id_roundtrip() {
        let id = BranchId::new(7);
        assert_eq!(id.into_inner(), 7);
        assert_eq!(BranchId::from(7), id);
        assert_eq!(id.to_string(), "7");
    }

    #[test]
    fn test_typed_id_from_str() {
        assert_eq!(UserId::from_str(" 42 ").unwrap(), UserId(42));
        assert!(UserId::from_str("abc").is_err());
    }

    #[test]
    fn test_typed_id_serializes_transparently() {
        assert_eq!(serde_json::to_string(&BranchId(3)).unwrap(), "3");
        let parsed: UserId = serde_json::from_str("9").unwrap();
        assert_eq!(parsed, UserId(9));
    }
}
