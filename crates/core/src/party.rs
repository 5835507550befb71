//! Counterparties that carry an outstanding balance.

use serde::{Deserialize, Serialize};

/// Kind of counterparty on a receipt or in an unpaid view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    /// Owes the business for sales.
    Customer,
    /// Is owed by the business for purchases.
    Supplier,
}

impl PartyKind {
    /// Name of the party table.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Customer => "customers",
            Self::Supplier => "suppliers",
        }
    }
}

impl std::fmt::Display for PartyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Supplier => write!(f, "supplier"),
        }
    }
}
