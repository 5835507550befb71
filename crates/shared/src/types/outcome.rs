//! Small result objects returned by bulk and delete operations.

use serde::{Deserialize, Serialize};

/// Number of rows an operation created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
    /// Rows created.
    pub created: u64,
}

/// Number of rows an operation deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deleted {
    /// Rows deleted.
    pub deleted: u64,
}

/// Status of the affected row and what was done to its balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusOutcome {
    /// Status of the row when the operation ran.
    pub status: String,
    /// Balance operation performed, e.g. `reversed` or `none`.
    pub oper: String,
}
