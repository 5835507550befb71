//! Core posting rules for BranchLedger.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Every money rule the engine enforces is decided here; the db crate only
//! persists the outcome.
//!
//! # Modules
//!
//! - `access` - Branch scope and acting-user checks
//! - `posting` - Double-entry leg derivation for transfers and receipts
//! - `balance` - Party clamp and account overdraft policy
//! - `money` - Decimal amounts and stored minor units
//! - `period` - Calendar periods for recurring charges
//! - `charge` - Expense payment amounts
//! - `salary` - Salary remittance bound
//! - `reconcile` - Outstanding balance policy

pub mod access;
pub mod balance;
pub mod charge;
pub mod error;
pub mod money;
pub mod party;
pub mod period;
pub mod posting;
pub mod reconcile;
pub mod salary;

#[cfg(test)]
mod posting_props;

pub use access::{require_actor, resolve_write_branch, AccessError};
pub use error::PostingError;
pub use party::PartyKind;
pub use period::BillingPeriod;
pub use posting::{AccountLeg, LedgerLine, ReceiptPosting, TransferPosting};
