//! Common types used across the application.

pub mod id;
pub mod outcome;
pub mod scope;
pub mod update;

pub use id::*;
pub use outcome::{Created, Deleted, StatusOutcome};
pub use scope::BranchScope;
pub use update::FieldUpdate;
