//! Shared types, errors, and configuration for BranchLedger.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for branch and user references
//! - Branch scope resolved by the authentication layer
//! - Field update sets for partial updates
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, ErrorKind};
