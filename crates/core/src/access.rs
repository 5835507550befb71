//! Branch scope and acting-user checks.
//!
//! Writes must carry an attributable actor and land in a branch the caller
//! holds. Both checks run before any store access.

use thiserror::Error;

use branchledger_shared::types::{BranchId, BranchScope, UserId};
use branchledger_shared::{AppError, ErrorKind};

/// Authorization failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// Write without an acting user.
    #[error("Acting user is required for writes")]
    MissingActor,

    /// Target branch is outside the caller's scope.
    #[error("Branch {0} is outside the caller's scope")]
    BranchForbidden(BranchId),
}

impl AccessError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingActor => "MISSING_ACTOR",
            Self::BranchForbidden(_) => "BRANCH_FORBIDDEN",
        }
    }

    /// Returns the coarse kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingActor => ErrorKind::Unauthorized,
            Self::BranchForbidden(_) => ErrorKind::Forbidden,
        }
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}

/// Returns the acting user or rejects the write.
pub fn require_actor(actor: Option<UserId>) -> Result<UserId, AccessError> {
    actor.ok_or(AccessError::MissingActor)
}

/// Picks the branch a new row is written to.
///
/// Falls back to the caller's primary branch when none is requested.
pub fn resolve_write_branch(
    scope: &BranchScope,
    requested: Option<BranchId>,
) -> Result<BranchId, AccessError> {
    let branch = requested.unwrap_or(scope.primary_branch_id);
    ensure_branch(scope, branch)?;
    Ok(branch)
}

/// Rejects access to a branch outside the scope.
pub fn ensure_branch(scope: &BranchScope, branch: BranchId) -> Result<(), AccessError> {
    if scope.can_access(branch) {
        Ok(())
    } else {
        Err(AccessError::BranchForbidden(branch))
    }
}
