//! Branch scope resolved by the authentication layer.

use serde::{Deserialize, Serialize};

use super::BranchId;

/// The branches a caller may read and write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchScope {
    /// Admins may touch every branch.
    pub is_admin: bool,
    /// Branches explicitly granted to the caller.
    pub branch_ids: Vec<BranchId>,
    /// Branch used when a write names none.
    pub primary_branch_id: BranchId,
}

impl BranchScope {
    /// Scope of a regular user limited to the given branches.
    #[must_use]
    pub fn member(primary: BranchId, branch_ids: Vec<BranchId>) -> Self {
        Self {
            is_admin: false,
            branch_ids,
            primary_branch_id: primary,
        }
    }

    /// Scope of an administrator.
    #[must_use]
    pub fn admin(primary: BranchId) -> Self {
        Self {
            is_admin: true,
            branch_ids: vec![primary],
            primary_branch_id: primary,
        }
    }

    /// Returns true if the caller may read or write the branch.
    #[must_use]
    pub fn can_access(&self, branch: BranchId) -> bool {
        self.is_admin || branch == self.primary_branch_id || self.branch_ids.contains(&branch)
    }

    /// Branches a list query must be restricted to, `None` meaning all of them.
    #[must_use]
    pub fn visible_branches(&self) -> Option<Vec<i32>> {
        if self.is_admin {
            return None;
        }
        let mut ids: Vec<i32> = self.branch_ids.iter().map(|b| b.0).collect();
        if !ids.contains(&self.primary_branch_id.0) {
            ids.push(self.primary_branch_id.0);
        }
        ids.sort_unstable();
        Some(ids)
    }
}
