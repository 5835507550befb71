//! Transfer repository for money moved between accounts of one branch.
//!
//! A posted transfer has exactly one debit/credit pair applied to its
//! accounts. Updates reverse the stored pair before applying the new one, so
//! changing 100 to 150 moves 150 in total, never 250.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set,
};

use branchledger_core::access::{ensure_branch, require_actor, resolve_write_branch};
use branchledger_core::money::to_minor;
use branchledger_core::{AccessError, PostingError, TransferPosting};
use branchledger_shared::types::{BranchId, BranchScope, FieldUpdate, StatusOutcome, UserId};
use branchledger_shared::ErrorKind;

use crate::balance::{apply_account_legs, find_account_in_branch, BalanceError, PostingContext};
use crate::coordinator::MutationScope;
use crate::entities::account_transfers;
use crate::entities::sea_orm_active_enums::TransferStatus;
use crate::error::impl_app_error;

/// Error types for transfer operations.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Transfer not found.
    #[error("Transfer not found: {0}")]
    NotFound(i32),

    /// Caller or branch check failed.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Posting rule violated.
    #[error(transparent)]
    Posting(#[from] PostingError),

    /// Balance change failed.
    #[error(transparent)]
    Balance(#[from] BalanceError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl TransferError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "TRANSFER_NOT_FOUND",
            Self::Access(e) => e.error_code(),
            Self::Posting(e) => e.error_code(),
            Self::Balance(e) => e.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the coarse kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Access(e) => e.kind(),
            Self::Posting(e) => e.kind(),
            Self::Balance(e) => e.kind(),
            Self::Database(_) => ErrorKind::Internal,
        }
    }
}

impl_app_error!(TransferError);

/// Input for creating a transfer.
#[derive(Debug, Clone)]
pub struct CreateTransferInput {
    /// Target branch; the caller's primary branch when absent.
    pub branch_id: Option<BranchId>,
    /// Account the money leaves.
    pub from_account_id: i32,
    /// Account the money enters.
    pub to_account_id: i32,
    /// Amount moved.
    pub amount: Decimal,
    /// Business date.
    pub transfer_date: NaiveDate,
    /// Initial status.
    pub status: TransferStatus,
    /// Free text.
    pub note: Option<String>,
}

/// Partial update of a transfer.
#[derive(Debug, Clone, Default)]
pub struct UpdateTransferInput {
    /// New source account.
    pub from_account_id: FieldUpdate<i32>,
    /// New destination account.
    pub to_account_id: FieldUpdate<i32>,
    /// New amount.
    pub amount: FieldUpdate<Decimal>,
    /// New date.
    pub transfer_date: FieldUpdate<NaiveDate>,
    /// New status.
    pub status: FieldUpdate<TransferStatus>,
    /// New note; `SetTo(None)` clears it.
    pub note: FieldUpdate<Option<String>>,
}

/// Filter options for listing transfers.
#[derive(Debug, Clone, Default)]
pub struct TransferFilter {
    /// Filter by status.
    pub status: Option<TransferStatus>,
    /// Transfers touching this account on either side.
    pub account_id: Option<i32>,
    /// Date range start.
    pub date_from: Option<NaiveDate>,
    /// Date range end.
    pub date_to: Option<NaiveDate>,
}

/// Transfer repository.
#[derive(Debug, Clone)]
pub struct TransferRepository {
    db: DatabaseConnection,
}

impl TransferRepository {
    /// Creates a new transfer repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a transfer, applying its pair when it is posted.
    pub async fn create_transfer(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        input: CreateTransferInput,
    ) -> Result<account_transfers::Model, TransferError> {
        let actor = require_actor(actor)?;
        let branch = resolve_write_branch(scope, input.branch_id)?;
        let posting =
            TransferPosting::new(input.from_account_id, input.to_account_id, input.amount)?;
        let amount_minor = to_minor(posting.amount())?;

        let mutation = MutationScope::begin(&self.db, "create_transfer").await?;
        let result = async {
            let txn = mutation.conn();
            check_accounts(txn, &posting, branch.0).await?;
            let transfer = account_transfers::ActiveModel {
                branch_id: Set(branch.0),
                from_account_id: Set(posting.from_account()),
                to_account_id: Set(posting.to_account()),
                amount_minor: Set(amount_minor),
                transfer_date: Set(input.transfer_date),
                status: Set(input.status),
                note: Set(input.note),
                created_by: Set(actor.0),
                ..Default::default()
            }
            .insert(txn)
            .await?;

            if transfer.status.is_posted() {
                let ctx = PostingContext::new(branch.0, actor.0, "transfer", transfer.transfer_date)
                    .reference(transfer.id)
                    .allow_overdraft(scope.is_admin);
                apply_account_legs(txn, &posting.legs(), &ctx).await?;
            }
            Ok::<_, TransferError>(transfer)
        }
        .await;
        let transfer = mutation.finish(result).await?;

        tracing::info!(
            transfer_id = transfer.id,
            branch_id = transfer.branch_id,
            from = transfer.from_account_id,
            to = transfer.to_account_id,
            amount = %transfer.amount(),
            status = transfer.status.as_str(),
            "transfer created"
        );
        Ok(transfer)
    }

    /// Gets a transfer the caller may see.
    pub async fn get_transfer(
        &self,
        scope: &BranchScope,
        transfer_id: i32,
    ) -> Result<account_transfers::Model, TransferError> {
        let transfer = account_transfers::Entity::find_by_id(transfer_id)
            .one(&self.db)
            .await?
            .ok_or(TransferError::NotFound(transfer_id))?;
        ensure_branch(scope, BranchId(transfer.branch_id))?;
        Ok(transfer)
    }

    /// Lists transfers in the visible branches, newest first.
    pub async fn list_transfers(
        &self,
        scope: &BranchScope,
        filter: TransferFilter,
    ) -> Result<Vec<account_transfers::Model>, TransferError> {
        let mut query = account_transfers::Entity::find();
        if let Some(branches) = scope.visible_branches() {
            query = query.filter(account_transfers::Column::BranchId.is_in(branches));
        }
        if let Some(status) = filter.status {
            query = query.filter(account_transfers::Column::Status.eq(status));
        }
        if let Some(account_id) = filter.account_id {
            query = query.filter(
                Condition::any()
                    .add(account_transfers::Column::FromAccountId.eq(account_id))
                    .add(account_transfers::Column::ToAccountId.eq(account_id)),
            );
        }
        if let Some(from) = filter.date_from {
            query = query.filter(account_transfers::Column::TransferDate.gte(from));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(account_transfers::Column::TransferDate.lte(to));
        }
        Ok(query
            .order_by_desc(account_transfers::Column::TransferDate)
            .order_by_desc(account_transfers::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Updates a transfer.
    ///
    /// The stored pair is reversed when the transfer was posted, and the new
    /// pair applied when it is posted afterwards, in one transaction.
    pub async fn update_transfer(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        transfer_id: i32,
        input: UpdateTransferInput,
    ) -> Result<account_transfers::Model, TransferError> {
        let actor = require_actor(actor)?;
        let existing = self.get_transfer(scope, transfer_id).await?;
        let old = TransferPosting::new(
            existing.from_account_id,
            existing.to_account_id,
            existing.amount(),
        )?;
        let new = TransferPosting::new(
            input.from_account_id.apply(existing.from_account_id),
            input.to_account_id.apply(existing.to_account_id),
            input.amount.apply(existing.amount()),
        )?;
        let amount_minor = to_minor(new.amount())?;
        let old_status = existing.status;
        let new_status = input.status.apply(old_status);
        let transfer_date = input.transfer_date.apply(existing.transfer_date);
        let note = input.note.apply(existing.note.clone());
        let branch_id = existing.branch_id;

        let mutation = MutationScope::begin(&self.db, "update_transfer").await?;
        let result = async {
            let txn = mutation.conn();
            check_accounts(txn, &new, branch_id).await?;
            let ctx = PostingContext::new(branch_id, actor.0, "transfer", transfer_date)
                .reference(transfer_id)
                .allow_overdraft(scope.is_admin);

            if old_status.is_posted() {
                apply_account_legs(txn, &old.reversal_legs(), &ctx.labelled("reversal")).await?;
            }

            let mut active: account_transfers::ActiveModel = existing.into();
            active.from_account_id = Set(new.from_account());
            active.to_account_id = Set(new.to_account());
            active.amount_minor = Set(amount_minor);
            active.transfer_date = Set(transfer_date);
            active.status = Set(new_status);
            active.note = Set(note);
            active.updated_by = Set(Some(actor.0));
            let transfer = active.update(txn).await?;

            if new_status.is_posted() {
                apply_account_legs(txn, &new.legs(), &ctx).await?;
            }
            Ok::<_, TransferError>(transfer)
        }
        .await;
        let transfer = mutation.finish(result).await?;

        tracing::info!(
            transfer_id,
            old_status = old_status.as_str(),
            new_status = new_status.as_str(),
            amount = %transfer.amount(),
            "transfer updated"
        );
        Ok(transfer)
    }

    /// Deletes a transfer, reversing its pair first when it was posted.
    pub async fn delete_transfer(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        transfer_id: i32,
    ) -> Result<StatusOutcome, TransferError> {
        let actor = require_actor(actor)?;
        let existing = self.get_transfer(scope, transfer_id).await?;
        let posting = TransferPosting::new(
            existing.from_account_id,
            existing.to_account_id,
            existing.amount(),
        )?;
        let status = existing.status;

        let mutation = MutationScope::begin(&self.db, "delete_transfer").await?;
        let result = async {
            let txn = mutation.conn();
            if status.is_posted() {
                let ctx = PostingContext::new(
                    existing.branch_id,
                    actor.0,
                    "transfer",
                    existing.transfer_date,
                )
                .reference(transfer_id)
                .allow_overdraft(scope.is_admin)
                .labelled("reversal");
                apply_account_legs(txn, &posting.reversal_legs(), &ctx).await?;
            }
            account_transfers::Entity::delete_by_id(transfer_id)
                .exec(txn)
                .await?;
            Ok::<_, TransferError>(())
        }
        .await;
        mutation.finish(result).await?;

        let oper = if status.is_posted() { "reversed" } else { "none" };
        tracing::info!(transfer_id, status = status.as_str(), oper, "transfer deleted");
        Ok(StatusOutcome {
            status: status.as_str().to_string(),
            oper: oper.to_string(),
        })
    }
}

async fn check_accounts(
    txn: &DatabaseTransaction,
    posting: &TransferPosting,
    branch_id: i32,
) -> Result<(), BalanceError> {
    find_account_in_branch(txn, posting.from_account(), branch_id).await?;
    find_account_in_branch(txn, posting.to_account(), branch_id).await?;
    Ok(())
}
