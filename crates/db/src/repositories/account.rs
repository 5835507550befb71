//! Account repository.
//!
//! Accounts hold the branch's money. Their balance only changes through
//! [`crate::balance::apply_account_leg`], so every change has a matching
//! `account_transactions` row.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};

use branchledger_core::access::{ensure_branch, require_actor, resolve_write_branch};
use branchledger_core::money::to_minor;
use branchledger_core::{AccessError, AccountLeg, PostingError};
use branchledger_shared::types::{BranchId, BranchScope, UserId};
use branchledger_shared::ErrorKind;

use crate::balance::{apply_account_leg, BalanceError, PostingContext};
use crate::coordinator::MutationScope;
use crate::entities::{account_transactions, accounts};
use crate::error::impl_app_error;

/// Error types for account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Account not found.
    #[error("Account not found: {0}")]
    NotFound(i32),

    /// Opening balance below zero.
    #[error("Opening balance cannot be negative: {0}")]
    NegativeOpeningBalance(Decimal),

    /// Only admins may adjust balances directly.
    #[error("Balance adjustments require admin scope")]
    AdminOnly,

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

impl AccountError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::NegativeOpeningBalance(_) => "NEGATIVE_OPENING_BALANCE",
            Self::AdminOnly => "ADMIN_ONLY",
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
            Self::NegativeOpeningBalance(_) => ErrorKind::BadRequest,
            Self::AdminOnly => ErrorKind::Forbidden,
            Self::Access(e) => e.kind(),
            Self::Posting(e) => e.kind(),
            Self::Balance(e) => e.kind(),
            Self::Database(_) => ErrorKind::Internal,
        }
    }
}

impl_app_error!(AccountError);

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    /// Target branch; the caller's primary branch when absent.
    pub branch_id: Option<BranchId>,
    /// Display name.
    pub name: String,
    /// Money already in the account.
    pub opening_balance: Decimal,
    /// Date of the opening row.
    pub opened_on: NaiveDate,
}

/// Account repository.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an account, posting the opening balance when positive.
    pub async fn create_account(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        input: CreateAccountInput,
    ) -> Result<accounts::Model, AccountError> {
        let actor = require_actor(actor)?;
        let branch = resolve_write_branch(scope, input.branch_id)?;
        if input.opening_balance < Decimal::ZERO {
            return Err(AccountError::NegativeOpeningBalance(input.opening_balance));
        }
        to_minor(input.opening_balance)?;

        let mutation = MutationScope::begin(&self.db, "create_account").await?;
        let result = async {
            let account = accounts::ActiveModel {
                branch_id: Set(branch.0),
                name: Set(input.name),
                balance_minor: Set(0),
                created_by: Set(actor.0),
                created_at: Set(chrono::Utc::now()),
                ..Default::default()
            }
            .insert(mutation.conn())
            .await?;

            if input.opening_balance.is_zero() {
                return Ok(account);
            }
            let ctx = PostingContext::new(branch.0, actor.0, "opening", input.opened_on)
                .reference(account.id)
                .labelled("opening");
            let account = apply_account_leg(
                mutation.conn(),
                AccountLeg::credit(account.id, input.opening_balance),
                &ctx,
            )
            .await?;
            Ok::<_, AccountError>(account)
        }
        .await;
        let account = mutation.finish(result).await?;

        tracing::info!(
            account_id = account.id,
            branch_id = account.branch_id,
            balance = %account.balance(),
            "account created"
        );
        Ok(account)
    }

    /// Gets an account the caller may see.
    pub async fn get_account(
        &self,
        scope: &BranchScope,
        account_id: i32,
    ) -> Result<accounts::Model, AccountError> {
        let account = accounts::Entity::find_by_id(account_id)
            .one(&self.db)
            .await?
            .ok_or(AccountError::NotFound(account_id))?;
        ensure_branch(scope, BranchId(account.branch_id))?;
        Ok(account)
    }

    /// Lists the accounts of every visible branch.
    pub async fn list_accounts(
        &self,
        scope: &BranchScope,
    ) -> Result<Vec<accounts::Model>, AccountError> {
        let mut query = accounts::Entity::find();
        if let Some(branches) = scope.visible_branches() {
            query = query.filter(accounts::Column::BranchId.is_in(branches));
        }
        Ok(query.order_by_asc(accounts::Column::Id).all(&self.db).await?)
    }

    /// Audit rows of an account, oldest first.
    pub async fn account_history(
        &self,
        scope: &BranchScope,
        account_id: i32,
    ) -> Result<Vec<account_transactions::Model>, AccountError> {
        self.get_account(scope, account_id).await?;
        Ok(account_transactions::Entity::find()
            .filter(account_transactions::Column::AccountId.eq(account_id))
            .order_by_asc(account_transactions::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Admin override: applies `delta` even if the balance goes negative.
    ///
    /// The reason is kept on the `adjustment` row.
    pub async fn adjust_account(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        account_id: i32,
        delta: Decimal,
        entry_date: NaiveDate,
        reason: &str,
    ) -> Result<accounts::Model, AccountError> {
        let actor = require_actor(actor)?;
        if !scope.is_admin {
            return Err(AccountError::AdminOnly);
        }
        if delta.is_zero() {
            return Err(PostingError::NonPositiveAmount { field: "delta" }.into());
        }
        to_minor(delta)?;
        let account = self.get_account(scope, account_id).await?;

        let mutation = MutationScope::begin(&self.db, "adjust_account").await?;
        let ctx = PostingContext::new(account.branch_id, actor.0, "adjustment", entry_date)
            .reference(account.id)
            .allow_overdraft(true)
            .labelled("adjustment")
            .note(reason);
        let result = apply_account_leg(
            mutation.conn(),
            AccountLeg {
                account_id,
                delta,
            },
            &ctx,
        )
        .await
        .map_err(AccountError::from);
        let account = mutation.finish(result).await?;

        tracing::info!(
            account_id,
            delta = %delta,
            balance = %account.balance(),
            reason,
            "account adjusted"
        );
        Ok(account)
    }
}
