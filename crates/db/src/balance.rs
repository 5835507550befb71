//! Balance adjuster.
//!
//! Applies signed deltas to account balances and to the outstanding balance
//! of customers and suppliers. Every function here expects to run inside a
//! [`crate::MutationScope`]; the rows it changes are locked before they are
//! read.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Alias, Expr, Query};
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, QuerySelect, Set};

use branchledger_core::balance::{clamped_balance, next_account_balance};
use branchledger_core::money::{from_minor, to_minor};
use branchledger_core::{AccountLeg, PartyKind, PostingError};
use branchledger_shared::ErrorKind;

use crate::entities::{account_transactions, accounts};
use crate::schema::{SchemaError, SchemaRegistry};

/// Errors raised while applying a balance change.
#[derive(Debug, thiserror::Error)]
pub enum BalanceError {
    /// Account does not exist.
    #[error("Account not found: {0}")]
    AccountNotFound(i32),

    /// Account belongs to another branch.
    #[error("Account {account_id} does not belong to branch {branch_id}")]
    AccountBranchMismatch {
        /// The account.
        account_id: i32,
        /// Branch of the posting.
        branch_id: i32,
    },

    /// Customer or supplier does not exist in the branch.
    #[error("{kind} {id} not found in branch {branch_id}")]
    PartyNotFound {
        /// Party kind.
        kind: PartyKind,
        /// Party id.
        id: i32,
        /// Branch searched.
        branch_id: i32,
    },

    /// Posting rule violated.
    #[error(transparent)]
    Posting(#[from] PostingError),

    /// Balance column could not be resolved.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl BalanceError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountBranchMismatch { .. } => "ACCOUNT_BRANCH_MISMATCH",
            Self::PartyNotFound { .. } => "PARTY_NOT_FOUND",
            Self::Posting(e) => e.error_code(),
            Self::Schema(e) => e.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the coarse kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AccountNotFound(_) | Self::PartyNotFound { .. } => ErrorKind::NotFound,
            Self::AccountBranchMismatch { .. } => ErrorKind::BadRequest,
            Self::Posting(e) => e.kind(),
            Self::Schema(_) | Self::Database(_) => ErrorKind::Internal,
        }
    }
}

/// Attribution of one posting.
#[derive(Debug, Clone, Copy)]
pub struct PostingContext<'a> {
    /// Branch of the business event.
    pub branch_id: i32,
    /// Acting user.
    pub actor: i32,
    /// Kind of document that caused the posting.
    pub reference_type: &'static str,
    /// Id of that document, when it has one yet.
    pub reference_id: Option<i32>,
    /// Business date.
    pub entry_date: NaiveDate,
    /// Admin override: account may go below zero.
    pub allow_overdraft: bool,
    /// Overrides the deposit/withdrawal label of account rows.
    pub label: Option<&'static str>,
    /// Free text stored on account rows.
    pub note: Option<&'a str>,
}

impl<'a> PostingContext<'a> {
    /// Context for a posting caused by `reference_type`.
    #[must_use]
    pub const fn new(
        branch_id: i32,
        actor: i32,
        reference_type: &'static str,
        entry_date: NaiveDate,
    ) -> Self {
        Self {
            branch_id,
            actor,
            reference_type,
            reference_id: None,
            entry_date,
            allow_overdraft: false,
            label: None,
            note: None,
        }
    }

    /// Attaches the document id.
    #[must_use]
    pub const fn reference(mut self, id: i32) -> Self {
        self.reference_id = Some(id);
        self
    }

    /// Sets the admin override.
    #[must_use]
    pub const fn allow_overdraft(mut self, allow: bool) -> Self {
        self.allow_overdraft = allow;
        self
    }

    /// Labels account rows with `label`.
    #[must_use]
    pub const fn labelled(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    /// Attaches a note to account rows.
    #[must_use]
    pub const fn note(mut self, note: &'a str) -> Self {
        self.note = Some(note);
        self
    }
}

/// Loads an account and checks it belongs to `branch_id`.
pub async fn find_account_in_branch<C>(
    conn: &C,
    account_id: i32,
    branch_id: i32,
) -> Result<accounts::Model, BalanceError>
where
    C: ConnectionTrait,
{
    let account = accounts::Entity::find_by_id(account_id)
        .one(conn)
        .await?
        .ok_or(BalanceError::AccountNotFound(account_id))?;
    if account.branch_id != branch_id {
        return Err(BalanceError::AccountBranchMismatch {
            account_id,
            branch_id,
        });
    }
    Ok(account)
}

/// Applies one leg to its account and appends the audit row.
///
/// Returns the account with its new balance.
pub async fn apply_account_leg<C>(
    conn: &C,
    leg: AccountLeg,
    ctx: &PostingContext<'_>,
) -> Result<accounts::Model, BalanceError>
where
    C: ConnectionTrait,
{
    let account = accounts::Entity::find_by_id(leg.account_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or(BalanceError::AccountNotFound(leg.account_id))?;
    if account.branch_id != ctx.branch_id {
        return Err(BalanceError::AccountBranchMismatch {
            account_id: leg.account_id,
            branch_id: ctx.branch_id,
        });
    }

    let next = next_account_balance(
        account.id,
        account.balance(),
        leg.delta,
        ctx.allow_overdraft,
    )?;
    let next_minor = to_minor(next)?;
    let delta_minor = to_minor(leg.delta)?;

    let mut active: accounts::ActiveModel = account.into();
    active.balance_minor = Set(next_minor);
    let updated = active.update(conn).await?;

    account_transactions::ActiveModel {
        branch_id: Set(ctx.branch_id),
        account_id: Set(leg.account_id),
        kind: Set(ctx.label.unwrap_or_else(|| leg.direction()).to_string()),
        amount_minor: Set(delta_minor),
        balance_after_minor: Set(next_minor),
        reference_type: Set(ctx.reference_type.to_string()),
        reference_id: Set(ctx.reference_id),
        entry_date: Set(ctx.entry_date),
        created_by: Set(ctx.actor),
        created_at: Set(Utc::now()),
        note: Set(ctx.note.map(str::to_owned)),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    tracing::debug!(
        account_id = leg.account_id,
        delta = %leg.delta,
        balance = %next,
        reference = ctx.reference_type,
        "account leg applied"
    );
    Ok(updated)
}

/// Applies every leg in order.
pub async fn apply_account_legs<C>(
    conn: &C,
    legs: &[AccountLeg],
    ctx: &PostingContext<'_>,
) -> Result<(), BalanceError>
where
    C: ConnectionTrait,
{
    for leg in legs {
        apply_account_leg(conn, *leg, ctx).await?;
    }
    Ok(())
}

/// Applies `delta` to a party's outstanding balance, clamped at zero.
///
/// Walk-in parties (`party_id` is `None`) carry no balance and are skipped.
/// Returns the stored balance.
pub async fn adjust_party_balance<C>(
    conn: &C,
    registry: &SchemaRegistry,
    kind: PartyKind,
    party_id: Option<i32>,
    branch_id: i32,
    delta: Decimal,
) -> Result<Option<Decimal>, BalanceError>
where
    C: ConnectionTrait,
{
    let Some(id) = party_id else {
        return Ok(None);
    };
    let column = registry.balance_column(conn, kind).await?;
    let backend = conn.get_database_backend();

    let select = Query::select()
        .expr_as(Expr::col(Alias::new(column.as_str())), Alias::new("balance"))
        .from(Alias::new(kind.table()))
        .and_where(Expr::col(Alias::new("id")).eq(id))
        .and_where(Expr::col(Alias::new("branch_id")).eq(branch_id))
        .lock_exclusive()
        .to_owned();
    let row = conn
        .query_one(backend.build(&select))
        .await?
        .ok_or(BalanceError::PartyNotFound {
            kind,
            id,
            branch_id,
        })?;
    let current = from_minor(row.try_get::<Option<i64>>("", "balance")?.unwrap_or_default());

    let next = clamped_balance(current, delta);
    let update = Query::update()
        .table(Alias::new(kind.table()))
        .value(Alias::new(column.as_str()), to_minor(next)?)
        .and_where(Expr::col(Alias::new("id")).eq(id))
        .and_where(Expr::col(Alias::new("branch_id")).eq(branch_id))
        .to_owned();
    conn.execute(backend.build(&update)).await?;

    tracing::debug!(%kind, party_id = id, delta = %delta, balance = %next, "party balance adjusted");
    Ok(Some(next))
}

/// Reads a party's outstanding balance without locking it.
pub async fn party_balance<C>(
    conn: &C,
    registry: &SchemaRegistry,
    kind: PartyKind,
    party_id: i32,
) -> Result<Option<Decimal>, BalanceError>
where
    C: ConnectionTrait,
{
    let column = registry.balance_column(conn, kind).await?;
    let select = Query::select()
        .expr_as(Expr::col(Alias::new(column.as_str())), Alias::new("balance"))
        .from(Alias::new(kind.table()))
        .and_where(Expr::col(Alias::new("id")).eq(party_id))
        .to_owned();
    let row = conn
        .query_one(conn.get_database_backend().build(&select))
        .await?;
    Ok(match row {
        Some(row) => Some(from_minor(
            row.try_get::<Option<i64>>("", "balance")?.unwrap_or_default(),
        )),
        None => None,
    })
}
