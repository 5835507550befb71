//! Receipt repository for customer and supplier receipts.
//!
//! A customer receipt brings money into an account; a supplier receipt pays
//! money out of one. Both reduce what the party owes or is owed and append
//! one row to the party's ledger. The two kinds live in separate tables with
//! the same shape and are surfaced here as one [`Receipt`] type.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Serialize;

use branchledger_core::access::{ensure_branch, require_actor, resolve_write_branch};
use branchledger_core::money::{from_minor, to_minor};
use branchledger_core::{AccessError, PartyKind, PostingError, ReceiptPosting};
use branchledger_shared::types::{BranchId, BranchScope, Deleted, FieldUpdate, UserId};
use branchledger_shared::ErrorKind;

use crate::balance::{adjust_party_balance, apply_account_leg, BalanceError, PostingContext};
use crate::coordinator::MutationScope;
use crate::entities::{customer_receipts, supplier_receipts};
use crate::error::impl_app_error;
use crate::ledger::append_ledger;
use crate::schema::SchemaRegistry;

/// Error types for receipt operations.
#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    /// Receipt not found.
    #[error("{kind} receipt not found: {id}")]
    NotFound {
        /// Receipt kind.
        kind: PartyKind,
        /// Receipt id.
        id: i32,
    },

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

impl ReceiptError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "RECEIPT_NOT_FOUND",
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
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Access(e) => e.kind(),
            Self::Posting(e) => e.kind(),
            Self::Balance(e) => e.kind(),
            Self::Database(_) => ErrorKind::Internal,
        }
    }
}

impl_app_error!(ReceiptError);

/// A customer or supplier receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    /// Receipt id, unique per kind.
    pub id: i32,
    /// Counterparty kind.
    pub kind: PartyKind,
    /// Owning branch.
    pub branch_id: i32,
    /// Counterparty; `None` for walk-in parties.
    pub party_id: Option<i32>,
    /// Account the money entered or left.
    pub account_id: i32,
    /// Amount received or paid.
    pub amount: Decimal,
    /// Business date.
    pub receipt_date: NaiveDate,
    /// Free text.
    pub note: Option<String>,
    /// Creating user.
    pub created_by: i32,
    /// Last updating user.
    pub updated_by: Option<i32>,
}

impl From<customer_receipts::Model> for Receipt {
    fn from(m: customer_receipts::Model) -> Self {
        Self {
            id: m.id,
            kind: PartyKind::Customer,
            branch_id: m.branch_id,
            party_id: m.customer_id,
            account_id: m.account_id,
            amount: from_minor(m.amount_minor),
            receipt_date: m.receipt_date,
            note: m.note,
            created_by: m.created_by,
            updated_by: m.updated_by,
        }
    }
}

impl From<supplier_receipts::Model> for Receipt {
    fn from(m: supplier_receipts::Model) -> Self {
        Self {
            id: m.id,
            kind: PartyKind::Supplier,
            branch_id: m.branch_id,
            party_id: m.supplier_id,
            account_id: m.account_id,
            amount: from_minor(m.amount_minor),
            receipt_date: m.receipt_date,
            note: m.note,
            created_by: m.created_by,
            updated_by: m.updated_by,
        }
    }
}

/// Input for creating a receipt.
#[derive(Debug, Clone)]
pub struct CreateReceiptInput {
    /// Target branch; the caller's primary branch when absent.
    pub branch_id: Option<BranchId>,
    /// Counterparty; `None` for walk-in parties.
    pub party_id: Option<i32>,
    /// Account the money enters or leaves.
    pub account_id: i32,
    /// Amount.
    pub amount: Decimal,
    /// Business date.
    pub receipt_date: NaiveDate,
    /// Free text.
    pub note: Option<String>,
}

/// Partial update of a receipt.
#[derive(Debug, Clone, Default)]
pub struct UpdateReceiptInput {
    /// New counterparty; `SetTo(None)` turns it into a walk-in receipt.
    pub party_id: FieldUpdate<Option<i32>>,
    /// New account.
    pub account_id: FieldUpdate<i32>,
    /// New amount.
    pub amount: FieldUpdate<Decimal>,
    /// New date.
    pub receipt_date: FieldUpdate<NaiveDate>,
    /// New note.
    pub note: FieldUpdate<Option<String>>,
}

/// Filter options for listing receipts.
#[derive(Debug, Clone, Default)]
pub struct ReceiptFilter {
    /// Receipts of this party.
    pub party_id: Option<i32>,
    /// Date range start.
    pub date_from: Option<NaiveDate>,
    /// Date range end.
    pub date_to: Option<NaiveDate>,
}

/// Stored fields of a receipt, without id and audit columns.
struct ReceiptFields {
    branch_id: i32,
    party_id: Option<i32>,
    account_id: i32,
    amount_minor: i64,
    receipt_date: NaiveDate,
    note: Option<String>,
}

const fn reference_type(kind: PartyKind) -> &'static str {
    match kind {
        PartyKind::Customer => "customer_receipt",
        PartyKind::Supplier => "supplier_receipt",
    }
}

/// Receipt repository.
#[derive(Debug, Clone)]
pub struct ReceiptRepository {
    db: DatabaseConnection,
    schema: Arc<SchemaRegistry>,
}

impl ReceiptRepository {
    /// Creates a new receipt repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, schema: Arc<SchemaRegistry>) -> Self {
        Self { db, schema }
    }

    /// Records a receipt and applies its account, balance and ledger effects.
    pub async fn create_receipt(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        kind: PartyKind,
        input: CreateReceiptInput,
    ) -> Result<Receipt, ReceiptError> {
        let actor = require_actor(actor)?;
        let branch = resolve_write_branch(scope, input.branch_id)?;
        let posting =
            ReceiptPosting::new(kind, input.account_id, input.party_id.is_some(), input.amount)?;
        let fields = ReceiptFields {
            branch_id: branch.0,
            party_id: input.party_id,
            account_id: input.account_id,
            amount_minor: to_minor(posting.amount)?,
            receipt_date: input.receipt_date,
            note: input.note,
        };

        let mutation = MutationScope::begin(&self.db, "create_receipt").await?;
        let result = async {
            let txn = mutation.conn();
            let receipt = insert_receipt(txn, kind, fields, actor.0).await?;
            let ctx = PostingContext::new(
                receipt.branch_id,
                actor.0,
                reference_type(kind),
                receipt.receipt_date,
            )
            .reference(receipt.id)
            .allow_overdraft(scope.is_admin);
            self.apply_posting(txn, &posting, receipt.party_id, &ctx, receipt.note.clone())
                .await?;
            Ok::<_, ReceiptError>(receipt)
        }
        .await;
        let receipt = mutation.finish(result).await?;

        tracing::info!(
            %kind,
            receipt_id = receipt.id,
            branch_id = receipt.branch_id,
            party_id = ?receipt.party_id,
            account_id = receipt.account_id,
            amount = %receipt.amount,
            "receipt created"
        );
        Ok(receipt)
    }

    /// Gets a receipt the caller may see.
    pub async fn get_receipt(
        &self,
        scope: &BranchScope,
        kind: PartyKind,
        receipt_id: i32,
    ) -> Result<Receipt, ReceiptError> {
        let receipt = match kind {
            PartyKind::Customer => customer_receipts::Entity::find_by_id(receipt_id)
                .one(&self.db)
                .await?
                .map(Receipt::from),
            PartyKind::Supplier => supplier_receipts::Entity::find_by_id(receipt_id)
                .one(&self.db)
                .await?
                .map(Receipt::from),
        }
        .ok_or(ReceiptError::NotFound {
            kind,
            id: receipt_id,
        })?;
        ensure_branch(scope, BranchId(receipt.branch_id))?;
        Ok(receipt)
    }

    /// Lists receipts of one kind in the visible branches, newest first.
    pub async fn list_receipts(
        &self,
        scope: &BranchScope,
        kind: PartyKind,
        filter: ReceiptFilter,
    ) -> Result<Vec<Receipt>, ReceiptError> {
        let branches = scope.visible_branches();
        let receipts = match kind {
            PartyKind::Customer => {
                use customer_receipts::{Column, Entity};
                let mut query = Entity::find();
                if let Some(branches) = branches {
                    query = query.filter(Column::BranchId.is_in(branches));
                }
                if let Some(party_id) = filter.party_id {
                    query = query.filter(Column::CustomerId.eq(party_id));
                }
                if let Some(from) = filter.date_from {
                    query = query.filter(Column::ReceiptDate.gte(from));
                }
                if let Some(to) = filter.date_to {
                    query = query.filter(Column::ReceiptDate.lte(to));
                }
                query
                    .order_by_desc(Column::ReceiptDate)
                    .order_by_desc(Column::Id)
                    .all(&self.db)
                    .await?
                    .into_iter()
                    .map(Receipt::from)
                    .collect()
            }
            PartyKind::Supplier => {
                use supplier_receipts::{Column, Entity};
                let mut query = Entity::find();
                if let Some(branches) = branches {
                    query = query.filter(Column::BranchId.is_in(branches));
                }
                if let Some(party_id) = filter.party_id {
                    query = query.filter(Column::SupplierId.eq(party_id));
                }
                if let Some(from) = filter.date_from {
                    query = query.filter(Column::ReceiptDate.gte(from));
                }
                if let Some(to) = filter.date_to {
                    query = query.filter(Column::ReceiptDate.lte(to));
                }
                query
                    .order_by_desc(Column::ReceiptDate)
                    .order_by_desc(Column::Id)
                    .all(&self.db)
                    .await?
                    .into_iter()
                    .map(Receipt::from)
                    .collect()
            }
        };
        Ok(receipts)
    }

    /// Updates a receipt: reverses every stored effect, then applies the new one.
    pub async fn update_receipt(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        kind: PartyKind,
        receipt_id: i32,
        input: UpdateReceiptInput,
    ) -> Result<Receipt, ReceiptError> {
        let actor = require_actor(actor)?;
        let existing = self.get_receipt(scope, kind, receipt_id).await?;
        let old = ReceiptPosting::new(
            kind,
            existing.account_id,
            existing.party_id.is_some(),
            existing.amount,
        )?;
        let party_id = input.party_id.apply(existing.party_id);
        let account_id = input.account_id.apply(existing.account_id);
        let new = ReceiptPosting::new(
            kind,
            account_id,
            party_id.is_some(),
            input.amount.apply(existing.amount),
        )?;
        let fields = ReceiptFields {
            branch_id: existing.branch_id,
            party_id,
            account_id,
            amount_minor: to_minor(new.amount)?,
            receipt_date: input.receipt_date.apply(existing.receipt_date),
            note: input.note.apply(existing.note.clone()),
        };

        let mutation = MutationScope::begin(&self.db, "update_receipt").await?;
        let result = async {
            let txn = mutation.conn();
            let ctx = PostingContext::new(
                existing.branch_id,
                actor.0,
                reference_type(kind),
                fields.receipt_date,
            )
            .reference(receipt_id)
            .allow_overdraft(scope.is_admin);

            self.apply_posting(
                txn,
                &old.reversed(),
                existing.party_id,
                &ctx.labelled("reversal"),
                Some(format!("reversal of {} {receipt_id}", reference_type(kind))),
            )
            .await?;
            let note = fields.note.clone();
            let receipt = update_receipt_row(txn, kind, receipt_id, fields, actor.0).await?;
            self.apply_posting(txn, &new, receipt.party_id, &ctx, note)
                .await?;
            Ok::<_, ReceiptError>(receipt)
        }
        .await;
        let receipt = mutation.finish(result).await?;

        tracing::info!(
            %kind,
            receipt_id,
            old_amount = %old.amount,
            new_amount = %receipt.amount,
            "receipt updated"
        );
        Ok(receipt)
    }

    /// Deletes a receipt after reversing its effects.
    ///
    /// The ledger keeps the original row and gains a compensating one.
    pub async fn delete_receipt(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        kind: PartyKind,
        receipt_id: i32,
    ) -> Result<Deleted, ReceiptError> {
        let actor = require_actor(actor)?;
        let existing = self.get_receipt(scope, kind, receipt_id).await?;
        let posting = ReceiptPosting::new(
            kind,
            existing.account_id,
            existing.party_id.is_some(),
            existing.amount,
        )?;

        let mutation = MutationScope::begin(&self.db, "delete_receipt").await?;
        let result = async {
            let txn = mutation.conn();
            let ctx = PostingContext::new(
                existing.branch_id,
                actor.0,
                reference_type(kind),
                existing.receipt_date,
            )
            .reference(receipt_id)
            .allow_overdraft(scope.is_admin)
            .labelled("reversal");
            self.apply_posting(
                txn,
                &posting.reversed(),
                existing.party_id,
                &ctx,
                Some(format!("reversal of {} {receipt_id}", reference_type(kind))),
            )
            .await?;
            let deleted = match kind {
                PartyKind::Customer => {
                    customer_receipts::Entity::delete_by_id(receipt_id)
                        .exec(txn)
                        .await?
                }
                PartyKind::Supplier => {
                    supplier_receipts::Entity::delete_by_id(receipt_id)
                        .exec(txn)
                        .await?
                }
            };
            Ok::<_, ReceiptError>(deleted.rows_affected)
        }
        .await;
        let deleted = mutation.finish(result).await?;

        tracing::info!(%kind, receipt_id, amount = %existing.amount, "receipt deleted");
        Ok(Deleted { deleted })
    }

    /// Applies the account leg, party balance change and ledger row of a posting.
    async fn apply_posting<C>(
        &self,
        conn: &C,
        posting: &ReceiptPosting,
        party_id: Option<i32>,
        ctx: &PostingContext<'_>,
        note: Option<String>,
    ) -> Result<(), ReceiptError>
    where
        C: ConnectionTrait,
    {
        posting.verify()?;
        apply_account_leg(conn, posting.account, ctx).await?;
        if let (Some(party_id), Some(delta), Some(line)) =
            (party_id, posting.party_delta, posting.ledger)
        {
            adjust_party_balance(
                conn,
                &self.schema,
                posting.kind,
                Some(party_id),
                ctx.branch_id,
                delta,
            )
            .await?;
            append_ledger(conn, posting.kind, party_id, line, ctx, note).await?;
        }
        Ok(())
    }
}

async fn insert_receipt<C>(
    conn: &C,
    kind: PartyKind,
    fields: ReceiptFields,
    actor: i32,
) -> Result<Receipt, DbErr>
where
    C: ConnectionTrait,
{
    Ok(match kind {
        PartyKind::Customer => customer_receipts::ActiveModel {
            branch_id: Set(fields.branch_id),
            customer_id: Set(fields.party_id),
            account_id: Set(fields.account_id),
            amount_minor: Set(fields.amount_minor),
            receipt_date: Set(fields.receipt_date),
            note: Set(fields.note),
            created_by: Set(actor),
            ..Default::default()
        }
        .insert(conn)
        .await?
        .into(),
        PartyKind::Supplier => supplier_receipts::ActiveModel {
            branch_id: Set(fields.branch_id),
            supplier_id: Set(fields.party_id),
            account_id: Set(fields.account_id),
            amount_minor: Set(fields.amount_minor),
            receipt_date: Set(fields.receipt_date),
            note: Set(fields.note),
            created_by: Set(actor),
            ..Default::default()
        }
        .insert(conn)
        .await?
        .into(),
    })
}

async fn update_receipt_row<C>(
    conn: &C,
    kind: PartyKind,
    receipt_id: i32,
    fields: ReceiptFields,
    actor: i32,
) -> Result<Receipt, DbErr>
where
    C: ConnectionTrait,
{
    Ok(match kind {
        PartyKind::Customer => customer_receipts::ActiveModel {
            id: Set(receipt_id),
            customer_id: Set(fields.party_id),
            account_id: Set(fields.account_id),
            amount_minor: Set(fields.amount_minor),
            receipt_date: Set(fields.receipt_date),
            note: Set(fields.note),
            updated_by: Set(Some(actor)),
            ..Default::default()
        }
        .update(conn)
        .await?
        .into(),
        PartyKind::Supplier => supplier_receipts::ActiveModel {
            id: Set(receipt_id),
            supplier_id: Set(fields.party_id),
            account_id: Set(fields.account_id),
            amount_minor: Set(fields.amount_minor),
            receipt_date: Set(fields.receipt_date),
            note: Set(fields.note),
            updated_by: Set(Some(actor)),
            ..Default::default()
        }
        .update(conn)
        .await?
        .into(),
    })
}
