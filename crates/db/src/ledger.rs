//! Party ledger writes and reads.
//!
//! Customer and supplier ledgers share one shape but live in separate tables;
//! these helpers dispatch on [`PartyKind`].

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};

use branchledger_core::money::to_minor;
use branchledger_core::{LedgerLine, PartyKind};

use crate::balance::{BalanceError, PostingContext};
use crate::entities::{customer_ledger, supplier_ledger};

/// Appends one ledger row for the party.
pub async fn append_ledger<C>(
    conn: &C,
    kind: PartyKind,
    party_id: i32,
    line: LedgerLine,
    ctx: &PostingContext<'_>,
    note: Option<String>,
) -> Result<(), BalanceError>
where
    C: ConnectionTrait,
{
    let debit_minor = to_minor(line.debit)?;
    let credit_minor = to_minor(line.credit)?;
    match kind {
        PartyKind::Customer => {
            customer_ledger::ActiveModel {
                branch_id: Set(ctx.branch_id),
                customer_id: Set(party_id),
                debit_minor: Set(debit_minor),
                credit_minor: Set(credit_minor),
                reference_type: Set(ctx.reference_type.to_string()),
                reference_id: Set(ctx.reference_id),
                entry_date: Set(ctx.entry_date),
                note: Set(note),
                created_by: Set(ctx.actor),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(conn)
            .await?;
        }
        PartyKind::Supplier => {
            supplier_ledger::ActiveModel {
                branch_id: Set(ctx.branch_id),
                supplier_id: Set(party_id),
                debit_minor: Set(debit_minor),
                credit_minor: Set(credit_minor),
                reference_type: Set(ctx.reference_type.to_string()),
                reference_id: Set(ctx.reference_id),
                entry_date: Set(ctx.entry_date),
                note: Set(note),
                created_by: Set(ctx.actor),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(conn)
            .await?;
        }
    }
    tracing::debug!(%kind, party_id, debit = %line.debit, credit = %line.credit, "ledger row appended");
    Ok(())
}

/// Ledger lines of a party, optionally limited to `[from, to]`.
pub async fn ledger_lines<C>(
    conn: &C,
    kind: PartyKind,
    party_id: i32,
    window: Option<(NaiveDate, NaiveDate)>,
) -> Result<Vec<LedgerLine>, DbErr>
where
    C: ConnectionTrait,
{
    match kind {
        PartyKind::Customer => {
            let mut query =
                customer_ledger::Entity::find().filter(customer_ledger::Column::CustomerId.eq(party_id));
            if let Some((from, to)) = window {
                query = query.filter(customer_ledger::Column::EntryDate.between(from, to));
            }
            Ok(query.all(conn).await?.iter().map(customer_ledger::Model::line).collect())
        }
        PartyKind::Supplier => {
            let mut query =
                supplier_ledger::Entity::find().filter(supplier_ledger::Column::SupplierId.eq(party_id));
            if let Some((from, to)) = window {
                query = query.filter(supplier_ledger::Column::EntryDate.between(from, to));
            }
            Ok(query.all(conn).await?.iter().map(supplier_ledger::Model::line).collect())
        }
    }
}

/// Ledger lines of several parties in one query, grouped by party.
pub async fn ledger_lines_by_party<C>(
    conn: &C,
    kind: PartyKind,
    party_ids: Vec<i32>,
    window: Option<(NaiveDate, NaiveDate)>,
) -> Result<HashMap<i32, Vec<LedgerLine>>, DbErr>
where
    C: ConnectionTrait,
{
    let mut grouped: HashMap<i32, Vec<LedgerLine>> = HashMap::new();
    match kind {
        PartyKind::Customer => {
            let mut query = customer_ledger::Entity::find()
                .filter(customer_ledger::Column::CustomerId.is_in(party_ids));
            if let Some((from, to)) = window {
                query = query.filter(customer_ledger::Column::EntryDate.between(from, to));
            }
            for row in query.all(conn).await? {
                grouped.entry(row.customer_id).or_default().push(row.line());
            }
        }
        PartyKind::Supplier => {
            let mut query = supplier_ledger::Entity::find()
                .filter(supplier_ledger::Column::SupplierId.is_in(party_ids));
            if let Some((from, to)) = window {
                query = query.filter(supplier_ledger::Column::EntryDate.between(from, to));
            }
            for row in query.all(conn).await? {
                grouped.entry(row.supplier_id).or_default().push(row.line());
            }
        }
    }
    Ok(grouped)
}

/// Number of ledger rows referencing a document.
pub async fn count_for_reference<C>(
    conn: &C,
    kind: PartyKind,
    reference_type: &str,
    reference_id: i32,
) -> Result<u64, DbErr>
where
    C: ConnectionTrait,
{
    use sea_orm::PaginatorTrait;

    match kind {
        PartyKind::Customer => {
            customer_ledger::Entity::find()
                .filter(customer_ledger::Column::ReferenceType.eq(reference_type))
                .filter(customer_ledger::Column::ReferenceId.eq(reference_id))
                .count(conn)
                .await
        }
        PartyKind::Supplier => {
            supplier_ledger::Entity::find()
                .filter(supplier_ledger::Column::ReferenceType.eq(reference_type))
                .filter(supplier_ledger::Column::ReferenceId.eq(reference_id))
                .count(conn)
                .await
        }
    }
}
