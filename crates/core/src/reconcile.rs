//! Outstanding balance policy.
//!
//! Two sources can say what a party owes: the denormalized balance column and
//! a figure derived from documents or the ledger. Historical data has both
//! kinds of gaps, so the column wins only while it is positive and the result
//! is never negative.

use rust_decimal::Decimal;

use crate::party::PartyKind;
use crate::posting::LedgerLine;

/// Owed amount derived from unpaid documents minus receipts.
///
/// `documents` yields `(total, paid)` for each sale or purchase.
pub fn derived_from_documents<D, R>(documents: D, receipts: R) -> Decimal
where
    D: IntoIterator<Item = (Decimal, Decimal)>,
    R: IntoIterator<Item = Decimal>,
{
    let unpaid: Decimal = documents.into_iter().map(|(total, paid)| total - paid).sum();
    let received: Decimal = receipts.into_iter().sum();
    unpaid - received
}

/// Owed amount derived from ledger lines.
///
/// Customers owe debits net of credits; suppliers are owed credits net of debits.
pub fn derived_from_ledger<L>(kind: PartyKind, lines: L) -> Decimal
where
    L: IntoIterator<Item = LedgerLine>,
{
    lines
        .into_iter()
        .map(|line| match kind {
            PartyKind::Customer => line.debit - line.credit,
            PartyKind::Supplier => line.credit - line.debit,
        })
        .sum()
}

/// Picks the figure to report as owed.
#[must_use]
pub fn reconcile_outstanding(column: Decimal, derived: Decimal) -> Decimal {
    if column > Decimal::ZERO {
        column
    } else {
        derived.max(Decimal::ZERO)
    }
}
