//! Outstanding balances for the unpaid views.
//!
//! What a party owes is read from two places: the balance column kept by
//! receipts and a figure derived from documents or the ledger. The column is
//! trusted while positive; otherwise the derived figure is used, floored at
//! zero.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::sea_query::{Alias, Expr, Order, Query};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;

use branchledger_core::money::from_minor;
use branchledger_core::reconcile::{derived_from_documents, derived_from_ledger, reconcile_outstanding};
use branchledger_core::{BillingPeriod, PartyKind};
use branchledger_shared::types::BranchScope;
use branchledger_shared::ErrorKind;

use crate::entities::{customer_receipts, purchases, sales, supplier_receipts};
use crate::error::impl_app_error;
use crate::ledger::ledger_lines_by_party;
use crate::schema::{SchemaError, SchemaRegistry};

/// Error types for outstanding balance reads.
#[derive(Debug, thiserror::Error)]
pub enum OutstandingError {
    /// Balance column could not be resolved.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl OutstandingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Schema(e) => e.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the coarse kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Internal
    }
}

impl_app_error!(OutstandingError);

/// A party that owes, or is owed, money.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnpaidParty {
    /// Customer or supplier id.
    pub party_id: i32,
    /// Owning branch.
    pub branch_id: i32,
    /// Display name.
    pub name: String,
    /// Value of the balance column.
    pub column_balance: Decimal,
    /// Figure derived from documents or the ledger.
    pub derived_balance: Decimal,
    /// Reported amount, always positive.
    pub outstanding: Decimal,
}

/// A purchase not yet fully paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutstandingPurchase {
    /// The purchase.
    pub purchase: purchases::Model,
    /// Total minus paid.
    pub unpaid: Decimal,
}

struct PartyRow {
    id: i32,
    branch_id: i32,
    name: String,
    balance: Decimal,
}

/// Outstanding balance repository.
#[derive(Debug, Clone)]
pub struct OutstandingRepository {
    db: DatabaseConnection,
    registry: Arc<SchemaRegistry>,
}

impl OutstandingRepository {
    /// Creates a new outstanding balance repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, registry: Arc<SchemaRegistry>) -> Self {
        Self { db, registry }
    }

    /// Customers that still owe money.
    pub async fn unpaid_customers(
        &self,
        scope: &BranchScope,
        month: Option<BillingPeriod>,
    ) -> Result<Vec<UnpaidParty>, OutstandingError> {
        self.unpaid(scope, PartyKind::Customer, month).await
    }

    /// Suppliers the business still owes.
    pub async fn unpaid_suppliers(
        &self,
        scope: &BranchScope,
        month: Option<BillingPeriod>,
    ) -> Result<Vec<UnpaidParty>, OutstandingError> {
        self.unpaid(scope, PartyKind::Supplier, month).await
    }

    /// Purchases with `total - paid > 0`, oldest first.
    pub async fn outstanding_purchases(
        &self,
        scope: &BranchScope,
        supplier_id: Option<i32>,
    ) -> Result<Vec<OutstandingPurchase>, OutstandingError> {
        let mut query = purchases::Entity::find().filter(
            Expr::col(purchases::Column::TotalMinor).gt(Expr::col(purchases::Column::PaidMinor)),
        );
        if let Some(branches) = scope.visible_branches() {
            query = query.filter(purchases::Column::BranchId.is_in(branches));
        }
        if let Some(supplier_id) = supplier_id {
            query = query.filter(purchases::Column::SupplierId.eq(supplier_id));
        }
        let rows = query
            .order_by_asc(purchases::Column::PurchaseDate)
            .order_by_asc(purchases::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|purchase| OutstandingPurchase {
                unpaid: purchase.unpaid(),
                purchase,
            })
            .collect())
    }

    async fn unpaid(
        &self,
        scope: &BranchScope,
        kind: PartyKind,
        month: Option<BillingPeriod>,
    ) -> Result<Vec<UnpaidParty>, OutstandingError> {
        let parties = self.parties(scope, kind).await?;
        let derived = match month {
            None => self.derived_from_documents(scope, kind).await?,
            Some(period) => {
                let window = Some((period.first_day(), period.last_day()));
                let ids = parties.iter().map(|p| p.id).collect();
                ledger_lines_by_party(&self.db, kind, ids, window)
                    .await?
                    .into_iter()
                    .map(|(party_id, lines)| (party_id, derived_from_ledger(kind, lines)))
                    .collect()
            }
        };

        let unpaid: Vec<UnpaidParty> = parties
            .into_iter()
            .filter_map(|party| {
                let derived_balance = derived.get(&party.id).copied().unwrap_or_default();
                let outstanding = reconcile_outstanding(party.balance, derived_balance);
                (outstanding > Decimal::ZERO).then(|| UnpaidParty {
                    party_id: party.id,
                    branch_id: party.branch_id,
                    name: party.name,
                    column_balance: party.balance,
                    derived_balance,
                    outstanding,
                })
            })
            .collect();

        tracing::debug!(%kind, count = unpaid.len(), monthly = month.is_some(), "unpaid parties computed");
        Ok(unpaid)
    }

    async fn parties(
        &self,
        scope: &BranchScope,
        kind: PartyKind,
    ) -> Result<Vec<PartyRow>, OutstandingError> {
        let column = self.registry.balance_column(&self.db, kind).await?;
        let mut select = Query::select();
        select
            .column(Alias::new("id"))
            .column(Alias::new("branch_id"))
            .column(Alias::new("name"))
            .expr_as(Expr::col(Alias::new(column.as_str())), Alias::new("balance"))
            .from(Alias::new(kind.table()))
            .order_by(Alias::new("id"), Order::Asc);
        if let Some(branches) = scope.visible_branches() {
            select.and_where(Expr::col(Alias::new("branch_id")).is_in(branches));
        }

        let backend = self.db.get_database_backend();
        let rows = self.db.query_all(backend.build(&select)).await?;
        rows.iter()
            .map(|row| {
                Ok::<_, OutstandingError>(PartyRow {
                    id: row.try_get("", "id")?,
                    branch_id: row.try_get("", "branch_id")?,
                    name: row.try_get("", "name")?,
                    balance: from_minor(row.try_get::<Option<i64>>("", "balance")?.unwrap_or_default()),
                })
            })
            .collect()
    }

    /// Unpaid document amounts minus receipts, per party.
    async fn derived_from_documents(
        &self,
        scope: &BranchScope,
        kind: PartyKind,
    ) -> Result<HashMap<i32, Decimal>, OutstandingError> {
        let visible = scope.visible_branches();
        let mut documents: HashMap<i32, Vec<(Decimal, Decimal)>> = HashMap::new();
        let mut receipts: HashMap<i32, Vec<Decimal>> = HashMap::new();

        match kind {
            PartyKind::Customer => {
                let mut query = sales::Entity::find().filter(sales::Column::CustomerId.is_not_null());
                let mut receipt_query = customer_receipts::Entity::find()
                    .filter(customer_receipts::Column::CustomerId.is_not_null());
                if let Some(branches) = visible {
                    query = query.filter(sales::Column::BranchId.is_in(branches.clone()));
                    receipt_query =
                        receipt_query.filter(customer_receipts::Column::BranchId.is_in(branches));
                }
                for sale in query.all(&self.db).await? {
                    if let Some(id) = sale.customer_id {
                        documents.entry(id).or_default().push((sale.total(), sale.paid()));
                    }
                }
                for receipt in receipt_query.all(&self.db).await? {
                    if let Some(id) = receipt.customer_id {
                        receipts.entry(id).or_default().push(receipt.amount());
                    }
                }
            }
            PartyKind::Supplier => {
                let mut query =
                    purchases::Entity::find().filter(purchases::Column::SupplierId.is_not_null());
                let mut receipt_query = supplier_receipts::Entity::find()
                    .filter(supplier_receipts::Column::SupplierId.is_not_null());
                if let Some(branches) = visible {
                    query = query.filter(purchases::Column::BranchId.is_in(branches.clone()));
                    receipt_query =
                        receipt_query.filter(supplier_receipts::Column::BranchId.is_in(branches));
                }
                for purchase in query.all(&self.db).await? {
                    if let Some(id) = purchase.supplier_id {
                        documents
                            .entry(id)
                            .or_default()
                            .push((purchase.total(), purchase.paid()));
                    }
                }
                for receipt in receipt_query.all(&self.db).await? {
                    if let Some(id) = receipt.supplier_id {
                        receipts.entry(id).or_default().push(receipt.amount());
                    }
                }
            }
        }

        let mut derived: HashMap<i32, Decimal> = documents
            .into_iter()
            .map(|(id, docs)| {
                let received = receipts.remove(&id).unwrap_or_default();
                (id, derived_from_documents(docs, received))
            })
            .collect();
        for (id, received) in receipts {
            derived.insert(id, derived_from_documents(Vec::new(), received));
        }
        Ok(derived)
    }
}
