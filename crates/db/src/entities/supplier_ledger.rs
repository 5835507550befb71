//! `SeaORM` Entity for supplier_ledger table.
//!
//! Append-only. Reversals add a row with debit and credit swapped.

use branchledger_core::money::from_minor;
use branchledger_core::LedgerLine;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "supplier_ledger")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub branch_id: i32,
    pub supplier_id: i32,
    pub debit_minor: i64,
    pub credit_minor: i64,
    pub reference_type: String,
    pub reference_id: Option<i32>,
    pub entry_date: Date,
    pub note: Option<String>,
    pub created_by: i32,
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Debit/credit pair of this row.
    #[must_use]
    pub fn line(&self) -> LedgerLine {
        LedgerLine {
            debit: from_minor(self.debit_minor),
            credit: from_minor(self.credit_minor),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
