//! `SeaORM` Entity for sales table.
//!
//! Written by the sales/purchasing modules; read here to derive what a party
//! owes.

use branchledger_core::money::from_minor;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub branch_id: i32,
    pub customer_id: Option<i32>,
    pub reference: Option<String>,
    pub total_minor: i64,
    pub paid_minor: i64,
    pub sale_date: Date,
}

impl Model {
    /// Document total.
    #[must_use]
    pub fn total(&self) -> Decimal {
        from_minor(self.total_minor)
    }

    /// Amount settled on the document itself.
    #[must_use]
    pub fn paid(&self) -> Decimal {
        from_minor(self.paid_minor)
    }

    /// Total minus paid.
    #[must_use]
    pub fn unpaid(&self) -> Decimal {
        self.total() - self.paid()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
