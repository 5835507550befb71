//! `SeaORM` Entity for customer_receipts table.

use branchledger_core::money::from_minor;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customer_receipts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub branch_id: i32,
    pub customer_id: Option<i32>,
    pub account_id: i32,
    pub amount_minor: i64,
    pub receipt_date: Date,
    pub note: Option<String>,
    pub created_by: i32,
    pub updated_by: Option<i32>,
}

impl Model {
    /// Receipt amount.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        from_minor(self.amount_minor)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
