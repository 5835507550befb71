//! `SeaORM` Entity for expense_charges table.
//!
//! Budget charges carry `budget_id` with the billing period; the unique index
//! on those three columns backs the one-charge-per-period rule.

use branchledger_core::money::from_minor;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expense_charges")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub branch_id: i32,
    pub expense_id: i32,
    pub budget_id: Option<i32>,
    pub period_year: Option<i32>,
    pub period_month: Option<i32>,
    pub amount_minor: i64,
    pub charge_date: Date,
    pub note: Option<String>,
    pub created_by: i32,
}

impl Model {
    /// Charged amount.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        from_minor(self.amount_minor)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id"
    )]
    Expenses,
    #[sea_orm(has_many = "super::expense_payments::Entity")]
    ExpensePayments,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl Related<super::expense_payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpensePayments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
