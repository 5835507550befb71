//! `SeaORM` Entity for employee_payments table.

use branchledger_core::money::from_minor;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "employee_payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub line_id: i32,
    pub account_id: i32,
    pub amount_paid_minor: i64,
    pub payment_date: Date,
    pub created_by: i32,
}

impl Model {
    /// Amount paid.
    #[must_use]
    pub fn amount_paid(&self) -> Decimal {
        from_minor(self.amount_paid_minor)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::payroll_lines::Entity",
        from = "Column::LineId",
        to = "super::payroll_lines::Column::Id"
    )]
    PayrollLines,
}

impl Related<super::payroll_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PayrollLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
