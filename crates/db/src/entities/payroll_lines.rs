//! `SeaORM` Entity for payroll_lines table.

use branchledger_core::money::from_minor;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payroll_lines")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub run_id: i32,
    pub employee_id: i32,
    pub net_salary_minor: i64,
}

impl Model {
    /// Net salary owed on this line.
    #[must_use]
    pub fn net_salary(&self) -> Decimal {
        from_minor(self.net_salary_minor)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::payroll_runs::Entity",
        from = "Column::RunId",
        to = "super::payroll_runs::Column::Id"
    )]
    PayrollRuns,
    #[sea_orm(has_many = "super::employee_payments::Entity")]
    EmployeePayments,
}

impl Related<super::payroll_runs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PayrollRuns.def()
    }
}

impl Related<super::employee_payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EmployeePayments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
