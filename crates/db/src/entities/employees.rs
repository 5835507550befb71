//! `SeaORM` Entity for employees table.
//!
//! Active employees are the salary templates payroll charges from.

use branchledger_core::money::from_minor;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub branch_id: i32,
    pub name: String,
    pub net_salary_minor: i64,
    pub is_active: bool,
}

impl Model {
    /// Monthly net salary.
    #[must_use]
    pub fn net_salary(&self) -> Decimal {
        from_minor(self.net_salary_minor)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
