//! `SeaORM` Entity for payroll_runs table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::PayrollStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payroll_runs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub branch_id: i32,
    pub charge_date: Date,
    pub period_year: i32,
    pub period_month: i32,
    pub status: PayrollStatus,
    pub created_by: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::payroll_lines::Entity")]
    PayrollLines,
}

impl Related<super::payroll_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PayrollLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
