//! `SeaORM` Entity for expenses table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub branch_id: i32,
    pub name: String,
    pub created_by: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::expense_charges::Entity")]
    ExpenseCharges,
    #[sea_orm(has_many = "super::expense_budgets::Entity")]
    ExpenseBudgets,
}

impl Related<super::expense_charges::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseCharges.def()
    }
}

impl Related<super::expense_budgets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseBudgets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
