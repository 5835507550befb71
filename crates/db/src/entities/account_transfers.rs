//! `SeaORM` Entity for account_transfers table.

use branchledger_core::money::from_minor;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::TransferStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "account_transfers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub branch_id: i32,
    pub from_account_id: i32,
    pub to_account_id: i32,
    pub amount_minor: i64,
    pub transfer_date: Date,
    pub status: TransferStatus,
    pub note: Option<String>,
    pub created_by: i32,
    pub updated_by: Option<i32>,
}

impl Model {
    /// Amount moved.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        from_minor(self.amount_minor)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
