//! `SeaORM` Entity for account_transactions table.
//!
//! Append-only: every balance change on an account writes one row, and
//! reversals write a compensating row instead of deleting.

use branchledger_core::money::from_minor;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "account_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub branch_id: i32,
    pub account_id: i32,
    pub kind: String,
    pub amount_minor: i64,
    pub balance_after_minor: i64,
    pub reference_type: String,
    pub reference_id: Option<i32>,
    pub entry_date: Date,
    pub created_by: i32,
    pub created_at: DateTimeUtc,
    pub note: Option<String>,
}

impl Model {
    /// Signed change applied to the account.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        from_minor(self.amount_minor)
    }

    /// Account balance right after this row.
    #[must_use]
    pub fn balance_after(&self) -> Decimal {
        from_minor(self.balance_after_minor)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
