//! Free-text note on account transactions.
//!
//! Admin adjustments record their reason here.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(AccountTransactions::Table)
                    .add_column(ColumnDef::new(AccountTransactions::Note).text().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(AccountTransactions::Table)
                    .drop_column(AccountTransactions::Note)
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
enum AccountTransactions {
    Table,
    Note,
}
