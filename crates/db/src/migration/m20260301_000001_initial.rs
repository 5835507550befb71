//! Initial database migration.
//!
//! Creates accounts, counterparties with their ledgers and receipts, and the
//! sales/purchase documents the outstanding views read from.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

pub(super) fn pk<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

pub(super) fn money<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col).big_integer().not_null().default(0).to_owned()
}

pub(super) fn created_at<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============================================================
        // PART 1: ACCOUNTS
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(pk(Accounts::Id))
                    .col(ColumnDef::new(Accounts::BranchId).integer().not_null())
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(money(Accounts::BalanceMinor))
                    .col(ColumnDef::new(Accounts::CreatedBy).integer().not_null())
                    .col(created_at(Accounts::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AccountTransactions::Table)
                    .if_not_exists()
                    .col(pk(AccountTransactions::Id))
                    .col(ColumnDef::new(AccountTransactions::BranchId).integer().not_null())
                    .col(ColumnDef::new(AccountTransactions::AccountId).integer().not_null())
                    .col(ColumnDef::new(AccountTransactions::Kind).string_len(32).not_null())
                    .col(money(AccountTransactions::AmountMinor))
                    .col(money(AccountTransactions::BalanceAfterMinor))
                    .col(
                        ColumnDef::new(AccountTransactions::ReferenceType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(AccountTransactions::ReferenceId).integer())
                    .col(ColumnDef::new(AccountTransactions::EntryDate).date().not_null())
                    .col(ColumnDef::new(AccountTransactions::CreatedBy).integer().not_null())
                    .col(created_at(AccountTransactions::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-account_transactions-account_id")
                            .from(AccountTransactions::Table, AccountTransactions::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-account_transactions-account_id")
                    .table(AccountTransactions::Table)
                    .col(AccountTransactions::AccountId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AccountTransfers::Table)
                    .if_not_exists()
                    .col(pk(AccountTransfers::Id))
                    .col(ColumnDef::new(AccountTransfers::BranchId).integer().not_null())
                    .col(ColumnDef::new(AccountTransfers::FromAccountId).integer().not_null())
                    .col(ColumnDef::new(AccountTransfers::ToAccountId).integer().not_null())
                    .col(money(AccountTransfers::AmountMinor))
                    .col(ColumnDef::new(AccountTransfers::TransferDate).date().not_null())
                    .col(
                        ColumnDef::new(AccountTransfers::Status)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(AccountTransfers::Note).text())
                    .col(ColumnDef::new(AccountTransfers::CreatedBy).integer().not_null())
                    .col(ColumnDef::new(AccountTransfers::UpdatedBy).integer())
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 2: COUNTERPARTIES
        // ============================================================
        for table in [Party::Customers, Party::Suppliers] {
            manager
                .create_table(
                    Table::create()
                        .table(table)
                        .if_not_exists()
                        .col(pk(Party::Id))
                        .col(ColumnDef::new(Party::BranchId).integer().not_null())
                        .col(ColumnDef::new(Party::Name).string().not_null())
                        .col(money(Party::RemainingBalance))
                        .col(created_at(Party::CreatedAt))
                        .to_owned(),
                )
                .await?;
        }

        for (table, party) in [
            (PartyLedger::CustomerLedger, PartyLedger::CustomerId),
            (PartyLedger::SupplierLedger, PartyLedger::SupplierId),
        ] {
            manager
                .create_table(
                    Table::create()
                        .table(table)
                        .if_not_exists()
                        .col(pk(PartyLedger::Id))
                        .col(ColumnDef::new(PartyLedger::BranchId).integer().not_null())
                        .col(ColumnDef::new(party).integer().not_null())
                        .col(money(PartyLedger::DebitMinor))
                        .col(money(PartyLedger::CreditMinor))
                        .col(ColumnDef::new(PartyLedger::ReferenceType).string_len(32).not_null())
                        .col(ColumnDef::new(PartyLedger::ReferenceId).integer())
                        .col(ColumnDef::new(PartyLedger::EntryDate).date().not_null())
                        .col(ColumnDef::new(PartyLedger::Note).text())
                        .col(ColumnDef::new(PartyLedger::CreatedBy).integer().not_null())
                        .col(created_at(PartyLedger::CreatedAt))
                        .to_owned(),
                )
                .await?;
        }

        for (table, party) in [
            (PartyReceipts::CustomerReceipts, PartyReceipts::CustomerId),
            (PartyReceipts::SupplierReceipts, PartyReceipts::SupplierId),
        ] {
            manager
                .create_table(
                    Table::create()
                        .table(table)
                        .if_not_exists()
                        .col(pk(PartyReceipts::Id))
                        .col(ColumnDef::new(PartyReceipts::BranchId).integer().not_null())
                        .col(ColumnDef::new(party).integer())
                        .col(ColumnDef::new(PartyReceipts::AccountId).integer().not_null())
                        .col(money(PartyReceipts::AmountMinor))
                        .col(ColumnDef::new(PartyReceipts::ReceiptDate).date().not_null())
                        .col(ColumnDef::new(PartyReceipts::Note).text())
                        .col(ColumnDef::new(PartyReceipts::CreatedBy).integer().not_null())
                        .col(ColumnDef::new(PartyReceipts::UpdatedBy).integer())
                        .to_owned(),
                )
                .await?;
        }

        // ============================================================
        // PART 3: SALES & PURCHASES
        // ============================================================
        for (table, party, date) in [
            (Documents::Sales, Documents::CustomerId, Documents::SaleDate),
            (Documents::Purchases, Documents::SupplierId, Documents::PurchaseDate),
        ] {
            manager
                .create_table(
                    Table::create()
                        .table(table)
                        .if_not_exists()
                        .col(pk(Documents::Id))
                        .col(ColumnDef::new(Documents::BranchId).integer().not_null())
                        .col(ColumnDef::new(party).integer())
                        .col(ColumnDef::new(Documents::Reference).string())
                        .col(money(Documents::TotalMinor))
                        .col(money(Documents::PaidMinor))
                        .col(ColumnDef::new(date).date().not_null())
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Documents::Purchases.into_iden(),
            Documents::Sales.into_iden(),
            PartyReceipts::SupplierReceipts.into_iden(),
            PartyReceipts::CustomerReceipts.into_iden(),
            PartyLedger::SupplierLedger.into_iden(),
            PartyLedger::CustomerLedger.into_iden(),
            Party::Suppliers.into_iden(),
            Party::Customers.into_iden(),
            AccountTransfers::Table.into_iden(),
            AccountTransactions::Table.into_iden(),
            Accounts::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(Iden)]
pub(super) enum Accounts {
    Table,
    Id,
    BranchId,
    Name,
    BalanceMinor,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum AccountTransactions {
    Table,
    Id,
    BranchId,
    AccountId,
    Kind,
    AmountMinor,
    BalanceAfterMinor,
    ReferenceType,
    ReferenceId,
    EntryDate,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum AccountTransfers {
    Table,
    Id,
    BranchId,
    FromAccountId,
    ToAccountId,
    AmountMinor,
    TransferDate,
    Status,
    Note,
    CreatedBy,
    UpdatedBy,
}

#[derive(Iden, Clone, Copy)]
enum Party {
    Customers,
    Suppliers,
    Id,
    BranchId,
    Name,
    RemainingBalance,
    CreatedAt,
}

#[derive(Iden, Clone, Copy)]
enum PartyLedger {
    CustomerLedger,
    SupplierLedger,
    Id,
    BranchId,
    CustomerId,
    SupplierId,
    DebitMinor,
    CreditMinor,
    ReferenceType,
    ReferenceId,
    EntryDate,
    Note,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden, Clone, Copy)]
enum PartyReceipts {
    CustomerReceipts,
    SupplierReceipts,
    Id,
    BranchId,
    CustomerId,
    SupplierId,
    AccountId,
    AmountMinor,
    ReceiptDate,
    Note,
    CreatedBy,
    UpdatedBy,
}

#[derive(Iden, Clone, Copy)]
enum Documents {
    Sales,
    Purchases,
    Id,
    BranchId,
    CustomerId,
    SupplierId,
    Reference,
    TotalMinor,
    PaidMinor,
    SaleDate,
    PurchaseDate,
}
