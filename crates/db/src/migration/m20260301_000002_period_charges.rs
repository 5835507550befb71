//! Expense and payroll tables.
//!
//! The unique indexes here are what keeps a retried period charge from
//! writing a second row: one budget charge per (budget, year, month), one
//! payroll run per (branch, charge date), one line per (run, employee).

use sea_orm_migration::prelude::*;

use super::m20260301_000001_initial::{money, pk, Accounts};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============================================================
        // PART 1: EXPENSES
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(pk(Expenses::Id))
                    .col(ColumnDef::new(Expenses::BranchId).integer().not_null())
                    .col(ColumnDef::new(Expenses::Name).string().not_null())
                    .col(ColumnDef::new(Expenses::CreatedBy).integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExpenseBudgets::Table)
                    .if_not_exists()
                    .col(pk(ExpenseBudgets::Id))
                    .col(ColumnDef::new(ExpenseBudgets::BranchId).integer().not_null())
                    .col(ColumnDef::new(ExpenseBudgets::ExpenseId).integer().not_null())
                    .col(ColumnDef::new(ExpenseBudgets::Name).string().not_null())
                    .col(money(ExpenseBudgets::FixedAmountMinor))
                    .col(ColumnDef::new(ExpenseBudgets::CreatedBy).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_budgets-expense_id")
                            .from(ExpenseBudgets::Table, ExpenseBudgets::ExpenseId)
                            .to(Expenses::Table, Expenses::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExpenseCharges::Table)
                    .if_not_exists()
                    .col(pk(ExpenseCharges::Id))
                    .col(ColumnDef::new(ExpenseCharges::BranchId).integer().not_null())
                    .col(ColumnDef::new(ExpenseCharges::ExpenseId).integer().not_null())
                    .col(ColumnDef::new(ExpenseCharges::BudgetId).integer())
                    .col(ColumnDef::new(ExpenseCharges::PeriodYear).integer())
                    .col(ColumnDef::new(ExpenseCharges::PeriodMonth).integer())
                    .col(money(ExpenseCharges::AmountMinor))
                    .col(ColumnDef::new(ExpenseCharges::ChargeDate).date().not_null())
                    .col(ColumnDef::new(ExpenseCharges::Note).text())
                    .col(ColumnDef::new(ExpenseCharges::CreatedBy).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_charges-expense_id")
                            .from(ExpenseCharges::Table, ExpenseCharges::ExpenseId)
                            .to(Expenses::Table, Expenses::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_charges-budget_id")
                            .from(ExpenseCharges::Table, ExpenseCharges::BudgetId)
                            .to(ExpenseBudgets::Table, ExpenseBudgets::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq-expense_charges-budget_period")
                    .table(ExpenseCharges::Table)
                    .col(ExpenseCharges::BudgetId)
                    .col(ExpenseCharges::PeriodYear)
                    .col(ExpenseCharges::PeriodMonth)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExpensePayments::Table)
                    .if_not_exists()
                    .col(pk(ExpensePayments::Id))
                    .col(ColumnDef::new(ExpensePayments::BranchId).integer().not_null())
                    .col(ColumnDef::new(ExpensePayments::ChargeId).integer().not_null())
                    .col(ColumnDef::new(ExpensePayments::AccountId).integer().not_null())
                    .col(money(ExpensePayments::AmountPaidMinor))
                    .col(ColumnDef::new(ExpensePayments::PaymentDate).date().not_null())
                    .col(ColumnDef::new(ExpensePayments::CreatedBy).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_payments-charge_id")
                            .from(ExpensePayments::Table, ExpensePayments::ChargeId)
                            .to(ExpenseCharges::Table, ExpenseCharges::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_payments-account_id")
                            .from(ExpensePayments::Table, ExpensePayments::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 2: PAYROLL
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Employees::Table)
                    .if_not_exists()
                    .col(pk(Employees::Id))
                    .col(ColumnDef::new(Employees::BranchId).integer().not_null())
                    .col(ColumnDef::new(Employees::Name).string().not_null())
                    .col(money(Employees::NetSalaryMinor))
                    .col(
                        ColumnDef::new(Employees::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PayrollRuns::Table)
                    .if_not_exists()
                    .col(pk(PayrollRuns::Id))
                    .col(ColumnDef::new(PayrollRuns::BranchId).integer().not_null())
                    .col(ColumnDef::new(PayrollRuns::ChargeDate).date().not_null())
                    .col(ColumnDef::new(PayrollRuns::PeriodYear).integer().not_null())
                    .col(ColumnDef::new(PayrollRuns::PeriodMonth).integer().not_null())
                    .col(
                        ColumnDef::new(PayrollRuns::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(PayrollRuns::CreatedBy).integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq-payroll_runs-branch_date")
                    .table(PayrollRuns::Table)
                    .col(PayrollRuns::BranchId)
                    .col(PayrollRuns::ChargeDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PayrollLines::Table)
                    .if_not_exists()
                    .col(pk(PayrollLines::Id))
                    .col(ColumnDef::new(PayrollLines::RunId).integer().not_null())
                    .col(ColumnDef::new(PayrollLines::EmployeeId).integer().not_null())
                    .col(money(PayrollLines::NetSalaryMinor))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payroll_lines-run_id")
                            .from(PayrollLines::Table, PayrollLines::RunId)
                            .to(PayrollRuns::Table, PayrollRuns::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payroll_lines-employee_id")
                            .from(PayrollLines::Table, PayrollLines::EmployeeId)
                            .to(Employees::Table, Employees::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq-payroll_lines-run_employee")
                    .table(PayrollLines::Table)
                    .col(PayrollLines::RunId)
                    .col(PayrollLines::EmployeeId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EmployeePayments::Table)
                    .if_not_exists()
                    .col(pk(EmployeePayments::Id))
                    .col(ColumnDef::new(EmployeePayments::LineId).integer().not_null())
                    .col(ColumnDef::new(EmployeePayments::AccountId).integer().not_null())
                    .col(money(EmployeePayments::AmountPaidMinor))
                    .col(ColumnDef::new(EmployeePayments::PaymentDate).date().not_null())
                    .col(ColumnDef::new(EmployeePayments::CreatedBy).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-employee_payments-line_id")
                            .from(EmployeePayments::Table, EmployeePayments::LineId)
                            .to(PayrollLines::Table, PayrollLines::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-employee_payments-account_id")
                            .from(EmployeePayments::Table, EmployeePayments::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            EmployeePayments::Table.into_iden(),
            PayrollLines::Table.into_iden(),
            PayrollRuns::Table.into_iden(),
            Employees::Table.into_iden(),
            ExpensePayments::Table.into_iden(),
            ExpenseCharges::Table.into_iden(),
            ExpenseBudgets::Table.into_iden(),
            Expenses::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    BranchId,
    Name,
    CreatedBy,
}

#[derive(Iden)]
enum ExpenseBudgets {
    Table,
    Id,
    BranchId,
    ExpenseId,
    Name,
    FixedAmountMinor,
    CreatedBy,
}

#[derive(Iden)]
enum ExpenseCharges {
    Table,
    Id,
    BranchId,
    ExpenseId,
    BudgetId,
    PeriodYear,
    PeriodMonth,
    AmountMinor,
    ChargeDate,
    Note,
    CreatedBy,
}

#[derive(Iden)]
enum ExpensePayments {
    Table,
    Id,
    BranchId,
    ChargeId,
    AccountId,
    AmountPaidMinor,
    PaymentDate,
    CreatedBy,
}

#[derive(Iden)]
enum Employees {
    Table,
    Id,
    BranchId,
    Name,
    NetSalaryMinor,
    IsActive,
}

#[derive(Iden)]
enum PayrollRuns {
    Table,
    Id,
    BranchId,
    ChargeDate,
    PeriodYear,
    PeriodMonth,
    Status,
    CreatedBy,
}

#[derive(Iden)]
enum PayrollLines {
    Table,
    Id,
    RunId,
    EmployeeId,
    NetSalaryMinor,
}

#[derive(Iden)]
enum EmployeePayments {
    Table,
    Id,
    LineId,
    AccountId,
    AmountPaidMinor,
    PaymentDate,
    CreatedBy,
}
