//! `SeaORM` entity definitions.
//!
//! Money columns hold integer minor units (`*_minor`); every model exposes
//! `Decimal` accessors for them. The customer and supplier tables have no
//! balance field here because the column name differs between schema
//! generations; see [`crate::schema`].

pub mod prelude;

pub mod account_transactions;
pub mod account_transfers;
pub mod accounts;
pub mod customer_ledger;
pub mod customer_receipts;
pub mod customers;
pub mod employee_payments;
pub mod employees;
pub mod expense_budgets;
pub mod expense_charges;
pub mod expense_payments;
pub mod expenses;
pub mod payroll_lines;
pub mod payroll_runs;
pub mod purchases;
pub mod sales;
pub mod sea_orm_active_enums;
pub mod supplier_ledger;
pub mod supplier_receipts;
pub mod suppliers;
