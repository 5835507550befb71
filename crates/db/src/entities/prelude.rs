//! Entity prelude.

pub use super::account_transactions::Entity as AccountTransactions;
pub use super::account_transfers::Entity as AccountTransfers;
pub use super::accounts::Entity as Accounts;
pub use super::customer_ledger::Entity as CustomerLedger;
pub use super::customer_receipts::Entity as CustomerReceipts;
pub use super::customers::Entity as Customers;
pub use super::employee_payments::Entity as EmployeePayments;
pub use super::employees::Entity as Employees;
pub use super::expense_budgets::Entity as ExpenseBudgets;
pub use super::expense_charges::Entity as ExpenseCharges;
pub use super::expense_payments::Entity as ExpensePayments;
pub use super::expenses::Entity as Expenses;
pub use super::payroll_lines::Entity as PayrollLines;
pub use super::payroll_runs::Entity as PayrollRuns;
pub use super::purchases::Entity as Purchases;
pub use super::sales::Entity as Sales;
pub use super::supplier_ledger::Entity as SupplierLedger;
pub use super::supplier_receipts::Entity as SupplierReceipts;
pub use super::suppliers::Entity as Suppliers;
