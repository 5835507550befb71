//! Repository abstractions for data access.
//!
//! Each repository owns one business area. Writes check the caller before a
//! transaction opens and run every posting inside one [`crate::MutationScope`].

pub mod account;
pub mod expense;
pub mod outstanding;
pub mod payroll;
pub mod receipt;
pub mod transfer;

pub use account::{AccountError, AccountRepository, CreateAccountInput};
pub use expense::{
    ChargeFilter, ChargeSummary, CreateBudgetInput, CreateChargeInput, CreateExpenseInput,
    CreatePaymentInput, ExpenseError, ExpenseRepository, UpdateBudgetInput, UpdateChargeInput,
    UpdatePaymentInput,
};
pub use outstanding::{OutstandingError, OutstandingPurchase, OutstandingRepository, UnpaidParty};
pub use payroll::{
    ChargeMode, ChargePayrollInput, PaySalaryInput, PayrollError, PayrollFilter, PayrollLineView,
    PayrollRepository, PayrollRunView,
};
pub use receipt::{
    CreateReceiptInput, Receipt, ReceiptError, ReceiptFilter, ReceiptRepository,
    UpdateReceiptInput,
};
pub use transfer::{
    CreateTransferInput, TransferError, TransferFilter, TransferRepository, UpdateTransferInput,
};
