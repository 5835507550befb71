//! Expense repository for expenses, charges, budgets and payments.
//!
//! An expense is a category. Charges are what the branch owes against it,
//! either entered by hand or produced from a budget once per billing period.
//! Payments settle charges and are the only part that moves money.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;

use branchledger_core::access::{ensure_branch, require_actor, resolve_write_branch};
use branchledger_core::balance::ensure_positive;
use branchledger_core::charge::{
    charge_remaining, resolve_payment_amount, validate_charge_amount, validate_charge_date,
};
use branchledger_core::money::{from_minor, to_minor};
use branchledger_core::{AccessError, AccountLeg, BillingPeriod, PostingError};
use branchledger_shared::types::{BranchId, BranchScope, Deleted, FieldUpdate, UserId};
use branchledger_shared::ErrorKind;

use crate::balance::{apply_account_leg, find_account_in_branch, BalanceError, PostingContext};
use crate::coordinator::MutationScope;
use crate::entities::{expense_budgets, expense_charges, expense_payments, expenses};
use crate::error::{impl_app_error, is_unique_violation};

/// Error types for expense operations.
#[derive(Debug, thiserror::Error)]
pub enum ExpenseError {
    /// Expense not found.
    #[error("Expense not found: {0}")]
    ExpenseNotFound(i32),

    /// Charge not found.
    #[error("Expense charge not found: {0}")]
    ChargeNotFound(i32),

    /// Budget not found.
    #[error("Expense budget not found: {0}")]
    BudgetNotFound(i32),

    /// Payment not found.
    #[error("Expense payment not found: {0}")]
    PaymentNotFound(i32),

    /// Caller or branch check failed.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Posting rule violated.
    #[error(transparent)]
    Posting(#[from] PostingError),

    /// Balance change failed.
    #[error(transparent)]
    Balance(#[from] BalanceError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl ExpenseError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ExpenseNotFound(_) => "EXPENSE_NOT_FOUND",
            Self::ChargeNotFound(_) => "CHARGE_NOT_FOUND",
            Self::BudgetNotFound(_) => "BUDGET_NOT_FOUND",
            Self::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            Self::Access(e) => e.error_code(),
            Self::Posting(e) => e.error_code(),
            Self::Balance(e) => e.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the coarse kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ExpenseNotFound(_)
            | Self::ChargeNotFound(_)
            | Self::BudgetNotFound(_)
            | Self::PaymentNotFound(_) => ErrorKind::NotFound,
            Self::Access(e) => e.kind(),
            Self::Posting(e) => e.kind(),
            Self::Balance(e) => e.kind(),
            Self::Database(_) => ErrorKind::Internal,
        }
    }
}

impl_app_error!(ExpenseError);

// ============================================================================
// Inputs
// ============================================================================

/// Input for creating an expense.
#[derive(Debug, Clone)]
pub struct CreateExpenseInput {
    /// Target branch; the caller's primary branch when absent.
    pub branch_id: Option<BranchId>,
    /// Category name.
    pub name: String,
}

/// Input for creating a charge by hand.
#[derive(Debug, Clone)]
pub struct CreateChargeInput {
    /// Expense charged.
    pub expense_id: i32,
    /// Amount owed.
    pub amount: Decimal,
    /// Date the obligation arises.
    pub charge_date: NaiveDate,
    /// Free text.
    pub note: Option<String>,
}

/// Partial update of a charge.
#[derive(Debug, Clone, Default)]
pub struct UpdateChargeInput {
    /// New amount; may not drop below what is paid.
    pub amount: FieldUpdate<Decimal>,
    /// New date.
    pub charge_date: FieldUpdate<NaiveDate>,
    /// New note.
    pub note: FieldUpdate<Option<String>>,
}

/// Filter options for listing charges.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChargeFilter {
    /// Charges of this expense.
    pub expense_id: Option<i32>,
    /// Charges produced by this budget.
    pub budget_id: Option<i32>,
    /// Charges dated inside this period.
    pub period: Option<BillingPeriod>,
}

/// Input for creating a budget.
#[derive(Debug, Clone)]
pub struct CreateBudgetInput {
    /// Expense the budget charges; required.
    pub expense_id: Option<i32>,
    /// Display name.
    pub name: String,
    /// Amount charged each period.
    pub fixed_amount: Decimal,
}

/// Partial update of a budget.
#[derive(Debug, Clone, Default)]
pub struct UpdateBudgetInput {
    /// New name.
    pub name: FieldUpdate<String>,
    /// New amount for future charges.
    pub fixed_amount: FieldUpdate<Decimal>,
}

/// Input for paying a charge.
#[derive(Debug, Clone)]
pub struct CreatePaymentInput {
    /// Charge settled.
    pub charge_id: i32,
    /// Account the money leaves.
    pub account_id: i32,
    /// Amount; the charge's remaining amount when absent.
    pub amount: Option<Decimal>,
    /// Business date.
    pub payment_date: NaiveDate,
}

/// Partial update of a payment.
#[derive(Debug, Clone, Default)]
pub struct UpdatePaymentInput {
    /// New amount.
    pub amount: FieldUpdate<Decimal>,
    /// New paying account.
    pub account_id: FieldUpdate<i32>,
    /// New date.
    pub payment_date: FieldUpdate<NaiveDate>,
}

/// A charge with what has been paid against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChargeSummary {
    /// The charge.
    pub charge: expense_charges::Model,
    /// Sum of payments.
    pub paid: Decimal,
    /// Amount still owed.
    pub remaining: Decimal,
}

/// Expense repository.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    db: DatabaseConnection,
}

impl ExpenseRepository {
    /// Creates a new expense repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    // ========================================================================
    // Expenses
    // ========================================================================

    /// Creates an expense category.
    pub async fn create_expense(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        input: CreateExpenseInput,
    ) -> Result<expenses::Model, ExpenseError> {
        let actor = require_actor(actor)?;
        let branch = resolve_write_branch(scope, input.branch_id)?;
        let expense = expenses::ActiveModel {
            branch_id: Set(branch.0),
            name: Set(input.name),
            created_by: Set(actor.0),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        tracing::info!(expense_id = expense.id, branch_id = branch.0, "expense created");
        Ok(expense)
    }

    /// Gets an expense the caller may see.
    pub async fn get_expense(
        &self,
        scope: &BranchScope,
        expense_id: i32,
    ) -> Result<expenses::Model, ExpenseError> {
        let expense = expenses::Entity::find_by_id(expense_id)
            .one(&self.db)
            .await?
            .ok_or(ExpenseError::ExpenseNotFound(expense_id))?;
        ensure_branch(scope, BranchId(expense.branch_id))?;
        Ok(expense)
    }

    /// Lists expenses in the visible branches.
    pub async fn list_expenses(
        &self,
        scope: &BranchScope,
    ) -> Result<Vec<expenses::Model>, ExpenseError> {
        let mut query = expenses::Entity::find();
        if let Some(branches) = scope.visible_branches() {
            query = query.filter(expenses::Column::BranchId.is_in(branches));
        }
        Ok(query.order_by_asc(expenses::Column::Name).all(&self.db).await?)
    }

    /// Renames an expense.
    pub async fn update_expense(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        expense_id: i32,
        name: FieldUpdate<String>,
    ) -> Result<expenses::Model, ExpenseError> {
        require_actor(actor)?;
        let expense = self.get_expense(scope, expense_id).await?;
        let FieldUpdate::SetTo(name) = name else {
            return Ok(expense);
        };
        let mut active: expenses::ActiveModel = expense.into();
        active.name = Set(name);
        Ok(active.update(&self.db).await?)
    }

    /// Deletes an expense and its budgets; rejected while charges exist.
    pub async fn delete_expense(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        expense_id: i32,
    ) -> Result<Deleted, ExpenseError> {
        require_actor(actor)?;
        self.get_expense(scope, expense_id).await?;

        let mutation = MutationScope::begin(&self.db, "delete_expense").await?;
        let result = async {
            let txn = mutation.conn();
            let charges = expense_charges::Entity::find()
                .filter(expense_charges::Column::ExpenseId.eq(expense_id))
                .count(txn)
                .await?;
            if charges > 0 {
                return Err(PostingError::HasCharges {
                    entity: "Expense",
                    id: expense_id,
                }
                .into());
            }
            let budgets = expense_budgets::Entity::delete_many()
                .filter(expense_budgets::Column::ExpenseId.eq(expense_id))
                .exec(txn)
                .await?;
            let expense = expenses::Entity::delete_by_id(expense_id).exec(txn).await?;
            Ok::<_, ExpenseError>(budgets.rows_affected + expense.rows_affected)
        }
        .await;
        let deleted = mutation.finish(result).await?;

        tracing::info!(expense_id, deleted, "expense deleted");
        Ok(Deleted { deleted })
    }

    // ========================================================================
    // Charges
    // ========================================================================

    /// Records a charge against an expense.
    pub async fn create_charge(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        input: CreateChargeInput,
    ) -> Result<expense_charges::Model, ExpenseError> {
        let actor = require_actor(actor)?;
        let expense = self.get_expense(scope, input.expense_id).await?;
        let amount = ensure_positive(input.amount, "amount")?;
        let charge = expense_charges::ActiveModel {
            branch_id: Set(expense.branch_id),
            expense_id: Set(expense.id),
            amount_minor: Set(to_minor(amount)?),
            charge_date: Set(input.charge_date),
            note: Set(input.note),
            created_by: Set(actor.0),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        tracing::info!(
            charge_id = charge.id,
            expense_id = expense.id,
            amount = %amount,
            "expense charge created"
        );
        Ok(charge)
    }

    /// Gets a charge with its paid and remaining amounts.
    pub async fn get_charge(
        &self,
        scope: &BranchScope,
        charge_id: i32,
    ) -> Result<ChargeSummary, ExpenseError> {
        let charge = self.find_charge(scope, charge_id).await?;
        let paid = paid_on_charge(&self.db, charge_id, None).await?;
        Ok(summarize(charge, paid))
    }

    /// Lists charges in the visible branches with their paid amounts.
    pub async fn list_charges(
        &self,
        scope: &BranchScope,
        filter: ChargeFilter,
    ) -> Result<Vec<ChargeSummary>, ExpenseError> {
        let mut query = expense_charges::Entity::find();
        if let Some(branches) = scope.visible_branches() {
            query = query.filter(expense_charges::Column::BranchId.is_in(branches));
        }
        if let Some(expense_id) = filter.expense_id {
            query = query.filter(expense_charges::Column::ExpenseId.eq(expense_id));
        }
        if let Some(budget_id) = filter.budget_id {
            query = query.filter(expense_charges::Column::BudgetId.eq(budget_id));
        }
        if let Some(period) = filter.period {
            query = query.filter(
                expense_charges::Column::ChargeDate.between(period.first_day(), period.last_day()),
            );
        }
        let charges = query
            .order_by_desc(expense_charges::Column::ChargeDate)
            .order_by_desc(expense_charges::Column::Id)
            .all(&self.db)
            .await?;

        let ids: Vec<i32> = charges.iter().map(|c| c.id).collect();
        let mut paid: HashMap<i32, i64> = HashMap::new();
        for payment in expense_payments::Entity::find()
            .filter(expense_payments::Column::ChargeId.is_in(ids))
            .all(&self.db)
            .await?
        {
            *paid.entry(payment.charge_id).or_default() += payment.amount_paid_minor;
        }

        Ok(charges
            .into_iter()
            .map(|charge| {
                let paid = from_minor(paid.get(&charge.id).copied().unwrap_or_default());
                summarize(charge, paid)
            })
            .collect())
    }

    /// Updates a charge; the amount may not drop below what is paid and a
    /// budget charge keeps its date inside the charged period.
    pub async fn update_charge(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        charge_id: i32,
        input: UpdateChargeInput,
    ) -> Result<expense_charges::Model, ExpenseError> {
        require_actor(actor)?;
        self.find_charge(scope, charge_id).await?;

        let mutation = MutationScope::begin(&self.db, "update_charge").await?;
        let result = async {
            let txn = mutation.conn();
            let charge = lock_charge(txn, charge_id).await?;
            let amount = input.amount.apply(charge.amount());
            let paid = paid_on_charge(txn, charge_id, None).await?;
            validate_charge_amount(amount, paid)?;

            let charge_date = validate_charge_date(
                charge.period_year,
                charge.period_month,
                input.charge_date.apply(charge.charge_date),
            )?;
            let note = input.note.apply(charge.note.clone());
            let mut active: expense_charges::ActiveModel = charge.into();
            active.amount_minor = Set(to_minor(amount)?);
            active.charge_date = Set(charge_date);
            active.note = Set(note);
            Ok::<_, ExpenseError>(active.update(txn).await?)
        }
        .await;
        let charge = mutation.finish(result).await?;

        tracing::info!(charge_id, amount = %charge.amount(), "expense charge updated");
        Ok(charge)
    }

    /// Deletes a charge; rejected while any payment references it.
    pub async fn delete_charge(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        charge_id: i32,
    ) -> Result<Deleted, ExpenseError> {
        require_actor(actor)?;
        self.find_charge(scope, charge_id).await?;

        let mutation = MutationScope::begin(&self.db, "delete_charge").await?;
        let result = async {
            let txn = mutation.conn();
            lock_charge(txn, charge_id).await?;
            let payments = expense_payments::Entity::find()
                .filter(expense_payments::Column::ChargeId.eq(charge_id))
                .count(txn)
                .await?;
            if payments > 0 {
                return Err(PostingError::ChargeHasPayments(charge_id).into());
            }
            let deleted = expense_charges::Entity::delete_by_id(charge_id)
                .exec(txn)
                .await?;
            Ok::<_, ExpenseError>(deleted.rows_affected)
        }
        .await;
        let deleted = mutation.finish(result).await?;

        tracing::info!(charge_id, "expense charge deleted");
        Ok(Deleted { deleted })
    }

    // ========================================================================
    // Budgets
    // ========================================================================

    /// Creates a recurring budget for an expense.
    pub async fn create_budget(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        input: CreateBudgetInput,
    ) -> Result<expense_budgets::Model, ExpenseError> {
        let actor = require_actor(actor)?;
        let expense_id = input
            .expense_id
            .ok_or(PostingError::MissingAssociation("expense_id"))?;
        let fixed_amount = ensure_positive(input.fixed_amount, "fixed_amount")?;
        let expense = self.get_expense(scope, expense_id).await?;

        let budget = expense_budgets::ActiveModel {
            branch_id: Set(expense.branch_id),
            expense_id: Set(expense.id),
            name: Set(input.name),
            fixed_amount_minor: Set(to_minor(fixed_amount)?),
            created_by: Set(actor.0),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        tracing::info!(
            budget_id = budget.id,
            expense_id,
            fixed_amount = %fixed_amount,
            "expense budget created"
        );
        Ok(budget)
    }

    /// Gets a budget the caller may see.
    pub async fn get_budget(
        &self,
        scope: &BranchScope,
        budget_id: i32,
    ) -> Result<expense_budgets::Model, ExpenseError> {
        let budget = expense_budgets::Entity::find_by_id(budget_id)
            .one(&self.db)
            .await?
            .ok_or(ExpenseError::BudgetNotFound(budget_id))?;
        ensure_branch(scope, BranchId(budget.branch_id))?;
        Ok(budget)
    }

    /// Lists budgets in the visible branches.
    pub async fn list_budgets(
        &self,
        scope: &BranchScope,
        expense_id: Option<i32>,
    ) -> Result<Vec<expense_budgets::Model>, ExpenseError> {
        let mut query = expense_budgets::Entity::find();
        if let Some(branches) = scope.visible_branches() {
            query = query.filter(expense_budgets::Column::BranchId.is_in(branches));
        }
        if let Some(expense_id) = expense_id {
            query = query.filter(expense_budgets::Column::ExpenseId.eq(expense_id));
        }
        Ok(query
            .order_by_asc(expense_budgets::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Updates a budget. Existing charges keep their amount.
    pub async fn update_budget(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        budget_id: i32,
        input: UpdateBudgetInput,
    ) -> Result<expense_budgets::Model, ExpenseError> {
        require_actor(actor)?;
        let budget = self.get_budget(scope, budget_id).await?;
        let fixed_amount = match input.fixed_amount {
            FieldUpdate::SetTo(amount) => ensure_positive(amount, "fixed_amount")?,
            FieldUpdate::Unchanged => budget.fixed_amount(),
        };
        let name = input.name.apply(budget.name.clone());

        let mut active: expense_budgets::ActiveModel = budget.into();
        active.name = Set(name);
        active.fixed_amount_minor = Set(to_minor(fixed_amount)?);
        Ok(active.update(&self.db).await?)
    }

    /// Deletes a budget; rejected while charges reference it.
    pub async fn delete_budget(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        budget_id: i32,
    ) -> Result<Deleted, ExpenseError> {
        require_actor(actor)?;
        self.get_budget(scope, budget_id).await?;

        let mutation = MutationScope::begin(&self.db, "delete_budget").await?;
        let result = async {
            let txn = mutation.conn();
            let charges = expense_charges::Entity::find()
                .filter(expense_charges::Column::BudgetId.eq(budget_id))
                .count(txn)
                .await?;
            if charges > 0 {
                return Err(PostingError::HasCharges {
                    entity: "Budget",
                    id: budget_id,
                }
                .into());
            }
            let deleted = expense_budgets::Entity::delete_by_id(budget_id)
                .exec(txn)
                .await?;
            Ok::<_, ExpenseError>(deleted.rows_affected)
        }
        .await;
        let deleted = mutation.finish(result).await?;

        tracing::info!(budget_id, "expense budget deleted");
        Ok(Deleted { deleted })
    }

    /// Charges a budget for the billing period containing `charge_date`.
    ///
    /// At most one charge exists per budget and period; a second attempt is
    /// rejected with `AlreadyCharged`, including when a concurrent charge
    /// wins the unique index.
    pub async fn charge_budget(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        budget_id: i32,
        charge_date: NaiveDate,
    ) -> Result<expense_charges::Model, ExpenseError> {
        let actor = require_actor(actor)?;
        let budget = self.get_budget(scope, budget_id).await?;
        let period = BillingPeriod::containing(charge_date)?;
        let amount = ensure_positive(budget.fixed_amount(), "fixed_amount")?;
        let already_charged = PostingError::AlreadyCharged {
            budget_id,
            month: period.month(),
            year: period.year(),
        };
        let month = i32::try_from(period.month()).map_err(|_| PostingError::InvalidPeriod {
            year: period.year(),
            month: period.month(),
        })?;
        let amount_minor = to_minor(amount)?;

        let mutation = MutationScope::begin(&self.db, "charge_budget").await?;
        let result = async {
            let txn = mutation.conn();
            let existing = expense_charges::Entity::find()
                .filter(expense_charges::Column::BudgetId.eq(budget_id))
                .filter(expense_charges::Column::PeriodYear.eq(period.year()))
                .filter(expense_charges::Column::PeriodMonth.eq(month))
                .count(txn)
                .await?;
            if existing > 0 {
                return Err(ExpenseError::from(already_charged.clone()));
            }

            let inserted = expense_charges::ActiveModel {
                branch_id: Set(budget.branch_id),
                expense_id: Set(budget.expense_id),
                budget_id: Set(Some(budget_id)),
                period_year: Set(Some(period.year())),
                period_month: Set(Some(month)),
                amount_minor: Set(amount_minor),
                charge_date: Set(charge_date),
                note: Set(Some(format!("{} {period}", budget.name))),
                created_by: Set(actor.0),
                ..Default::default()
            }
            .insert(txn)
            .await;
            match inserted {
                Ok(charge) => Ok(charge),
                // A concurrent charge committed between the check and the insert.
                Err(err) if is_unique_violation(&err) => Err(already_charged.clone().into()),
                Err(err) => Err(ExpenseError::from(err)),
            }
        }
        .await;

        match mutation.finish(result).await {
            Ok(charge) => {
                tracing::info!(budget_id, charge_id = charge.id, %period, amount = %amount, "budget charged");
                Ok(charge)
            }
            Err(err) => {
                if matches!(err, ExpenseError::Posting(PostingError::AlreadyCharged { .. })) {
                    tracing::warn!(budget_id, %period, "duplicate budget charge rejected");
                }
                Err(err)
            }
        }
    }

    // ========================================================================
    // Payments
    // ========================================================================

    /// Pays a charge from an account.
    ///
    /// Without an amount the remaining charge is paid; an explicit amount may
    /// not exceed it.
    pub async fn create_payment(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        input: CreatePaymentInput,
    ) -> Result<expense_payments::Model, ExpenseError> {
        let actor = require_actor(actor)?;
        let charge = self.find_charge(scope, input.charge_id).await?;
        if let Some(amount) = input.amount {
            ensure_positive(amount, "amount_paid")?;
            to_minor(amount)?;
        }

        let mutation = MutationScope::begin(&self.db, "create_expense_payment").await?;
        let result = async {
            let txn = mutation.conn();
            let charge = lock_charge(txn, charge.id).await?;
            let paid = paid_on_charge(txn, charge.id, None).await?;
            let amount = resolve_payment_amount(input.amount, charge.amount(), paid)?;
            find_account_in_branch(txn, input.account_id, charge.branch_id).await?;

            let payment = expense_payments::ActiveModel {
                branch_id: Set(charge.branch_id),
                charge_id: Set(charge.id),
                account_id: Set(input.account_id),
                amount_paid_minor: Set(to_minor(amount)?),
                payment_date: Set(input.payment_date),
                created_by: Set(actor.0),
                ..Default::default()
            }
            .insert(txn)
            .await?;

            let ctx = payment_context(&payment, actor.0, scope.is_admin);
            apply_account_leg(txn, AccountLeg::debit(payment.account_id, amount), &ctx).await?;
            Ok::<_, ExpenseError>(payment)
        }
        .await;
        let payment = mutation.finish(result).await?;

        tracing::info!(
            payment_id = payment.id,
            charge_id = payment.charge_id,
            account_id = payment.account_id,
            amount = %payment.amount_paid(),
            "expense payment created"
        );
        Ok(payment)
    }

    /// Lists payments in the visible branches.
    pub async fn list_payments(
        &self,
        scope: &BranchScope,
        charge_id: Option<i32>,
    ) -> Result<Vec<expense_payments::Model>, ExpenseError> {
        let mut query = expense_payments::Entity::find();
        if let Some(branches) = scope.visible_branches() {
            query = query.filter(expense_payments::Column::BranchId.is_in(branches));
        }
        if let Some(charge_id) = charge_id {
            query = query.filter(expense_payments::Column::ChargeId.eq(charge_id));
        }
        Ok(query
            .order_by_desc(expense_payments::Column::PaymentDate)
            .order_by_desc(expense_payments::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Updates a payment: refunds the old account, then debits the new one.
    ///
    /// Changing only the date rewrites the row without posting.
    pub async fn update_payment(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        payment_id: i32,
        input: UpdatePaymentInput,
    ) -> Result<expense_payments::Model, ExpenseError> {
        let actor = require_actor(actor)?;
        let existing = self.find_payment(scope, payment_id).await?;
        if let FieldUpdate::SetTo(amount) = input.amount {
            ensure_positive(amount, "amount_paid")?;
            to_minor(amount)?;
        }

        // a date-only change leaves the account untouched
        let reposts = input.amount.is_set() || input.account_id.is_set();

        let mutation = MutationScope::begin(&self.db, "update_expense_payment").await?;
        let result = async {
            let txn = mutation.conn();
            let charge = lock_charge(txn, existing.charge_id).await?;
            let paid_elsewhere = paid_on_charge(txn, charge.id, Some(payment_id)).await?;
            let amount = resolve_payment_amount(
                Some(input.amount.apply(existing.amount_paid())),
                charge.amount(),
                paid_elsewhere,
            )?;
            let account_id = input.account_id.apply(existing.account_id);
            find_account_in_branch(txn, account_id, existing.branch_id).await?;

            let ctx = payment_context(&existing, actor.0, scope.is_admin);
            if reposts {
                apply_account_leg(
                    txn,
                    AccountLeg::credit(existing.account_id, existing.amount_paid()),
                    &ctx.labelled("reversal"),
                )
                .await?;
            }

            let payment_date = input.payment_date.apply(existing.payment_date);
            let mut active: expense_payments::ActiveModel = existing.into();
            active.account_id = Set(account_id);
            active.amount_paid_minor = Set(to_minor(amount)?);
            active.payment_date = Set(payment_date);
            let payment = active.update(txn).await?;

            if reposts {
                apply_account_leg(txn, AccountLeg::debit(account_id, amount), &ctx).await?;
            }
            Ok::<_, ExpenseError>(payment)
        }
        .await;
        let payment = mutation.finish(result).await?;

        tracing::info!(payment_id, amount = %payment.amount_paid(), "expense payment updated");
        Ok(payment)
    }

    /// Deletes a payment and refunds its account.
    pub async fn delete_payment(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        payment_id: i32,
    ) -> Result<Deleted, ExpenseError> {
        let actor = require_actor(actor)?;
        let existing = self.find_payment(scope, payment_id).await?;

        let mutation = MutationScope::begin(&self.db, "delete_expense_payment").await?;
        let result = async {
            let txn = mutation.conn();
            let ctx = payment_context(&existing, actor.0, scope.is_admin).labelled("reversal");
            apply_account_leg(
                txn,
                AccountLeg::credit(existing.account_id, existing.amount_paid()),
                &ctx,
            )
            .await?;
            let deleted = expense_payments::Entity::delete_by_id(payment_id)
                .exec(txn)
                .await?;
            Ok::<_, ExpenseError>(deleted.rows_affected)
        }
        .await;
        let deleted = mutation.finish(result).await?;

        tracing::info!(payment_id, amount = %existing.amount_paid(), "expense payment deleted");
        Ok(Deleted { deleted })
    }

    async fn find_charge(
        &self,
        scope: &BranchScope,
        charge_id: i32,
    ) -> Result<expense_charges::Model, ExpenseError> {
        let charge = expense_charges::Entity::find_by_id(charge_id)
            .one(&self.db)
            .await?
            .ok_or(ExpenseError::ChargeNotFound(charge_id))?;
        ensure_branch(scope, BranchId(charge.branch_id))?;
        Ok(charge)
    }

    async fn find_payment(
        &self,
        scope: &BranchScope,
        payment_id: i32,
    ) -> Result<expense_payments::Model, ExpenseError> {
        let payment = expense_payments::Entity::find_by_id(payment_id)
            .one(&self.db)
            .await?
            .ok_or(ExpenseError::PaymentNotFound(payment_id))?;
        ensure_branch(scope, BranchId(payment.branch_id))?;
        Ok(payment)
    }
}

fn summarize(charge: expense_charges::Model, paid: Decimal) -> ChargeSummary {
    let remaining = charge_remaining(charge.amount(), paid);
    ChargeSummary {
        charge,
        paid,
        remaining,
    }
}

fn payment_context(
    payment: &expense_payments::Model,
    actor: i32,
    allow_overdraft: bool,
) -> PostingContext<'static> {
    PostingContext::new(
        payment.branch_id,
        actor,
        "expense_payment",
        payment.payment_date,
    )
    .reference(payment.id)
    .allow_overdraft(allow_overdraft)
}

async fn lock_charge<C>(conn: &C, charge_id: i32) -> Result<expense_charges::Model, ExpenseError>
where
    C: ConnectionTrait,
{
    expense_charges::Entity::find_by_id(charge_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or(ExpenseError::ChargeNotFound(charge_id))
}

/// Sum of payments on a charge, optionally leaving one payment out.
async fn paid_on_charge<C>(conn: &C, charge_id: i32, except: Option<i32>) -> Result<Decimal, DbErr>
where
    C: ConnectionTrait,
{
    let mut query =
        expense_payments::Entity::find().filter(expense_payments::Column::ChargeId.eq(charge_id));
    if let Some(payment_id) = except {
        query = query.filter(expense_payments::Column::Id.ne(payment_id));
    }
    let paid: i64 = query
        .all(conn)
        .await?
        .iter()
        .map(|p| p.amount_paid_minor)
        .sum();
    Ok(from_minor(paid))
}
