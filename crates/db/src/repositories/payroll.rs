//! Payroll repository.
//!
//! A payroll run groups the salary lines charged on one date for one branch.
//! Lines are paid in one or more salary payments, never beyond the line's net
//! salary. Deleting payments, lines or whole periods refunds every payment's
//! account before the row goes away, and a run disappears with its last line.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};

use branchledger_core::access::{ensure_branch, require_actor, resolve_write_branch};
use branchledger_core::balance::ensure_positive;
use branchledger_core::money::{from_minor, to_minor};
use branchledger_core::salary::{salary_remaining, validate_salary_payment};
use branchledger_core::{AccessError, AccountLeg, BillingPeriod, PostingError};
use branchledger_shared::types::{BranchId, BranchScope, Created, Deleted, UserId};
use branchledger_shared::ErrorKind;

use crate::balance::{apply_account_leg, find_account_in_branch, BalanceError, PostingContext};
use crate::coordinator::MutationScope;
use crate::entities::sea_orm_active_enums::PayrollStatus;
use crate::entities::{employee_payments, employees, payroll_lines, payroll_runs};
use crate::error::{impl_app_error, is_unique_violation};

/// Error types for payroll operations.
#[derive(Debug, thiserror::Error)]
pub enum PayrollError {
    /// Payroll run not found.
    #[error("Payroll run not found: {0}")]
    RunNotFound(i32),

    /// Payroll line not found.
    #[error("Payroll line not found: {0}")]
    LineNotFound(i32),

    /// Salary payment not found.
    #[error("Salary payment not found: {0}")]
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

impl PayrollError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::RunNotFound(_) => "PAYROLL_RUN_NOT_FOUND",
            Self::LineNotFound(_) => "PAYROLL_LINE_NOT_FOUND",
            Self::PaymentNotFound(_) => "SALARY_PAYMENT_NOT_FOUND",
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
            Self::RunNotFound(_) | Self::LineNotFound(_) | Self::PaymentNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::Access(e) => e.kind(),
            Self::Posting(e) => e.kind(),
            Self::Balance(e) => e.kind(),
            Self::Database(_) => ErrorKind::Internal,
        }
    }
}

impl_app_error!(PayrollError);

/// How `charge_payroll` treats a run already charged on the same date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeMode {
    /// Reuse the run and add lines for employees it is missing.
    #[default]
    Merge,
    /// Reject the charge.
    Insert,
}

/// Input for charging payroll.
#[derive(Debug, Clone)]
pub struct ChargePayrollInput {
    /// Target branch; the caller's primary branch when absent.
    pub branch_id: Option<BranchId>,
    /// Date the salaries are charged on.
    pub charge_date: NaiveDate,
    /// Duplicate handling.
    pub mode: ChargeMode,
}

/// Input for paying a salary line.
#[derive(Debug, Clone)]
pub struct PaySalaryInput {
    /// Account the money leaves.
    pub account_id: i32,
    /// Amount paid.
    pub amount: Decimal,
    /// Business date.
    pub payment_date: NaiveDate,
}

/// Filter options for listing payroll.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayrollFilter {
    /// Calendar year.
    pub year: Option<i32>,
    /// Calendar month (1-12).
    pub month: Option<u32>,
}

/// A payroll line with its payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayrollLineView {
    /// The line.
    pub line: payroll_lines::Model,
    /// Employee name.
    pub employee_name: String,
    /// Sum of salary payments.
    pub paid: Decimal,
    /// Net salary minus payments.
    pub remaining: Decimal,
}

/// A payroll run with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayrollRunView {
    /// The run.
    pub run: payroll_runs::Model,
    /// Lines, ordered by employee.
    pub lines: Vec<PayrollLineView>,
    /// Sum of net salaries.
    pub total_net: Decimal,
    /// Sum of payments.
    pub total_paid: Decimal,
}

/// Payroll repository.
#[derive(Debug, Clone)]
pub struct PayrollRepository {
    db: DatabaseConnection,
}

impl PayrollRepository {
    /// Creates a new payroll repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Charges payroll for every active employee of the branch.
    ///
    /// Returns the number of lines created.
    pub async fn charge_payroll(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        input: ChargePayrollInput,
    ) -> Result<Created, PayrollError> {
        let actor = require_actor(actor)?;
        let branch = resolve_write_branch(scope, input.branch_id)?;
        let period = BillingPeriod::containing(input.charge_date)?;
        let period_month = month_number(&period)?;
        let charge_date = input.charge_date;

        let templates = employees::Entity::find()
            .filter(employees::Column::BranchId.eq(branch.0))
            .filter(employees::Column::IsActive.eq(true))
            .order_by_asc(employees::Column::Id)
            .all(&self.db)
            .await?;
        if templates.is_empty() {
            return Err(PostingError::NoPayrollTemplates.into());
        }

        let mutation = MutationScope::begin(&self.db, "charge_payroll").await?;
        let result = async {
            let txn = mutation.conn();
            let existing = payroll_runs::Entity::find()
                .filter(payroll_runs::Column::BranchId.eq(branch.0))
                .filter(payroll_runs::Column::ChargeDate.eq(charge_date))
                .one(txn)
                .await?;

            let run = match (existing, input.mode) {
                (Some(_), ChargeMode::Insert) => {
                    return Err(PayrollError::from(PostingError::PayrollAlreadyCharged(
                        charge_date,
                    )));
                }
                (Some(run), ChargeMode::Merge) => run,
                (None, _) => {
                    let inserted = payroll_runs::ActiveModel {
                        branch_id: Set(branch.0),
                        charge_date: Set(charge_date),
                        period_year: Set(period.year()),
                        period_month: Set(period_month),
                        status: Set(PayrollStatus::Pending),
                        created_by: Set(actor.0),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await;
                    match inserted {
                        Ok(run) => run,
                        Err(err) if is_unique_violation(&err) => {
                            return Err(PayrollError::from(
                                PostingError::PayrollAlreadyCharged(charge_date),
                            ));
                        }
                        Err(err) => return Err(PayrollError::from(err)),
                    }
                }
            };

            let charged: HashSet<i32> = payroll_lines::Entity::find()
                .filter(payroll_lines::Column::RunId.eq(run.id))
                .all(txn)
                .await?
                .into_iter()
                .map(|line| line.employee_id)
                .collect();

            let mut created = 0u64;
            for employee in templates.iter().filter(|e| !charged.contains(&e.id)) {
                payroll_lines::ActiveModel {
                    run_id: Set(run.id),
                    employee_id: Set(employee.id),
                    net_salary_minor: Set(employee.net_salary_minor),
                    ..Default::default()
                }
                .insert(txn)
                .await?;
                created += 1;
            }
            refresh_run_status(txn, run.id).await?;
            Ok::<_, PayrollError>((run.id, created))
        }
        .await;

        match mutation.finish(result).await {
            Ok((run_id, created)) => {
                tracing::info!(
                    branch_id = branch.0,
                    run_id,
                    %period,
                    %charge_date,
                    created,
                    "payroll charged"
                );
                Ok(Created { created })
            }
            Err(err) => {
                if matches!(err, PayrollError::Posting(PostingError::PayrollAlreadyCharged(_))) {
                    tracing::warn!(branch_id = branch.0, %charge_date, "duplicate payroll charge rejected");
                }
                Err(err)
            }
        }
    }

    /// Lists payroll runs in the visible branches with lines and payments.
    pub async fn list_payroll(
        &self,
        scope: &BranchScope,
        filter: PayrollFilter,
    ) -> Result<Vec<PayrollRunView>, PayrollError> {
        let mut query = payroll_runs::Entity::find();
        if let Some(branches) = scope.visible_branches() {
            query = query.filter(payroll_runs::Column::BranchId.is_in(branches));
        }
        if let Some(year) = filter.year {
            query = query.filter(payroll_runs::Column::PeriodYear.eq(year));
        }
        if let Some(month) = filter.month {
            let month = i32::try_from(month)
                .ok()
                .filter(|m| (1..=12).contains(m))
                .ok_or(PostingError::InvalidPeriod {
                    year: filter.year.unwrap_or_default(),
                    month,
                })?;
            query = query.filter(payroll_runs::Column::PeriodMonth.eq(month));
        }
        let runs = query
            .order_by_desc(payroll_runs::Column::ChargeDate)
            .all(&self.db)
            .await?;

        let run_ids: Vec<i32> = runs.iter().map(|r| r.id).collect();
        let lines = payroll_lines::Entity::find()
            .filter(payroll_lines::Column::RunId.is_in(run_ids))
            .order_by_asc(payroll_lines::Column::EmployeeId)
            .all(&self.db)
            .await?;
        let line_ids: Vec<i32> = lines.iter().map(|l| l.id).collect();
        let employee_ids: Vec<i32> = lines.iter().map(|l| l.employee_id).collect();

        let mut paid: HashMap<i32, i64> = HashMap::new();
        for payment in employee_payments::Entity::find()
            .filter(employee_payments::Column::LineId.is_in(line_ids))
            .all(&self.db)
            .await?
        {
            *paid.entry(payment.line_id).or_default() += payment.amount_paid_minor;
        }
        let names: HashMap<i32, String> = employees::Entity::find()
            .filter(employees::Column::Id.is_in(employee_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|e| (e.id, e.name))
            .collect();

        let mut by_run: HashMap<i32, Vec<PayrollLineView>> = HashMap::new();
        for line in lines {
            let line_paid = from_minor(paid.get(&line.id).copied().unwrap_or_default());
            by_run.entry(line.run_id).or_default().push(PayrollLineView {
                employee_name: names.get(&line.employee_id).cloned().unwrap_or_default(),
                paid: line_paid,
                remaining: salary_remaining(line.net_salary(), line_paid),
                line,
            });
        }

        Ok(runs
            .into_iter()
            .map(|run| {
                let lines = by_run.remove(&run.id).unwrap_or_default();
                PayrollRunView {
                    total_net: lines.iter().map(|l| l.line.net_salary()).sum(),
                    total_paid: lines.iter().map(|l| l.paid).sum(),
                    run,
                    lines,
                }
            })
            .collect())
    }

    /// Pays part or all of a salary line.
    pub async fn pay_salary(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        line_id: i32,
        input: PaySalaryInput,
    ) -> Result<employee_payments::Model, PayrollError> {
        let actor = require_actor(actor)?;
        let (_, run) = self.find_line(scope, line_id).await?;
        let amount = ensure_positive(input.amount, "amount_paid")?;
        let amount_minor = to_minor(amount)?;

        let mutation = MutationScope::begin(&self.db, "pay_salary").await?;
        let result = async {
            let txn = mutation.conn();
            let line = payroll_lines::Entity::find_by_id(line_id)
                .lock_exclusive()
                .one(txn)
                .await?
                .ok_or(PayrollError::LineNotFound(line_id))?;
            let prior = paid_on_line(txn, line_id).await?;
            let remaining = validate_salary_payment(amount, line.net_salary(), prior)?;
            find_account_in_branch(txn, input.account_id, run.branch_id).await?;

            let payment = employee_payments::ActiveModel {
                line_id: Set(line_id),
                account_id: Set(input.account_id),
                amount_paid_minor: Set(amount_minor),
                payment_date: Set(input.payment_date),
                created_by: Set(actor.0),
                ..Default::default()
            }
            .insert(txn)
            .await?;

            let ctx = salary_context(&payment, run.branch_id, actor.0, scope.is_admin);
            apply_account_leg(txn, AccountLeg::debit(payment.account_id, amount), &ctx).await?;
            refresh_run_status(txn, run.id).await?;
            Ok::<_, PayrollError>((payment, remaining))
        }
        .await;
        let (payment, remaining) = mutation.finish(result).await?;

        tracing::info!(
            payment_id = payment.id,
            line_id,
            account_id = payment.account_id,
            amount = %amount,
            remaining = %remaining,
            "salary paid"
        );
        Ok(payment)
    }

    /// Deletes a salary payment and refunds its account.
    pub async fn delete_salary_payment(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        payment_id: i32,
    ) -> Result<Deleted, PayrollError> {
        let actor = require_actor(actor)?;
        let payment = employee_payments::Entity::find_by_id(payment_id)
            .one(&self.db)
            .await?
            .ok_or(PayrollError::PaymentNotFound(payment_id))?;
        let (_, run) = self.find_line(scope, payment.line_id).await?;

        let mutation = MutationScope::begin(&self.db, "delete_salary_payment").await?;
        let result = async {
            let txn = mutation.conn();
            let deleted = remove_payment(txn, &payment, &run, actor.0, scope.is_admin).await?;
            refresh_run_status(txn, run.id).await?;
            Ok::<_, PayrollError>(deleted)
        }
        .await;
        let deleted = mutation.finish(result).await?;

        tracing::info!(payment_id, amount = %payment.amount_paid(), "salary payment deleted");
        Ok(Deleted { deleted })
    }

    /// Deletes a payroll line with its payments; the run goes with its last line.
    ///
    /// Returns the number of lines deleted.
    pub async fn delete_payroll_line(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        line_id: i32,
    ) -> Result<Deleted, PayrollError> {
        let actor = require_actor(actor)?;
        let (line, run) = self.find_line(scope, line_id).await?;

        let mutation = MutationScope::begin(&self.db, "delete_payroll_line").await?;
        let result = async {
            let txn = mutation.conn();
            let deleted = remove_line(txn, &line, &run, actor.0, scope.is_admin).await?;
            let remaining_lines = payroll_lines::Entity::find()
                .filter(payroll_lines::Column::RunId.eq(run.id))
                .count(txn)
                .await?;
            let run_removed = remaining_lines == 0;
            if run_removed {
                payroll_runs::Entity::delete_by_id(run.id).exec(txn).await?;
            } else {
                refresh_run_status(txn, run.id).await?;
            }
            Ok::<_, PayrollError>((deleted, run_removed))
        }
        .await;
        let (deleted, run_removed) = mutation.finish(result).await?;

        tracing::info!(line_id, run_id = run.id, run_removed, "payroll line deleted");
        Ok(Deleted { deleted })
    }

    /// Deletes every visible payroll run of a period.
    ///
    /// Branch access is checked for every run before anything is removed.
    /// Returns the number of runs deleted.
    pub async fn delete_payroll_period(
        &self,
        scope: &BranchScope,
        actor: Option<UserId>,
        year: i32,
        month: u32,
    ) -> Result<Deleted, PayrollError> {
        let actor = require_actor(actor)?;
        let period = BillingPeriod::new(year, month)?;

        let mut query = payroll_runs::Entity::find()
            .filter(payroll_runs::Column::PeriodYear.eq(period.year()))
            .filter(payroll_runs::Column::PeriodMonth.eq(month_number(&period)?));
        if let Some(branches) = scope.visible_branches() {
            query = query.filter(payroll_runs::Column::BranchId.is_in(branches));
        }
        let runs = query
            .order_by_asc(payroll_runs::Column::Id)
            .all(&self.db)
            .await?;
        for run in &runs {
            ensure_branch(scope, BranchId(run.branch_id))?;
        }

        let mutation = MutationScope::begin(&self.db, "delete_payroll_period").await?;
        let result = async {
            let txn = mutation.conn();
            let mut deleted = 0u64;
            for run in &runs {
                let lines = payroll_lines::Entity::find()
                    .filter(payroll_lines::Column::RunId.eq(run.id))
                    .all(txn)
                    .await?;
                for line in &lines {
                    remove_line(txn, line, run, actor.0, scope.is_admin).await?;
                }
                deleted += payroll_runs::Entity::delete_by_id(run.id)
                    .exec(txn)
                    .await?
                    .rows_affected;
            }
            Ok::<_, PayrollError>(deleted)
        }
        .await;
        let deleted = mutation.finish(result).await?;

        tracing::info!(%period, deleted, "payroll period deleted");
        Ok(Deleted { deleted })
    }

    async fn find_line(
        &self,
        scope: &BranchScope,
        line_id: i32,
    ) -> Result<(payroll_lines::Model, payroll_runs::Model), PayrollError> {
        let line = payroll_lines::Entity::find_by_id(line_id)
            .one(&self.db)
            .await?
            .ok_or(PayrollError::LineNotFound(line_id))?;
        let run = payroll_runs::Entity::find_by_id(line.run_id)
            .one(&self.db)
            .await?
            .ok_or(PayrollError::RunNotFound(line.run_id))?;
        ensure_branch(scope, BranchId(run.branch_id))?;
        Ok((line, run))
    }
}

fn month_number(period: &BillingPeriod) -> Result<i32, PostingError> {
    i32::try_from(period.month()).map_err(|_| PostingError::InvalidPeriod {
        year: period.year(),
        month: period.month(),
    })
}

fn salary_context(
    payment: &employee_payments::Model,
    branch_id: i32,
    actor: i32,
    allow_overdraft: bool,
) -> PostingContext<'static> {
    PostingContext::new(branch_id, actor, "salary_payment", payment.payment_date)
        .reference(payment.id)
        .allow_overdraft(allow_overdraft)
}

async fn paid_on_line<C>(conn: &C, line_id: i32) -> Result<Decimal, DbErr>
where
    C: ConnectionTrait,
{
    let paid: i64 = employee_payments::Entity::find()
        .filter(employee_payments::Column::LineId.eq(line_id))
        .all(conn)
        .await?
        .iter()
        .map(|p| p.amount_paid_minor)
        .sum();
    Ok(from_minor(paid))
}

/// Refunds a salary payment's account and deletes the payment.
async fn remove_payment<C>(
    conn: &C,
    payment: &employee_payments::Model,
    run: &payroll_runs::Model,
    actor: i32,
    allow_overdraft: bool,
) -> Result<u64, PayrollError>
where
    C: ConnectionTrait,
{
    let ctx = salary_context(payment, run.branch_id, actor, allow_overdraft).labelled("reversal");
    apply_account_leg(
        conn,
        AccountLeg::credit(payment.account_id, payment.amount_paid()),
        &ctx,
    )
    .await?;
    Ok(employee_payments::Entity::delete_by_id(payment.id)
        .exec(conn)
        .await?
        .rows_affected)
}

/// Removes a line after refunding and deleting its payments.
async fn remove_line<C>(
    conn: &C,
    line: &payroll_lines::Model,
    run: &payroll_runs::Model,
    actor: i32,
    allow_overdraft: bool,
) -> Result<u64, PayrollError>
where
    C: ConnectionTrait,
{
    let payments = employee_payments::Entity::find()
        .filter(employee_payments::Column::LineId.eq(line.id))
        .all(conn)
        .await?;
    for payment in &payments {
        remove_payment(conn, payment, run, actor, allow_overdraft).await?;
    }
    Ok(payroll_lines::Entity::delete_by_id(line.id)
        .exec(conn)
        .await?
        .rows_affected)
}

/// Recomputes a run's status from its lines and payments.
async fn refresh_run_status<C>(conn: &C, run_id: i32) -> Result<PayrollStatus, DbErr>
where
    C: ConnectionTrait,
{
    let lines = payroll_lines::Entity::find()
        .filter(payroll_lines::Column::RunId.eq(run_id))
        .all(conn)
        .await?;
    let line_ids: Vec<i32> = lines.iter().map(|l| l.id).collect();
    let mut paid: HashMap<i32, i64> = HashMap::new();
    for payment in employee_payments::Entity::find()
        .filter(employee_payments::Column::LineId.is_in(line_ids))
        .all(conn)
        .await?
    {
        *paid.entry(payment.line_id).or_default() += payment.amount_paid_minor;
    }

    let status = if paid.values().all(|p| *p == 0) {
        PayrollStatus::Pending
    } else if lines
        .iter()
        .all(|l| paid.get(&l.id).copied().unwrap_or_default() >= l.net_salary_minor)
    {
        PayrollStatus::Paid
    } else {
        PayrollStatus::Partial
    };

    payroll_runs::ActiveModel {
        id: Set(run_id),
        status: Set(status),
        ..Default::default()
    }
    .update(conn)
    .await?;
    Ok(status)
}
