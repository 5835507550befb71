//! Integration tests for expenses, budgets, charges and payments.

mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use branchledger_core::{BillingPeriod, PostingError};
use branchledger_db::repositories::{
    ChargeFilter, CreateBudgetInput, CreateChargeInput, CreateExpenseInput, CreatePaymentInput,
    ExpenseError, ExpenseRepository, UpdateChargeInput, UpdatePaymentInput,
};
use branchledger_shared::types::FieldUpdate;
use branchledger_shared::ErrorKind;
use common::{account, balance, count, date, member, outsider, setup_db, ACTOR};

async fn expense(repo: &ExpenseRepository, name: &str) -> i32 {
    repo.create_expense(
        &member(),
        ACTOR,
        CreateExpenseInput {
            branch_id: None,
            name: name.to_string(),
        },
    )
    .await
    .unwrap()
    .id
}

async fn charge(repo: &ExpenseRepository, expense_id: i32, amount: Decimal) -> i32 {
    repo.create_charge(
        &member(),
        ACTOR,
        CreateChargeInput {
            expense_id,
            amount,
            charge_date: date(2026, 3, 1),
            note: None,
        },
    )
    .await
    .unwrap()
    .id
}

fn payment(charge_id: i32, account_id: i32, amount: Option<Decimal>) -> CreatePaymentInput {
    CreatePaymentInput {
        charge_id,
        account_id,
        amount,
        payment_date: date(2026, 3, 5),
    }
}

#[tokio::test]
async fn test_budget_charged_once_per_period() {
    let db = setup_db().await;
    let repo = ExpenseRepository::new(db.clone());
    let rent = expense(&repo, "Rent").await;
    let budget = repo
        .create_budget(
            &member(),
            ACTOR,
            CreateBudgetInput {
                expense_id: Some(rent),
                name: "Shop rent".to_string(),
                fixed_amount: dec!(200),
            },
        )
        .await
        .unwrap();

    let first = repo
        .charge_budget(&member(), ACTOR, budget.id, date(2026, 3, 1))
        .await
        .unwrap();
    assert_eq!(first.amount(), dec!(200));
    assert_eq!(first.period_month, Some(3));

    let err = repo
        .charge_budget(&member(), ACTOR, budget.id, date(2026, 3, 28))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ExpenseError::Posting(PostingError::AlreadyCharged {
            month: 3,
            year: 2026,
            ..
        })
    ));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    repo.charge_budget(&member(), ACTOR, budget.id, date(2026, 4, 1))
        .await
        .unwrap();

    let march = repo
        .list_charges(
            &member(),
            ChargeFilter {
                budget_id: Some(budget.id),
                period: Some(BillingPeriod::new(2026, 3).unwrap()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(march.len(), 1);
    assert_eq!(count(&db, "expense_charges").await, 2);
}

#[tokio::test]
async fn test_two_budgets_same_period() {
    let db = setup_db().await;
    let repo = ExpenseRepository::new(db.clone());
    let utilities = expense(&repo, "Utilities").await;
    for name in ["Power", "Water"] {
        let budget = repo
            .create_budget(
                &member(),
                ACTOR,
                CreateBudgetInput {
                    expense_id: Some(utilities),
                    name: name.to_string(),
                    fixed_amount: dec!(45.50),
                },
            )
            .await
            .unwrap();
        repo.charge_budget(&member(), ACTOR, budget.id, date(2026, 3, 1))
            .await
            .unwrap();
    }
    assert_eq!(count(&db, "expense_charges").await, 2);
}

#[tokio::test]
async fn test_budget_requires_expense() {
    let db = setup_db().await;
    let repo = ExpenseRepository::new(db.clone());

    let err = repo
        .create_budget(
            &member(),
            ACTOR,
            CreateBudgetInput {
                expense_id: None,
                name: "Orphan".to_string(),
                fixed_amount: dec!(10),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ExpenseError::Posting(PostingError::MissingAssociation("expense_id"))
    ));
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn test_charge_with_payments_cannot_be_deleted() {
    let db = setup_db().await;
    let cash = account(&db, 1, "Cash", dec!(1000)).await;
    let repo = ExpenseRepository::new(db.clone());
    let rent = expense(&repo, "Rent").await;
    let charge_id = charge(&repo, rent, dec!(300)).await;

    let paid = repo
        .create_payment(&member(), ACTOR, payment(charge_id, cash, Some(dec!(100))))
        .await
        .unwrap();
    assert_eq!(balance(&db, cash).await, dec!(900));

    let err = repo.delete_charge(&member(), ACTOR, charge_id).await.unwrap_err();
    assert!(matches!(err, ExpenseError::Posting(PostingError::ChargeHasPayments(_))));

    repo.delete_payment(&member(), ACTOR, paid.id).await.unwrap();
    assert_eq!(balance(&db, cash).await, dec!(1000));

    let deleted = repo.delete_charge(&member(), ACTOR, charge_id).await.unwrap();
    assert_eq!(deleted.deleted, 1);
}

#[tokio::test]
async fn test_payment_defaults_to_remaining_and_is_capped() {
    let db = setup_db().await;
    let cash = account(&db, 1, "Cash", dec!(1000)).await;
    let repo = ExpenseRepository::new(db.clone());
    let rent = expense(&repo, "Rent").await;
    let charge_id = charge(&repo, rent, dec!(250)).await;

    repo.create_payment(&member(), ACTOR, payment(charge_id, cash, Some(dec!(100))))
        .await
        .unwrap();

    let err = repo
        .create_payment(&member(), ACTOR, payment(charge_id, cash, Some(dec!(150.01))))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ExpenseError::Posting(PostingError::PaymentExceedsCharge { .. })
    ));

    let rest = repo
        .create_payment(&member(), ACTOR, payment(charge_id, cash, None))
        .await
        .unwrap();
    assert_eq!(rest.amount_paid(), dec!(150));
    assert_eq!(balance(&db, cash).await, dec!(750));

    let summary = repo.get_charge(&member(), charge_id).await.unwrap();
    assert_eq!(summary.paid, dec!(250));
    assert_eq!(summary.remaining, Decimal::ZERO);

    let err = repo
        .create_payment(&member(), ACTOR, payment(charge_id, cash, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ExpenseError::Posting(PostingError::FullyPaid)));
}

#[tokio::test]
async fn test_update_payment_moves_between_accounts() {
    let db = setup_db().await;
    let cash = account(&db, 1, "Cash", dec!(500)).await;
    let bank = account(&db, 1, "Bank", dec!(500)).await;
    let repo = ExpenseRepository::new(db.clone());
    let rent = expense(&repo, "Rent").await;
    let charge_id = charge(&repo, rent, dec!(300)).await;

    let paid = repo
        .create_payment(&member(), ACTOR, payment(charge_id, cash, Some(dec!(100))))
        .await
        .unwrap();
    repo.update_payment(
        &member(),
        ACTOR,
        paid.id,
        UpdatePaymentInput {
            amount: FieldUpdate::SetTo(dec!(120)),
            account_id: FieldUpdate::SetTo(bank),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(balance(&db, cash).await, dec!(500));
    assert_eq!(balance(&db, bank).await, dec!(380));
}

#[tokio::test]
async fn test_charge_amount_cannot_drop_below_paid() {
    let db = setup_db().await;
    let cash = account(&db, 1, "Cash", dec!(500)).await;
    let repo = ExpenseRepository::new(db.clone());
    let rent = expense(&repo, "Rent").await;
    let charge_id = charge(&repo, rent, dec!(300)).await;
    repo.create_payment(&member(), ACTOR, payment(charge_id, cash, Some(dec!(200))))
        .await
        .unwrap();

    let err = repo
        .update_charge(
            &member(),
            ACTOR,
            charge_id,
            UpdateChargeInput {
                amount: FieldUpdate::SetTo(dec!(150)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ExpenseError::Posting(PostingError::ChargeBelowPaid { .. })));

    let updated = repo
        .update_charge(
            &member(),
            ACTOR,
            charge_id,
            UpdateChargeInput {
                amount: FieldUpdate::SetTo(dec!(200)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.amount(), dec!(200));
}

#[tokio::test]
async fn test_expense_with_charges_cannot_be_deleted() {
    let db = setup_db().await;
    let repo = ExpenseRepository::new(db.clone());
    let rent = expense(&repo, "Rent").await;
    let charge_id = charge(&repo, rent, dec!(300)).await;

    let err = repo.delete_expense(&member(), ACTOR, rent).await.unwrap_err();
    assert!(matches!(err, ExpenseError::Posting(PostingError::HasCharges { .. })));

    assert!(repo.get_charge(&outsider(), charge_id).await.is_err());
    repo.delete_charge(&member(), ACTOR, charge_id).await.unwrap();
    repo.delete_expense(&member(), ACTOR, rent).await.unwrap();
    assert_eq!(count(&db, "expenses").await, 0);
}

#[tokio::test]
async fn test_budget_charge_cannot_leave_its_period() {
    let db = setup_db().await;
    let repo = ExpenseRepository::new(db.clone());
    let rent = expense(&repo, "Rent").await;
    let budget = repo
        .create_budget(
            &member(),
            ACTOR,
            CreateBudgetInput {
                expense_id: Some(rent),
                name: "Shop rent".to_string(),
                fixed_amount: dec!(200),
            },
        )
        .await
        .unwrap();
    let march = repo
        .charge_budget(&member(), ACTOR, budget.id, date(2026, 3, 1))
        .await
        .unwrap();

    let err = repo
        .update_charge(
            &member(),
            ACTOR,
            march.id,
            UpdateChargeInput {
                charge_date: FieldUpdate::SetTo(date(2026, 4, 10)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ExpenseError::Posting(PostingError::DateOutsidePeriod { month: 3, year: 2026, .. })
    ));
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let moved = repo
        .update_charge(
            &member(),
            ACTOR,
            march.id,
            UpdateChargeInput {
                charge_date: FieldUpdate::SetTo(date(2026, 3, 31)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.charge_date, date(2026, 3, 31));

    repo.charge_budget(&member(), ACTOR, budget.id, date(2026, 4, 1))
        .await
        .unwrap();
    let april = repo
        .list_charges(
            &member(),
            ChargeFilter {
                budget_id: Some(budget.id),
                period: Some(BillingPeriod::new(2026, 4).unwrap()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(april.len(), 1);
}

#[tokio::test]
async fn test_hand_entered_charge_may_change_month() {
    let db = setup_db().await;
    let repo = ExpenseRepository::new(db.clone());
    let rent = expense(&repo, "Rent").await;
    let charge_id = charge(&repo, rent, dec!(300)).await;

    let moved = repo
        .update_charge(
            &member(),
            ACTOR,
            charge_id,
            UpdateChargeInput {
                charge_date: FieldUpdate::SetTo(date(2026, 5, 2)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.charge_date, date(2026, 5, 2));
}

#[tokio::test]
async fn test_payment_date_change_does_not_repost() {
    let db = setup_db().await;
    let cash = account(&db, 1, "Cash", dec!(500)).await;
    let repo = ExpenseRepository::new(db.clone());
    let rent = expense(&repo, "Rent").await;
    let charge_id = charge(&repo, rent, dec!(300)).await;
    let paid = repo
        .create_payment(&member(), ACTOR, payment(charge_id, cash, Some(dec!(100))))
        .await
        .unwrap();
    let rows = count(&db, "account_transactions").await;

    let moved = repo
        .update_payment(
            &member(),
            ACTOR,
            paid.id,
            UpdatePaymentInput {
                payment_date: FieldUpdate::SetTo(date(2026, 3, 20)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(moved.payment_date, date(2026, 3, 20));
    assert_eq!(balance(&db, cash).await, dec!(400));
    assert_eq!(count(&db, "account_transactions").await, rows);
}
