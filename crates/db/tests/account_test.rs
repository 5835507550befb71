//! Integration tests for accounts and the admin adjustment path.

mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use branchledger_db::repositories::{AccountError, AccountRepository, CreateAccountInput};
use branchledger_shared::ErrorKind;
use common::{account, admin, balance, date, member, outsider, setup_db, ACTOR};

fn input(name: &str, opening: Decimal) -> CreateAccountInput {
    CreateAccountInput {
        branch_id: None,
        name: name.to_string(),
        opening_balance: opening,
        opened_on: date(2026, 1, 1),
    }
}

#[tokio::test]
async fn test_opening_balance_writes_one_row() {
    let db = setup_db().await;
    let repo = AccountRepository::new(db.clone());

    let funded = repo
        .create_account(&member(), ACTOR, input("Cash", dec!(250)))
        .await
        .unwrap();
    let empty = repo
        .create_account(&member(), ACTOR, input("Bank", Decimal::ZERO))
        .await
        .unwrap();

    assert_eq!(funded.balance(), dec!(250));
    let history = repo.account_history(&member(), funded.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, "opening");
    assert_eq!(history[0].balance_after(), dec!(250));
    assert!(repo
        .account_history(&member(), empty.id)
        .await
        .unwrap()
        .is_empty());

    let err = repo
        .create_account(&member(), ACTOR, input("Debt", dec!(-1)))
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::NegativeOpeningBalance(_)));
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn test_only_admin_may_adjust_below_zero() {
    let db = setup_db().await;
    let cash = account(&db, 1, "Cash", dec!(100)).await;
    let repo = AccountRepository::new(db.clone());

    let err = repo
        .adjust_account(&member(), ACTOR, cash, dec!(-150), date(2026, 2, 1), "audit")
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::AdminOnly));
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(balance(&db, cash).await, dec!(100));

    let adjusted = repo
        .adjust_account(&admin(), ACTOR, cash, dec!(-150), date(2026, 2, 1), "audit")
        .await
        .unwrap();
    assert_eq!(adjusted.balance(), dec!(-50));

    let history = repo.account_history(&admin(), cash).await.unwrap();
    let kinds: Vec<&str> = history.iter().map(|row| row.kind.as_str()).collect();
    assert_eq!(kinds, ["opening", "adjustment"]);
    assert_eq!(history[0].note, None);
    assert_eq!(history[1].note.as_deref(), Some("audit"));
    assert_eq!(history[1].amount(), dec!(-150));
}

#[tokio::test]
async fn test_accounts_are_branch_scoped() {
    let db = setup_db().await;
    let cash = account(&db, 1, "Cash", dec!(10)).await;
    account(&db, 2, "Safe", dec!(10)).await;
    let repo = AccountRepository::new(db.clone());

    assert_eq!(repo.list_accounts(&member()).await.unwrap().len(), 1);
    assert_eq!(repo.list_accounts(&admin()).await.unwrap().len(), 2);
    assert!(matches!(
        repo.get_account(&outsider(), cash).await.unwrap_err(),
        AccountError::Access(_)
    ));
}
