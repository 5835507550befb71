//! Integration tests for customer and supplier receipts.

mod common;

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use branchledger_core::{AccessError, PartyKind};
use branchledger_db::balance::party_balance;
use branchledger_db::ledger::{count_for_reference, ledger_lines};
use branchledger_db::repositories::{
    CreateReceiptInput, ReceiptError, ReceiptFilter, ReceiptRepository, UpdateReceiptInput,
};
use branchledger_db::SchemaRegistry;
use branchledger_shared::types::FieldUpdate;
use common::{account, balance, count, date, exec, member, outsider, party, setup_db, ACTOR};

fn receipt(party_id: Option<i32>, account_id: i32, amount: Decimal) -> CreateReceiptInput {
    CreateReceiptInput {
        branch_id: None,
        party_id,
        account_id,
        amount,
        receipt_date: date(2026, 3, 15),
        note: None,
    }
}

#[tokio::test]
async fn test_customer_receipt_posts_every_side() {
    let db = setup_db().await;
    let cash = account(&db, 1, "Cash", dec!(0)).await;
    party(&db, "customers", 1, 1, 50_000).await;
    let registry = Arc::new(SchemaRegistry::default());
    let repo = ReceiptRepository::new(db.clone(), registry.clone());

    let created = repo
        .create_receipt(&member(), ACTOR, PartyKind::Customer, receipt(Some(1), cash, dec!(120)))
        .await
        .unwrap();

    assert_eq!(balance(&db, cash).await, dec!(120));
    assert_eq!(
        party_balance(&db, &registry, PartyKind::Customer, 1).await.unwrap(),
        Some(dec!(380))
    );
    let lines = ledger_lines(&db, PartyKind::Customer, 1, None).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].credit, dec!(120));
    assert_eq!(lines[0].debit, Decimal::ZERO);
    assert_eq!(
        count_for_reference(&db, PartyKind::Customer, "customer_receipt", created.id)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_supplier_receipt_pays_out() {
    let db = setup_db().await;
    let bank = account(&db, 1, "Bank", dec!(1000)).await;
    party(&db, "suppliers", 3, 1, 40_000).await;
    let registry = Arc::new(SchemaRegistry::default());
    let repo = ReceiptRepository::new(db.clone(), registry.clone());

    repo.create_receipt(&member(), ACTOR, PartyKind::Supplier, receipt(Some(3), bank, dec!(150)))
        .await
        .unwrap();

    assert_eq!(balance(&db, bank).await, dec!(850));
    assert_eq!(
        party_balance(&db, &registry, PartyKind::Supplier, 3).await.unwrap(),
        Some(dec!(250))
    );
    let lines = ledger_lines(&db, PartyKind::Supplier, 3, None).await.unwrap();
    assert_eq!(lines[0].debit, dec!(150));
}

#[tokio::test]
async fn test_walk_in_receipt_touches_only_the_account() {
    let db = setup_db().await;
    let cash = account(&db, 1, "Cash", dec!(0)).await;
    let repo = ReceiptRepository::new(db.clone(), Arc::new(SchemaRegistry::default()));

    repo.create_receipt(&member(), ACTOR, PartyKind::Customer, receipt(None, cash, dec!(30)))
        .await
        .unwrap();

    assert_eq!(balance(&db, cash).await, dec!(30));
    assert_eq!(count(&db, "customer_ledger").await, 0);
}

#[tokio::test]
async fn test_party_balance_is_clamped_at_zero() {
    let db = setup_db().await;
    let cash = account(&db, 1, "Cash", dec!(0)).await;
    party(&db, "customers", 1, 1, 10_000).await;
    let registry = Arc::new(SchemaRegistry::default());
    let repo = ReceiptRepository::new(db.clone(), registry.clone());

    repo.create_receipt(&member(), ACTOR, PartyKind::Customer, receipt(Some(1), cash, dec!(250)))
        .await
        .unwrap();

    assert_eq!(
        party_balance(&db, &registry, PartyKind::Customer, 1).await.unwrap(),
        Some(Decimal::ZERO)
    );
    assert_eq!(balance(&db, cash).await, dec!(250));
}

#[tokio::test]
async fn test_failed_ledger_write_leaves_nothing_behind() {
    let db = setup_db().await;
    let cash = account(&db, 1, "Cash", dec!(100)).await;
    party(&db, "customers", 1, 1, 50_000).await;
    let registry = Arc::new(SchemaRegistry::default());
    let repo = ReceiptRepository::new(db.clone(), registry.clone());
    exec(&db, "DROP TABLE customer_ledger").await;

    let err = repo
        .create_receipt(&member(), ACTOR, PartyKind::Customer, receipt(Some(1), cash, dec!(75)))
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "DATABASE_ERROR");
    assert_eq!(balance(&db, cash).await, dec!(100));
    assert_eq!(count(&db, "customer_receipts").await, 0);
    assert_eq!(count(&db, "account_transactions").await, 1);
    assert_eq!(
        party_balance(&db, &registry, PartyKind::Customer, 1).await.unwrap(),
        Some(dec!(500))
    );
}

#[tokio::test]
async fn test_update_and_delete_compensate() {
    let db = setup_db().await;
    let cash = account(&db, 1, "Cash", dec!(0)).await;
    party(&db, "customers", 1, 1, 50_000).await;
    let registry = Arc::new(SchemaRegistry::default());
    let repo = ReceiptRepository::new(db.clone(), registry.clone());

    let created = repo
        .create_receipt(&member(), ACTOR, PartyKind::Customer, receipt(Some(1), cash, dec!(100)))
        .await
        .unwrap();
    repo.update_receipt(
        &member(),
        ACTOR,
        PartyKind::Customer,
        created.id,
        UpdateReceiptInput {
            amount: FieldUpdate::SetTo(dec!(60)),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(balance(&db, cash).await, dec!(60));
    assert_eq!(
        party_balance(&db, &registry, PartyKind::Customer, 1).await.unwrap(),
        Some(dec!(440))
    );

    let deleted = repo
        .delete_receipt(&member(), ACTOR, PartyKind::Customer, created.id)
        .await
        .unwrap();
    assert_eq!(deleted.deleted, 1);
    assert_eq!(balance(&db, cash).await, Decimal::ZERO);
    assert_eq!(
        party_balance(&db, &registry, PartyKind::Customer, 1).await.unwrap(),
        Some(dec!(500))
    );

    // original, update reversal, update reapply, delete reversal
    let lines = ledger_lines(&db, PartyKind::Customer, 1, None).await.unwrap();
    assert_eq!(lines.len(), 4);
    let net: Decimal = lines.iter().map(|l| l.credit - l.debit).sum();
    assert_eq!(net, Decimal::ZERO);
}

#[tokio::test]
async fn test_legacy_balance_column_is_probed() {
    let db = setup_db().await;
    let cash = account(&db, 1, "Cash", dec!(0)).await;
    party(&db, "customers", 1, 1, 30_000).await;
    exec(&db, "ALTER TABLE customers RENAME COLUMN remaining_balance TO open_balance").await;
    let registry = Arc::new(SchemaRegistry::default());
    let repo = ReceiptRepository::new(db.clone(), registry.clone());

    repo.create_receipt(&member(), ACTOR, PartyKind::Customer, receipt(Some(1), cash, dec!(100)))
        .await
        .unwrap();

    assert_eq!(
        registry.balance_column(&db, PartyKind::Customer).await.unwrap(),
        "open_balance"
    );
    assert_eq!(
        party_balance(&db, &registry, PartyKind::Customer, 1).await.unwrap(),
        Some(dec!(200))
    );
}

#[tokio::test]
async fn test_pinned_column_skips_probe() {
    let db = setup_db().await;
    exec(&db, "ALTER TABLE suppliers RENAME COLUMN remaining_balance TO open_balance").await;
    let registry = SchemaRegistry::new(1).pin("suppliers", "open_balance");

    assert_eq!(
        registry.balance_column(&db, PartyKind::Supplier).await.unwrap(),
        "open_balance"
    );
    assert_eq!(
        registry.balance_column(&db, PartyKind::Customer).await.unwrap(),
        "remaining_balance"
    );
}

#[tokio::test]
async fn test_receipts_are_branch_scoped() {
    let db = setup_db().await;
    let cash = account(&db, 1, "Cash", dec!(0)).await;
    let repo = ReceiptRepository::new(db.clone(), Arc::new(SchemaRegistry::default()));

    let created = repo
        .create_receipt(&member(), ACTOR, PartyKind::Customer, receipt(None, cash, dec!(10)))
        .await
        .unwrap();

    let err = repo
        .delete_receipt(&outsider(), ACTOR, PartyKind::Customer, created.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ReceiptError::Access(AccessError::BranchForbidden(_))));
    assert!(repo
        .list_receipts(&outsider(), PartyKind::Customer, ReceiptFilter::default())
        .await
        .unwrap()
        .is_empty());

    let err = repo
        .create_receipt(&member(), None, PartyKind::Customer, receipt(None, cash, dec!(10)))
        .await
        .unwrap_err();
    assert!(matches!(err, ReceiptError::Access(AccessError::MissingActor)));
}
