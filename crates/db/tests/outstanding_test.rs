//! Integration tests for the unpaid views.

mod common;

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::DatabaseConnection;

use branchledger_core::BillingPeriod;
use branchledger_db::repositories::OutstandingRepository;
use branchledger_db::SchemaRegistry;
use common::{admin, exec, member, party, setup_db};

async fn sale(db: &DatabaseConnection, customer: i32, branch: i32, total: i64, paid: i64) {
    exec(
        db,
        &format!(
            "INSERT INTO sales (branch_id, customer_id, total_minor, paid_minor, sale_date) \
             VALUES ({branch}, {customer}, {total}, {paid}, '2026-02-10')"
        ),
    )
    .await;
}

async fn purchase(db: &DatabaseConnection, supplier: i32, total: i64, paid: i64, day: u32) {
    exec(
        db,
        &format!(
            "INSERT INTO purchases (branch_id, supplier_id, reference, total_minor, paid_minor, purchase_date) \
             VALUES (1, {supplier}, 'PO-{day}', {total}, {paid}, '2026-03-{day:02}')"
        ),
    )
    .await;
}

async fn customer_receipt(db: &DatabaseConnection, customer: i32, amount: i64) {
    exec(
        db,
        &format!(
            "INSERT INTO customer_receipts (branch_id, customer_id, account_id, amount_minor, receipt_date, created_by) \
             VALUES (1, {customer}, 1, {amount}, '2026-02-20', 7)"
        ),
    )
    .await;
}

async fn ledger_row(db: &DatabaseConnection, customer: i32, debit: i64, credit: i64, day: &str) {
    exec(
        db,
        &format!(
            "INSERT INTO customer_ledger \
             (branch_id, customer_id, debit_minor, credit_minor, reference_type, entry_date, created_by, created_at) \
             VALUES (1, {customer}, {debit}, {credit}, 'sale', '{day}', 7, '2026-03-01T00:00:00+00:00')"
        ),
    )
    .await;
}

fn repo(db: &DatabaseConnection) -> OutstandingRepository {
    OutstandingRepository::new(db.clone(), Arc::new(SchemaRegistry::default()))
}

#[tokio::test]
async fn test_unpaid_customers_prefers_positive_column() {
    let db = setup_db().await;
    party(&db, "customers", 1, 1, 50_000).await;
    party(&db, "customers", 2, 1, 0).await;
    party(&db, "customers", 3, 1, 0).await;
    party(&db, "customers", 4, 2, 90_000).await;
    sale(&db, 1, 1, 10_000, 0).await;
    sale(&db, 2, 1, 30_000, 10_000).await;
    customer_receipt(&db, 2, 5_000).await;
    customer_receipt(&db, 3, 8_000).await;

    let unpaid = repo(&db).unpaid_customers(&member(), None).await.unwrap();

    assert_eq!(unpaid.len(), 2);
    assert_eq!(unpaid[0].party_id, 1);
    assert_eq!(unpaid[0].outstanding, dec!(500));
    assert_eq!(unpaid[0].derived_balance, dec!(100));
    assert_eq!(unpaid[1].party_id, 2);
    assert_eq!(unpaid[1].column_balance, Decimal::ZERO);
    assert_eq!(unpaid[1].derived_balance, dec!(150));
    assert_eq!(unpaid[1].outstanding, dec!(150));

    let everyone = repo(&db).unpaid_customers(&admin(), None).await.unwrap();
    assert_eq!(everyone.len(), 3);
    assert!(everyone.iter().all(|row| row.outstanding > Decimal::ZERO));
}

#[tokio::test]
async fn test_monthly_view_uses_ledger_window() {
    let db = setup_db().await;
    party(&db, "customers", 1, 1, 0).await;
    party(&db, "customers", 2, 1, 0).await;
    ledger_row(&db, 1, 40_000, 10_000, "2026-03-05").await;
    ledger_row(&db, 1, 99_000, 0, "2026-04-01").await;
    ledger_row(&db, 2, 0, 20_000, "2026-03-06").await;

    let march = BillingPeriod::new(2026, 3).unwrap();
    let unpaid = repo(&db)
        .unpaid_customers(&member(), Some(march))
        .await
        .unwrap();

    assert_eq!(unpaid.len(), 1);
    assert_eq!(unpaid[0].party_id, 1);
    assert_eq!(unpaid[0].derived_balance, dec!(300));
    assert_eq!(unpaid[0].outstanding, dec!(300));
}

#[tokio::test]
async fn test_unpaid_suppliers_from_purchases() {
    let db = setup_db().await;
    party(&db, "suppliers", 1, 1, 0).await;
    party(&db, "suppliers", 2, 1, 0).await;
    purchase(&db, 1, 20_000, 5_000, 3).await;
    purchase(&db, 2, 10_000, 10_000, 4).await;

    let unpaid = repo(&db).unpaid_suppliers(&member(), None).await.unwrap();

    assert_eq!(unpaid.len(), 1);
    assert_eq!(unpaid[0].party_id, 1);
    assert_eq!(unpaid[0].outstanding, dec!(150));
}

#[tokio::test]
async fn test_outstanding_purchases() {
    let db = setup_db().await;
    purchase(&db, 1, 20_000, 5_000, 3).await;
    purchase(&db, 1, 10_000, 10_000, 4).await;
    purchase(&db, 2, 7_500, 0, 2).await;

    let all = repo(&db).outstanding_purchases(&member(), None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].purchase.supplier_id, Some(2));
    assert_eq!(all[0].unpaid, dec!(75));

    let first = repo(&db)
        .outstanding_purchases(&member(), Some(1))
        .await
        .unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].unpaid, dec!(150));
}
