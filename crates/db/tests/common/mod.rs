//! Shared fixtures for the repository integration tests.
//!
//! Every test gets its own migrated in-memory SQLite database.

#![allow(dead_code)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Statement};
use sea_orm_migration::MigratorTrait;

use branchledger_db::entities::accounts;
use branchledger_db::migration::Migrator;
use branchledger_db::repositories::{AccountRepository, CreateAccountInput};
use branchledger_shared::types::{BranchId, BranchScope, UserId};

/// Acting user for every write.
pub const ACTOR: Option<UserId> = Some(UserId(7));

pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");
    Migrator::up(&db, None).await.expect("Failed to migrate");
    db
}

/// Regular user of branch 1.
pub fn member() -> BranchScope {
    BranchScope::member(BranchId(1), vec![BranchId(1)])
}

/// Regular user of branch 2 only.
pub fn outsider() -> BranchScope {
    BranchScope::member(BranchId(2), vec![BranchId(2)])
}

/// Administrator whose primary branch is 1.
pub fn admin() -> BranchScope {
    BranchScope::admin(BranchId(1))
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub async fn exec(db: &DatabaseConnection, sql: &str) {
    db.execute(Statement::from_string(db.get_database_backend(), sql))
        .await
        .unwrap_or_else(|e| panic!("{sql}: {e}"));
}

/// Creates an account in `branch` funded with `opening`.
pub async fn account(db: &DatabaseConnection, branch: i32, name: &str, opening: Decimal) -> i32 {
    AccountRepository::new(db.clone())
        .create_account(
            &admin(),
            ACTOR,
            CreateAccountInput {
                branch_id: Some(BranchId(branch)),
                name: name.to_string(),
                opening_balance: opening,
                opened_on: date(2026, 1, 1),
            },
        )
        .await
        .expect("Failed to create account")
        .id
}

pub async fn balance(db: &DatabaseConnection, account_id: i32) -> Decimal {
    accounts::Entity::find_by_id(account_id)
        .one(db)
        .await
        .unwrap()
        .expect("account exists")
        .balance()
}

/// Inserts a customer or supplier with its balance column in minor units.
pub async fn party(db: &DatabaseConnection, table: &str, id: i32, branch: i32, balance_minor: i64) {
    exec(
        db,
        &format!(
            "INSERT INTO {table} (id, branch_id, name, remaining_balance) \
             VALUES ({id}, {branch}, '{table} {id}', {balance_minor})"
        ),
    )
    .await;
}

pub async fn count(db: &DatabaseConnection, table: &str) -> i64 {
    let row = db
        .query_one(Statement::from_string(
            db.get_database_backend(),
            format!("SELECT COUNT(*) AS n FROM {table}"),
        ))
        .await
        .unwrap()
        .expect("count row");
    row.try_get("", "n").unwrap()
}
