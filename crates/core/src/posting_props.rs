//! Property-based tests for leg derivation.
//!
//! - Transfer invariant: source loses exactly what the destination gains
//! - Transfer update: reverse-then-reapply equals posting the new pair alone
//! - Receipt zero-sum: every side records exactly the receipt amount

use std::collections::HashMap;

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::party::PartyKind;
use super::posting::{AccountLeg, ReceiptPosting, TransferPosting};

/// Strategy to generate positive decimal amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate party kinds.
fn party_kind() -> impl Strategy<Value = PartyKind> {
    prop_oneof![Just(PartyKind::Customer), Just(PartyKind::Supplier)]
}

/// Helper applying legs to an in-memory balance book.
fn apply(book: &mut HashMap<i32, Decimal>, legs: &[AccountLeg]) {
    for leg in legs {
        *book.entry(leg.account_id).or_insert(Decimal::ZERO) += leg.delta;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Posting a transfer moves the amount from source to destination.
    #[test]
    fn prop_transfer_invariant(
        from_balance in positive_amount(),
        to_balance in positive_amount(),
        amount in positive_amount(),
    ) {
        let posting = TransferPosting::new(1, 2, amount).unwrap();
        let mut book = HashMap::from([(1, from_balance), (2, to_balance)]);
        apply(&mut book, &posting.legs());

        prop_assert_eq!(book[&1], from_balance - amount);
        prop_assert_eq!(book[&2], to_balance + amount);
        prop_assert_eq!(book[&1] + book[&2], from_balance + to_balance);
    }

    /// Updating a posted transfer never compounds the old amount.
    #[test]
    fn prop_transfer_update_reversal(
        old_amount in positive_amount(),
        new_amount in positive_amount(),
        new_to in 2i32..4,
    ) {
        let old = TransferPosting::new(1, 2, old_amount).unwrap();
        let new = TransferPosting::new(1, new_to, new_amount).unwrap();

        let mut updated = HashMap::new();
        apply(&mut updated, &old.legs());
        apply(&mut updated, &old.reversal_legs());
        apply(&mut updated, &new.legs());

        let mut direct = HashMap::new();
        apply(&mut direct, &new.legs());

        for account in 1..4 {
            prop_assert_eq!(
                updated.get(&account).copied().unwrap_or_default(),
                direct.get(&account).copied().unwrap_or_default()
            );
        }
    }

    /// Every receipt side records the receipt amount, and reversal cancels it.
    #[test]
    fn prop_receipt_zero_sum(
        kind in party_kind(),
        has_party in any::<bool>(),
        amount in positive_amount(),
    ) {
        let posting = ReceiptPosting::new(kind, 7, has_party, amount).unwrap();
        prop_assert!(posting.verify().is_ok());
        prop_assert_eq!(posting.account.delta.abs(), amount);
        if let Some(line) = posting.ledger {
            prop_assert_eq!(line.total(), amount);
        }

        let reversed = posting.reversed();
        prop_assert_eq!(posting.account.delta + reversed.account.delta, Decimal::ZERO);
        prop_assert_eq!(
            posting.party_delta.unwrap_or_default() + reversed.party_delta.unwrap_or_default(),
            Decimal::ZERO
        );
    }
}
