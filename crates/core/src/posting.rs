//! Double-entry leg derivation.
//!
//! Each business event is turned into the exact set of balance changes it
//! causes. The db crate applies these legs inside one transaction and never
//! computes a delta on its own.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::balance::ensure_positive;
use crate::error::PostingError;
use crate::party::PartyKind;

/// Signed change to one account balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLeg {
    /// The account.
    pub account_id: i32,
    /// Positive adds money, negative removes it.
    pub delta: Decimal,
}

impl AccountLeg {
    /// Money leaving the account.
    #[must_use]
    pub fn debit(account_id: i32, amount: Decimal) -> Self {
        Self {
            account_id,
            delta: -amount,
        }
    }

    /// Money entering the account.
    #[must_use]
    pub const fn credit(account_id: i32, amount: Decimal) -> Self {
        Self {
            account_id,
            delta: amount,
        }
    }

    /// The leg that undoes this one.
    #[must_use]
    pub fn reversed(self) -> Self {
        Self {
            account_id: self.account_id,
            delta: -self.delta,
        }
    }

    /// Audit label for the account transaction row.
    #[must_use]
    pub fn direction(&self) -> &'static str {
        if self.delta.is_sign_negative() {
            "withdrawal"
        } else {
            "deposit"
        }
    }
}

/// Money moved between two accounts of the same branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPosting {
    from: i32,
    to: i32,
    amount: Decimal,
}

impl TransferPosting {
    /// Validates a transfer pair.
    pub fn new(from: i32, to: i32, amount: Decimal) -> Result<Self, PostingError> {
        if from == to {
            return Err(PostingError::SameAccountTransfer(from));
        }
        let amount = ensure_positive(amount, "amount")?;
        Ok(Self { from, to, amount })
    }

    /// Source account.
    #[must_use]
    pub const fn from_account(&self) -> i32 {
        self.from
    }

    /// Destination account.
    #[must_use]
    pub const fn to_account(&self) -> i32 {
        self.to
    }

    /// Amount moved.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// Debit the source, credit the destination.
    #[must_use]
    pub fn legs(&self) -> [AccountLeg; 2] {
        [
            AccountLeg::debit(self.from, self.amount),
            AccountLeg::credit(self.to, self.amount),
        ]
    }

    /// Credit the source, debit the destination.
    #[must_use]
    pub fn reversal_legs(&self) -> [AccountLeg; 2] {
        let [from, to] = self.legs();
        [from.reversed(), to.reversed()]
    }
}

/// Debit/credit pair recorded on a party ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerLine {
    /// Increases what the party owes (customer) or decreases what is owed to it (supplier).
    pub debit: Decimal,
    /// The opposite side.
    pub credit: Decimal,
}

impl LedgerLine {
    /// Total recorded by the line.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.debit + self.credit
    }

    /// The line that cancels this one.
    #[must_use]
    pub const fn reversed(self) -> Self {
        Self {
            debit: self.credit,
            credit: self.debit,
        }
    }
}

/// Effects of one customer or supplier receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptPosting {
    /// Counterparty kind.
    pub kind: PartyKind,
    /// Business amount.
    pub amount: Decimal,
    /// Change to the paying/receiving account.
    pub account: AccountLeg,
    /// Change to the party's outstanding balance, absent for walk-in parties.
    pub party_delta: Option<Decimal>,
    /// Row appended to the party ledger, absent for walk-in parties.
    pub ledger: Option<LedgerLine>,
}

impl ReceiptPosting {
    /// Derives the effects of a receipt.
    ///
    /// Customer receipts bring money in and credit the customer ledger.
    /// Supplier receipts pay money out and debit the supplier ledger. Both
    /// reduce the party's outstanding balance.
    pub fn new(
        kind: PartyKind,
        account_id: i32,
        has_party: bool,
        amount: Decimal,
    ) -> Result<Self, PostingError> {
        let amount = ensure_positive(amount, "amount")?;
        let account = match kind {
            PartyKind::Customer => AccountLeg::credit(account_id, amount),
            PartyKind::Supplier => AccountLeg::debit(account_id, amount),
        };
        let ledger = has_party.then_some(match kind {
            PartyKind::Customer => LedgerLine {
                debit: Decimal::ZERO,
                credit: amount,
            },
            PartyKind::Supplier => LedgerLine {
                debit: amount,
                credit: Decimal::ZERO,
            },
        });
        let posting = Self {
            kind,
            amount,
            account,
            party_delta: has_party.then_some(-amount),
            ledger,
        };
        posting.verify()?;
        Ok(posting)
    }

    /// The effects that undo this receipt.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            kind: self.kind,
            amount: self.amount,
            account: self.account.reversed(),
            party_delta: self.party_delta.map(|d| -d),
            ledger: self.ledger.map(LedgerLine::reversed),
        }
    }

    /// Checks that every side records exactly the receipt amount.
    pub fn verify(&self) -> Result<(), PostingError> {
        let unbalanced = |legs| PostingError::UnbalancedPosting {
            amount: self.amount,
            legs,
        };
        if self.account.delta.abs() != self.amount {
            return Err(unbalanced(self.account.delta.abs()));
        }
        if let Some(line) = self.ledger
            && line.total() != self.amount
        {
            return Err(unbalanced(line.total()));
        }
        if let Some(delta) = self.party_delta
            && delta.abs() != self.amount
        {
            return Err(unbalanced(delta.abs()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transfer_rejects_same_account() {
        assert_eq!(
            TransferPosting::new(4, 4, dec!(10)),
            Err(PostingError::SameAccountTransfer(4))
        );
    }

    #[test]
    fn test_transfer_rejects_non_positive() {
        assert!(TransferPosting::new(1, 2, Decimal::ZERO).is_err());
        assert!(TransferPosting::new(1, 2, dec!(-3)).is_err());
    }

    #[test]
    fn test_transfer_legs() {
        let posting = TransferPosting::new(1, 2, dec!(100)).unwrap();
        assert_eq!(
            posting.legs(),
            [
                AccountLeg {
                    account_id: 1,
                    delta: dec!(-100)
                },
                AccountLeg {
                    account_id: 2,
                    delta: dec!(100)
                },
            ]
        );
        assert_eq!(
            posting.reversal_legs(),
            [
                AccountLeg {
                    account_id: 1,
                    delta: dec!(100)
                },
                AccountLeg {
                    account_id: 2,
                    delta: dec!(-100)
                },
            ]
        );
    }

    #[test]
    fn test_customer_receipt() {
        let posting = ReceiptPosting::new(PartyKind::Customer, 9, true, dec!(75.50)).unwrap();
        assert_eq!(posting.account, AccountLeg::credit(9, dec!(75.50)));
        assert_eq!(posting.account.direction(), "deposit");
        assert_eq!(posting.party_delta, Some(dec!(-75.50)));
        assert_eq!(
            posting.ledger,
            Some(LedgerLine {
                debit: Decimal::ZERO,
                credit: dec!(75.50)
            })
        );
    }

    #[test]
    fn test_supplier_receipt() {
        let posting = ReceiptPosting::new(PartyKind::Supplier, 9, true, dec!(40)).unwrap();
        assert_eq!(posting.account, AccountLeg::debit(9, dec!(40)));
        assert_eq!(posting.account.direction(), "withdrawal");
        assert_eq!(posting.party_delta, Some(dec!(-40)));
        assert_eq!(posting.ledger.map(|l| l.debit), Some(dec!(40)));
    }

    #[test]
    fn test_walk_in_receipt_touches_only_the_account() {
        let posting = ReceiptPosting::new(PartyKind::Customer, 9, false, dec!(12)).unwrap();
        assert!(posting.party_delta.is_none());
        assert!(posting.ledger.is_none());
        assert_eq!(posting.account.delta, dec!(12));
    }

    #[test]
    fn test_receipt_reversal_cancels() {
        let posting = ReceiptPosting::new(PartyKind::Customer, 9, true, dec!(30)).unwrap();
        let reversed = posting.reversed();
        assert_eq!(posting.account.delta + reversed.account.delta, Decimal::ZERO);
        assert_eq!(
            posting.party_delta.unwrap() + reversed.party_delta.unwrap(),
            Decimal::ZERO
        );
        let (a, b) = (posting.ledger.unwrap(), reversed.ledger.unwrap());
        assert_eq!(a.debit - a.credit + b.debit - b.credit, Decimal::ZERO);
        assert!(reversed.verify().is_ok());
    }

    #[test]
    fn test_verify_catches_unbalanced_legs() {
        let mut posting = ReceiptPosting::new(PartyKind::Supplier, 1, true, dec!(10)).unwrap();
        posting.ledger = Some(LedgerLine {
            debit: dec!(9),
            credit: Decimal::ZERO,
        });
        assert_eq!(
            posting.verify(),
            Err(PostingError::UnbalancedPosting {
                amount: dec!(10),
                legs: dec!(9)
            })
        );
    }
}
