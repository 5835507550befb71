//! Calendar periods for recurring charges.

use chrono::{Datelike, Months, NaiveDate};
use crate::error::PostingError;

/// One calendar month.
///
/// Recurring charges are unique per (template, period).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BillingPeriod {
    year: i32,
    month: u32,
    first_day: NaiveDate,
    last_day: NaiveDate,
}

impl BillingPeriod {
    /// Builds the period for a year and 1-based month.
    pub fn new(year: i32, month: u32) -> Result<Self, PostingError> {
        let invalid = PostingError::InvalidPeriod { year, month };
        let first_day = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| invalid.clone())?;
        let last_day = first_day
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or(invalid)?;
        Ok(Self {
            year,
            month,
            first_day,
            last_day,
        })
    }

    /// The period a date falls in.
    pub fn containing(date: NaiveDate) -> Result<Self, PostingError> {
        Self::new(date.year(), date.month())
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Calendar month (1-12).
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month.
    #[must_use]
    pub const fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    /// Last day of the month (inclusive).
    #[must_use]
    pub const fn last_day(&self) -> NaiveDate {
        self.last_day
    }

    /// Returns true if the date falls in this period.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.first_day && date <= self.last_day
    }
}

impl std::fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(date(2026, 3, 17), 2026, 3, date(2026, 3, 31))]
    #[case(date(2026, 2, 1), 2026, 2, date(2026, 2, 28))]
    #[case(date(2028, 2, 29), 2028, 2, date(2028, 2, 29))]
    #[case(date(2026, 12, 31), 2026, 12, date(2026, 12, 31))]
    fn test_containing(
        #[case] day: NaiveDate,
        #[case] year: i32,
        #[case] month: u32,
        #[case] last: NaiveDate,
    ) {
        let period = BillingPeriod::containing(day).unwrap();
        assert_eq!(period.year(), year);
        assert_eq!(period.month(), month);
        assert_eq!(period.first_day(), date(year, month, 1));
        assert_eq!(period.last_day(), last);
        assert!(period.contains(day));
    }

    #[test]
    fn test_invalid_month() {
        assert_eq!(
            BillingPeriod::new(2026, 13),
            Err(PostingError::InvalidPeriod {
                year: 2026,
                month: 13
            })
        );
        assert!(BillingPeriod::new(2026, 0).is_err());
    }

    #[test]
    fn test_contains_excludes_neighbours() {
        let period = BillingPeriod::new(2026, 4).unwrap();
        assert!(!period.contains(date(2026, 3, 31)));
        assert!(!period.contains(date(2026, 5, 1)));
        assert_eq!(period.to_string(), "2026-04");
    }
}
