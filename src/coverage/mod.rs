pub mod arrears;
pub mod calendar;
pub mod chronology;

use chrono::NaiveDate;

use crate::decimal::Money;
use crate::loan::{Loan, Payment};

pub use arrears::{ArrearsCalculator, ArrearsResult};
pub use calendar::{evaluation_cutoff, week_index_of, week_of, weeks_between, WeekBucket, WeekCalendar};
pub use chronology::{Chronology, ChronologyBuilder, ChronologyItem, ChronologySummary};

/// one enumerated week and the payments that landed in it
#[derive(Debug, Clone)]
pub struct WeekEntry<'a> {
    pub bucket: WeekBucket,
    /// ordered by timestamp, ties in recorded order
    pub payments: Vec<&'a Payment>,
}

impl WeekEntry<'_> {
    pub fn total(&self) -> Money {
        self.payments.iter().map(|p| p.amount).sum()
    }

    pub fn has_payments(&self) -> bool {
        !self.payments.is_empty()
    }
}

/// group a loan's payments into weeks 0..=cutoff
///
/// Payments dated after `cutoff` are left out; every week in range gets an
/// entry, paid or not.
pub fn weekly_ledger(loan: &Loan, cutoff: NaiveDate) -> Vec<WeekEntry<'_>> {
    let sign_day = loan.sign_day();
    let mut entries: Vec<WeekEntry<'_>> = weeks_between(sign_day, cutoff)
        .into_iter()
        .map(|bucket| WeekEntry {
            bucket,
            payments: Vec::new(),
        })
        .collect();

    for payment in loan.sorted_payments() {
        let date = payment.date();
        if date > cutoff {
            continue;
        }

        if let Some(entry) = week_index_of(sign_day, date).and_then(|i| entries.get_mut(i as usize)) {
            entry.payments.push(payment);
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_ledger_groups_by_week() {
        let loan = Loan::builder()
            .sign_date(at(2024, 1, 3))
            .payment(Payment::new(Money::from_major(100), at(2024, 1, 9)))
            .payment(Payment::new(Money::from_major(50), at(2024, 1, 5)))
            .payment(Payment::new(Money::from_major(200), at(2024, 1, 14)))
            .payment(Payment::new(Money::from_major(300), at(2024, 1, 23)))
            .build()
            .unwrap();

        let ledger = weekly_ledger(&loan, NaiveDate::from_ymd_opt(2024, 1, 21).unwrap());

        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger[0].total(), Money::from_major(50));
        assert_eq!(ledger[1].total(), Money::from_major(300));
        assert_eq!(ledger[1].payments.len(), 2);
        assert!(!ledger[2].has_payments());
    }

    #[test]
    fn test_ledger_drops_payments_after_cutoff_within_week() {
        let loan = Loan::builder()
            .sign_date(at(2024, 1, 3))
            .payment(Payment::new(Money::from_major(100), at(2024, 1, 10)))
            .payment(Payment::new(Money::from_major(100), at(2024, 1, 12)))
            .build()
            .unwrap();

        let ledger = weekly_ledger(&loan, NaiveDate::from_ymd_opt(2024, 1, 11).unwrap());

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger[1].total(), Money::from_major(100));
    }
}
