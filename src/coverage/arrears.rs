use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::errors::Result;
use crate::events::{Event, EventStore};
use crate::loan::Loan;
use crate::types::{LoanId, LoanStanding, WeekMode};

use super::calendar::evaluation_cutoff;
use super::weekly_ledger;

/// arrears (VDO) snapshot for one loan at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrearsResult {
    pub loan_id: LoanId,
    pub mode: WeekMode,
    /// last calendar day included in the window
    pub cutoff: NaiveDate,
    pub expected_weekly_payment: Money,
    pub weeks_requiring_payment: u32,
    pub weeks_without_payment: u32,
    pub total_expected: Money,
    pub total_paid_in_period: Money,
    pub total_paid_overall: Money,
    pub total_debt: Money,
    pub pending_amount: Money,
    /// arrears, capped by what is still owed
    pub arrears_amount: Money,
    /// paid beyond the expected total (abono parcial)
    pub partial_payment: Money,
    /// no installment could be derived but payments exist
    pub degenerate_schedule: bool,
}

impl ArrearsResult {
    pub fn is_in_arrears(&self) -> bool {
        self.weeks_without_payment > 0
    }

    pub fn standing(&self) -> LoanStanding {
        if self.total_debt.is_positive() && self.pending_amount.is_zero() {
            LoanStanding::Settled
        } else if self.is_in_arrears() {
            LoanStanding::InArrears
        } else {
            LoanStanding::Current
        }
    }
}

/// calculator for weeks without payment and arrears amount
#[derive(Debug, Clone, Default)]
pub struct ArrearsCalculator {
    config: EngineConfig,
}

impl ArrearsCalculator {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// evaluate at the provider's current instant
    pub fn calculate(&self, loan: &Loan, time_provider: &SafeTimeProvider) -> Result<ArrearsResult> {
        self.calculate_at(loan, time_provider.now())
    }

    /// evaluate at an explicit instant
    pub fn calculate_at(&self, loan: &Loan, now: DateTime<Utc>) -> Result<ArrearsResult> {
        loan.validate()?;

        let mode = self.config.week_mode;
        let cutoff = evaluation_cutoff(now, mode);
        let ledger = weekly_ledger(loan, cutoff);
        let expected_weekly = loan.expected_weekly_payment();

        let weeks_requiring_payment = ledger
            .iter()
            .filter(|entry| !entry.bucket.is_grace(self.config.grace_weeks))
            .count() as u32;

        // grace-week payments count here as early payment
        let total_paid_in_period: Money = ledger.iter().map(|entry| entry.total()).sum();
        let total_expected = expected_weekly.times(weeks_requiring_payment);

        let deficit = total_expected.saturating_sub(total_paid_in_period);
        let weeks_without_payment = if expected_weekly.is_positive() {
            deficit.ceil_multiples_of(expected_weekly).unwrap_or(0)
        } else {
            0
        };
        let surplus = total_paid_in_period.saturating_sub(total_expected);

        let total_debt = loan.total_debt();
        let total_paid_overall = loan.total_paid();
        let pending_amount = total_debt.saturating_sub(total_paid_overall);
        let arrears_amount = expected_weekly.times(weeks_without_payment).min(pending_amount);

        let degenerate_schedule = !expected_weekly.is_positive() && !loan.payments.is_empty();
        if degenerate_schedule {
            warn!(
                "loan {} has no weekly installment; treating {} in payments as surplus",
                loan.id, total_paid_overall
            );
        }

        debug!(
            "loan {} arrears through {} ({:?}): {} weeks due, expected {}, paid {}, {} weeks without payment, arrears {}",
            loan.id,
            cutoff,
            mode,
            weeks_requiring_payment,
            total_expected,
            total_paid_in_period,
            weeks_without_payment,
            arrears_amount
        );

        Ok(ArrearsResult {
            loan_id: loan.id,
            mode,
            cutoff,
            expected_weekly_payment: expected_weekly,
            weeks_requiring_payment,
            weeks_without_payment,
            total_expected,
            total_paid_in_period,
            total_paid_overall,
            total_debt,
            pending_amount,
            arrears_amount,
            partial_payment: surplus,
            degenerate_schedule,
        })
    }

    /// evaluate and record the outcome in the audit trail
    pub fn calculate_with_events(
        &self,
        loan: &Loan,
        now: DateTime<Utc>,
        events: &mut EventStore,
    ) -> Result<ArrearsResult> {
        let result = self.calculate_at(loan, now)?;

        if result.degenerate_schedule {
            events.emit(Event::DegenerateSchedule {
                loan_id: loan.id,
                payments_received: result.total_paid_overall,
            });
        }

        events.emit(Event::ArrearsEvaluated {
            loan_id: loan.id,
            mode: result.mode,
            cutoff: result.cutoff,
            weeks_without_payment: result.weeks_without_payment,
            arrears_amount: result.arrears_amount,
            surplus: result.partial_payment,
            evaluated_at: now,
        });

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::loan::Payment;
    use chrono::{Duration, TimeZone};
    use hourglass_rs::TimeSource;

    // wednesday, so week 0 is 2024-01-01..07
    fn sign_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap()
    }

    fn week_day(week: i64, offset_from_monday: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
            + Duration::weeks(week)
            + Duration::days(offset_from_monday)
    }

    fn loan_with(payments: Vec<Payment>) -> Loan {
        // 3000 at 40% over 14 weeks → 300 a week
        Loan::builder()
            .sign_date(sign_date())
            .requested_amount(Money::from_major(3_000))
            .rate(Rate::from_percentage(40))
            .week_duration(14)
            .payments(payments)
            .build()
            .unwrap()
    }

    #[test]
    fn test_all_weeks_paid() {
        let loan = loan_with(
            (1..=4)
                .map(|w| Payment::new(Money::from_major(300), week_day(w, 2)))
                .collect(),
        );

        // tuesday of week 5: weeks 1..4 are closed
        let result = ArrearsCalculator::default()
            .calculate_at(&loan, week_day(5, 1))
            .unwrap();

        assert_eq!(result.weeks_requiring_payment, 4);
        assert_eq!(result.weeks_without_payment, 0);
        assert_eq!(result.arrears_amount, Money::ZERO);
        assert_eq!(result.partial_payment, Money::ZERO);
        assert_eq!(result.standing(), LoanStanding::Current);
    }

    #[test]
    fn test_missed_weeks() {
        let loan = loan_with(vec![Payment::new(Money::from_major(300), week_day(1, 0))]);

        let result = ArrearsCalculator::default()
            .calculate_at(&loan, week_day(4, 0))
            .unwrap();

        // weeks 1..3 due, one paid
        assert_eq!(result.weeks_requiring_payment, 3);
        assert_eq!(result.weeks_without_payment, 2);
        assert_eq!(result.arrears_amount, Money::from_major(600));
        assert!(result.is_in_arrears());
    }

    #[test]
    fn test_partial_deficit_rounds_up_to_a_week() {
        let loan = loan_with(vec![
            Payment::new(Money::from_major(300), week_day(1, 0)),
            Payment::new(Money::from_major(100), week_day(2, 0)),
        ]);

        let result = ArrearsCalculator::default()
            .calculate_at(&loan, week_day(3, 0))
            .unwrap();

        // deficit 200 of a 300 week still counts as one week
        assert_eq!(result.weeks_without_payment, 1);
        assert_eq!(result.arrears_amount, Money::from_major(300));
    }

    #[test]
    fn test_grace_week_payment_is_surplus() {
        let loan = loan_with(vec![Payment::new(Money::from_major(300), week_day(0, 4))]);

        // only week 0 closed: nothing due yet
        let result = ArrearsCalculator::default()
            .calculate_at(&loan, week_day(1, 2))
            .unwrap();
        assert_eq!(result.weeks_requiring_payment, 0);
        assert_eq!(result.partial_payment, Money::from_major(300));

        // one week later the advance covers week 1
        let result = ArrearsCalculator::default()
            .calculate_at(&loan, week_day(2, 2))
            .unwrap();
        assert_eq!(result.weeks_requiring_payment, 1);
        assert_eq!(result.weeks_without_payment, 0);
        assert_eq!(result.partial_payment, Money::ZERO);
    }

    #[test]
    fn test_arrears_capped_by_pending() {
        // 4100 paid early against a 4200 debt, then nothing for weeks
        let loan = loan_with(vec![Payment::new(Money::from_major(4_100), week_day(0, 5))]);

        let result = ArrearsCalculator::default()
            .calculate_at(&loan, week_day(20, 0))
            .unwrap();

        assert_eq!(result.weeks_requiring_payment, 19);
        assert!(result.weeks_without_payment > 0);
        assert_eq!(result.pending_amount, Money::from_major(100));
        assert_eq!(result.arrears_amount, Money::from_major(100));
    }

    #[test]
    fn test_next_mode_counts_in_progress_week() {
        let loan = loan_with(vec![
            Payment::new(Money::from_major(300), week_day(1, 0)),
            Payment::new(Money::from_major(300), week_day(2, 1)),
        ]);

        // wednesday of week 2
        let now = week_day(2, 2);

        let current = ArrearsCalculator::new(EngineConfig::strict())
            .calculate_at(&loan, now)
            .unwrap();
        assert_eq!(current.weeks_requiring_payment, 1);
        assert_eq!(current.total_paid_in_period, Money::from_major(300));
        assert_eq!(current.partial_payment, Money::ZERO);

        let next = ArrearsCalculator::new(EngineConfig::lenient())
            .calculate_at(&loan, now)
            .unwrap();
        assert_eq!(next.weeks_requiring_payment, 2);
        assert_eq!(next.total_paid_in_period, Money::from_major(600));
        assert_eq!(next.weeks_without_payment, 0);
    }

    #[test]
    fn test_next_mode_ignores_payments_after_now() {
        let loan = loan_with(vec![Payment::new(Money::from_major(300), week_day(1, 5))]);

        let result = ArrearsCalculator::new(EngineConfig::lenient())
            .calculate_at(&loan, week_day(1, 2))
            .unwrap();

        assert_eq!(result.total_paid_in_period, Money::ZERO);
        assert_eq!(result.weeks_without_payment, 1);
        // the overall total is not window-limited
        assert_eq!(result.total_paid_overall, Money::from_major(300));
    }

    #[test]
    fn test_degenerate_schedule() {
        let loan = Loan::builder()
            .sign_date(sign_date())
            .requested_amount(Money::from_major(1_000))
            .payment(Payment::new(Money::from_major(250), week_day(1, 0)))
            .build()
            .unwrap();

        let mut events = EventStore::new();
        let result = ArrearsCalculator::default()
            .calculate_with_events(&loan, week_day(6, 0), &mut events)
            .unwrap();

        assert!(result.degenerate_schedule);
        assert_eq!(result.weeks_without_payment, 0);
        assert_eq!(result.arrears_amount, Money::ZERO);
        assert_eq!(result.partial_payment, Money::from_major(250));
        assert!(matches!(events.events()[0], Event::DegenerateSchedule { .. }));
        assert!(matches!(events.events()[1], Event::ArrearsEvaluated { .. }));
    }

    #[test]
    fn test_settled_standing() {
        let loan = loan_with(vec![Payment::new(Money::from_major(4_200), week_day(1, 0))]);

        let result = ArrearsCalculator::default()
            .calculate_at(&loan, week_day(3, 0))
            .unwrap();

        assert_eq!(result.standing(), LoanStanding::Settled);
    }

    #[test]
    fn test_signed_this_week_has_empty_window() {
        let loan = loan_with(Vec::new());

        let result = ArrearsCalculator::default()
            .calculate_at(&loan, sign_date() + Duration::days(1))
            .unwrap();

        assert_eq!(result.weeks_requiring_payment, 0);
        assert_eq!(result.arrears_amount, Money::ZERO);
    }

    #[test]
    fn test_calculate_with_time_provider() {
        let time = SafeTimeProvider::new(TimeSource::Test(week_day(3, 0)));
        let control = time.test_control().unwrap();
        let loan = loan_with(Vec::new());
        let calculator = ArrearsCalculator::default();

        assert_eq!(calculator.calculate(&loan, &time).unwrap().weeks_without_payment, 2);

        control.advance(Duration::weeks(2));
        assert_eq!(calculator.calculate(&loan, &time).unwrap().weeks_without_payment, 4);
    }
}
