//! serializable read models for loans
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::coverage::{ArrearsCalculator, ArrearsResult, ChronologyBuilder, ChronologyItem, ChronologySummary};
use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::loan::Loan;
use crate::types::{LoanId, LoanStanding, WeekMode};

/// one loan's arrears and weekly timeline in a single payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanCoverageView {
    pub loan_id: LoanId,
    pub standing: LoanStanding,
    pub evaluated_at: DateTime<Utc>,
    pub terms: TermsView,
    pub arrears: ArrearsView,
    pub summary: ChronologySummary,
    pub chronology: Vec<ChronologyItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermsView {
    pub sign_date: DateTime<Utc>,
    pub finished_date: Option<DateTime<Utc>>,
    pub requested_amount: Money,
    pub rate: Rate,
    pub week_duration: Option<u32>,
    pub expected_weekly_payment: Money,
    pub total_debt: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrearsView {
    pub mode: WeekMode,
    pub cutoff: NaiveDate,
    pub weeks_without_payment: u32,
    pub arrears_amount: Money,
    pub partial_payment: Money,
    pub total_paid: Money,
    pub pending_amount: Money,
    pub degenerate_schedule: bool,
}

impl ArrearsView {
    fn from_result(result: &ArrearsResult) -> Self {
        ArrearsView {
            mode: result.mode,
            cutoff: result.cutoff,
            weeks_without_payment: result.weeks_without_payment,
            arrears_amount: result.arrears_amount,
            partial_payment: result.partial_payment,
            total_paid: result.total_paid_overall,
            pending_amount: result.pending_amount,
            degenerate_schedule: result.degenerate_schedule,
        }
    }
}

impl LoanCoverageView {
    pub fn from_loan(loan: &Loan, config: &EngineConfig, now: DateTime<Utc>) -> Result<Self> {
        let arrears = ArrearsCalculator::new(config.clone()).calculate_at(loan, now)?;
        let chronology = ChronologyBuilder::new(config.clone()).build_at(loan, now)?;

        Ok(LoanCoverageView {
            loan_id: loan.id,
            standing: arrears.standing(),
            evaluated_at: now,
            terms: TermsView {
                sign_date: loan.sign_date,
                finished_date: loan.finished_date,
                requested_amount: loan.requested_amount,
                rate: loan.rate,
                week_duration: loan.week_duration,
                expected_weekly_payment: loan.expected_weekly_payment(),
                total_debt: loan.total_debt(),
            },
            arrears: ArrearsView::from_result(&arrears),
            summary: chronology.summary(),
            chronology: chronology.into_items(),
        })
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::Payment;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_view_round_trips_through_json() {
        let loan = Loan::builder()
            .sign_date(at(2024, 1, 3))
            .requested_amount(Money::from_major(2_000))
            .week_duration(4)
            .payment(Payment::new(Money::from_major(500), at(2024, 1, 9)))
            .payment(Payment::new(Money::from_major(500), at(2024, 1, 16)))
            .build()
            .unwrap();

        let view = LoanCoverageView::from_loan(&loan, &EngineConfig::default(), at(2024, 1, 22)).unwrap();

        assert_eq!(view.standing, LoanStanding::Current);
        assert_eq!(view.terms.expected_weekly_payment, Money::from_major(500));
        assert_eq!(view.arrears.weeks_without_payment, 0);
        assert_eq!(view.summary.full_weeks, 2);
        assert_eq!(view.chronology.len(), 2);

        let json = view.to_json_pretty().unwrap();
        assert!(json.contains("\"standing\": \"Current\""));

        let parsed: LoanCoverageView = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.loan_id, loan.id);
        assert_eq!(parsed.chronology, view.chronology);
    }
}
