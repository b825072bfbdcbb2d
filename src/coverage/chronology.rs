//! Week-by-week payment timeline.
//!
//! Each enumerated week becomes one or more [`ChronologyItem`]s: one per
//! payment received that week, or a single `NoPayment` item when nothing
//! arrived. Surplus paid above the installment is carried forward and may
//! cover later empty weeks. The running balance starts at the loan's total
//! debt and is reduced by every payment.
//!
//! The weeks-without-payment figure of the arrears calculator is derived from
//! totals and can disagree with the per-week view built here; neither is
//! computed from the other.

use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::errors::Result;
use crate::loan::Loan;
use crate::types::{CoverageType, ItemType, LoanId, PaymentId, SurplusPolicy};

use super::calendar::evaluation_cutoff;
use super::{weekly_ledger, WeekEntry};

/// one line of the payment timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChronologyItem {
    pub week_index: u32,
    pub monday: NaiveDate,
    pub sunday: NaiveDate,
    pub item_type: ItemType,
    pub coverage: CoverageType,
    pub payment_id: Option<PaymentId>,
    pub timestamp: Option<DateTime<Utc>>,
    /// this payment's amount; zero for weeks without payment
    pub amount: Money,
    /// all payments received that week
    pub week_total: Money,
    pub expected: Money,
    pub surplus_before: Money,
    pub surplus_after: Money,
    /// remaining debt after this item, never negative
    pub balance_after: Money,
    pub settled: bool,
    /// earlier uncovered weeks this week's excess paid off
    pub weeks_backfilled: u32,
}

/// per-loan totals over a chronology
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChronologySummary {
    pub weeks_evaluated: u32,
    pub advance_weeks: u32,
    pub full_weeks: u32,
    pub partial_weeks: u32,
    pub overpaid_weeks: u32,
    pub covered_by_surplus_weeks: u32,
    pub uncovered_weeks: u32,
    pub weeks_backfilled: u32,
    pub payment_count: u32,
    pub total_paid: Money,
    pub final_surplus: Money,
    pub final_balance: Money,
    pub settled_in_week: Option<u32>,
}

/// the full timeline for one loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chronology {
    pub loan_id: LoanId,
    pub expected_weekly_payment: Money,
    pub total_debt: Money,
    /// last calendar day covered
    pub horizon: NaiveDate,
    items: Vec<ChronologyItem>,
}

impl Chronology {
    pub fn items(&self) -> &[ChronologyItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<ChronologyItem> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items_for_week(&self, week_index: u32) -> impl Iterator<Item = &ChronologyItem> {
        self.items.iter().filter(move |item| item.week_index == week_index)
    }

    pub fn summary(&self) -> ChronologySummary {
        let mut summary = ChronologySummary {
            final_balance: self.total_debt,
            ..ChronologySummary::default()
        };
        let mut last_week: Option<u32> = None;

        for item in &self.items {
            if item.item_type == ItemType::Payment {
                summary.payment_count += 1;
                summary.total_paid += item.amount;
            }

            if item.settled && summary.settled_in_week.is_none() {
                summary.settled_in_week = Some(item.week_index);
            }
            summary.final_surplus = item.surplus_after;
            summary.final_balance = item.balance_after;

            // week-level counts once per week
            if last_week == Some(item.week_index) {
                continue;
            }
            last_week = Some(item.week_index);

            summary.weeks_evaluated += 1;
            summary.weeks_backfilled += item.weeks_backfilled;
            match item.coverage {
                CoverageType::Advance => summary.advance_weeks += 1,
                CoverageType::Full => summary.full_weeks += 1,
                CoverageType::Partial => summary.partial_weeks += 1,
                CoverageType::Overpaid => summary.overpaid_weeks += 1,
                CoverageType::CoveredBySurplus => summary.covered_by_surplus_weeks += 1,
                CoverageType::Uncovered => summary.uncovered_weeks += 1,
            }
        }

        summary
    }
}

/// classify a week's total against the installment
pub fn classify_payment(paid: Money, expected: Money, overpaid_multiplier: Decimal) -> CoverageType {
    if paid >= expected * overpaid_multiplier {
        CoverageType::Overpaid
    } else if paid >= expected {
        CoverageType::Full
    } else {
        CoverageType::Partial
    }
}

/// running state carried from week to week
struct Walk {
    surplus: Money,
    balance: Money,
    total_debt: Money,
    uncovered_pending: u32,
}

impl Walk {
    fn balance_after(&self) -> Money {
        self.balance.floor_zero()
    }

    fn settled(&self) -> bool {
        self.total_debt.is_positive() && !self.balance.is_positive()
    }
}

/// builder for payment timelines
#[derive(Debug, Clone, Default)]
pub struct ChronologyBuilder {
    config: EngineConfig,
}

impl ChronologyBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// build up to the provider's current instant
    pub fn build(&self, loan: &Loan, time_provider: &SafeTimeProvider) -> Result<Chronology> {
        self.build_at(loan, time_provider.now())
    }

    /// build up to `now`, or to the loan's finished date when it has one
    pub fn build_at(&self, loan: &Loan, now: DateTime<Utc>) -> Result<Chronology> {
        loan.validate()?;

        let horizon = match loan.finished_date {
            Some(finished) => finished.date_naive().min(now.date_naive()),
            None => evaluation_cutoff(now, self.config.week_mode),
        };

        let expected = loan.expected_weekly_payment();
        let total_debt = loan.total_debt();
        let mut walk = Walk {
            surplus: Money::ZERO,
            balance: total_debt,
            total_debt,
            uncovered_pending: 0,
        };

        let mut items = Vec::new();
        for entry in weekly_ledger(loan, horizon) {
            if entry.bucket.is_grace(self.config.grace_weeks) {
                self.grace_week(&entry, &mut walk, &mut items);
            } else if entry.has_payments() {
                self.paid_week(&entry, expected, &mut walk, &mut items);
            } else {
                self.empty_week(&entry, expected, &mut walk, &mut items);
            }
        }

        debug!(
            "loan {} chronology through {}: {} items, surplus {}, balance {}",
            loan.id,
            horizon,
            items.len(),
            walk.surplus,
            walk.balance_after()
        );

        Ok(Chronology {
            loan_id: loan.id,
            expected_weekly_payment: expected,
            total_debt,
            horizon,
            items,
        })
    }

    /// advance payments: no obligation, everything becomes surplus
    fn grace_week(&self, entry: &WeekEntry<'_>, walk: &mut Walk, items: &mut Vec<ChronologyItem>) {
        let week_total = entry.total();
        let surplus_before = walk.surplus;
        let surplus_after = surplus_before + week_total;

        for payment in &entry.payments {
            walk.balance -= payment.amount;
            items.push(ChronologyItem {
                week_index: entry.bucket.index,
                monday: entry.bucket.monday,
                sunday: entry.bucket.sunday,
                item_type: ItemType::Payment,
                coverage: CoverageType::Advance,
                payment_id: Some(payment.id),
                timestamp: Some(payment.timestamp()),
                amount: payment.amount,
                week_total,
                expected: Money::ZERO,
                surplus_before,
                surplus_after,
                balance_after: walk.balance_after(),
                settled: walk.settled(),
                weeks_backfilled: 0,
            });
        }

        walk.surplus = surplus_after;
    }

    fn paid_week(&self, entry: &WeekEntry<'_>, expected: Money, walk: &mut Walk, items: &mut Vec<ChronologyItem>) {
        let week_total = entry.total();
        let coverage = classify_payment(week_total, expected, self.config.overpaid_multiplier);
        let surplus_before = walk.surplus;

        let mut pool = surplus_before + week_total.saturating_sub(expected);
        let mut weeks_backfilled = 0;
        if self.config.surplus_policy == SurplusPolicy::BackfillMissed && walk.uncovered_pending > 0 {
            if let Some(affordable) = pool.whole_multiples_of(expected) {
                weeks_backfilled = affordable.min(walk.uncovered_pending);
                pool -= expected.times(weeks_backfilled);
                walk.uncovered_pending -= weeks_backfilled;
            }
        }
        let surplus_after = pool;

        for payment in &entry.payments {
            walk.balance -= payment.amount;
            items.push(ChronologyItem {
                week_index: entry.bucket.index,
                monday: entry.bucket.monday,
                sunday: entry.bucket.sunday,
                item_type: ItemType::Payment,
                coverage,
                payment_id: Some(payment.id),
                timestamp: Some(payment.timestamp()),
                amount: payment.amount,
                week_total,
                expected,
                surplus_before,
                surplus_after,
                balance_after: walk.balance_after(),
                settled: walk.settled(),
                weeks_backfilled,
            });
        }

        walk.surplus = surplus_after;
    }

    fn empty_week(&self, entry: &WeekEntry<'_>, expected: Money, walk: &mut Walk, items: &mut Vec<ChronologyItem>) {
        let surplus_before = walk.surplus;

        let coverage = if surplus_before >= expected {
            walk.surplus -= expected;
            CoverageType::CoveredBySurplus
        } else {
            walk.uncovered_pending += 1;
            CoverageType::Uncovered
        };

        items.push(ChronologyItem {
            week_index: entry.bucket.index,
            monday: entry.bucket.monday,
            sunday: entry.bucket.sunday,
            item_type: ItemType::NoPayment,
            coverage,
            payment_id: None,
            timestamp: None,
            amount: Money::ZERO,
            week_total: Money::ZERO,
            expected,
            surplus_before,
            surplus_after: walk.surplus,
            balance_after: walk.balance_after(),
            settled: walk.settled(),
            weeks_backfilled: 0,
        });
    }
}
