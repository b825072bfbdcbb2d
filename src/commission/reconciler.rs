use log::{debug, info};
use rust_decimal::Decimal;

use crate::decimal::Money;
use crate::errors::{CoverageError, Result};
use crate::events::{Event, EventStore};
use crate::types::{AdjustmentKind, AllocationStatus, ExclusionReason};

use super::{CommissionAllocation, CommissionLoan, ReconciliationOutcome, ReportedTotal};

/// forces per-loan commissions to add up to a reported total
///
/// Deficits are taken from the smallest payments first, zeroing each before
/// touching the next. Surpluses go to the largest payments first, one
/// commission unit per loan per pass, with the final remainder added as a
/// partial amount. Ties keep input order.
#[derive(Debug, Clone, Default)]
pub struct CommissionReconciler;

impl CommissionReconciler {
    pub fn new() -> Self {
        Self
    }

    /// expected commission for one loan, before any redistribution
    pub fn expected_allocation(&self, loan: &CommissionLoan) -> CommissionAllocation {
        let mut allocation = CommissionAllocation {
            loan_id: loan.loan_id,
            payment_amount: loan.payment_amount,
            expected_weekly_payment: loan.expected_weekly_payment,
            base_commission_unit: loan.base_commission_unit,
            multiplier: Decimal::ZERO,
            expected_commission: Money::ZERO,
            final_commission: Money::ZERO,
            status: AllocationStatus::Unchanged,
        };

        if !loan.payment_amount.is_positive() {
            allocation.status = AllocationStatus::Excluded(ExclusionReason::NoPayment);
            return allocation;
        }
        if !loan.base_commission_unit.is_positive() {
            allocation.status = AllocationStatus::Excluded(ExclusionReason::NoCommissionUnit);
            return allocation;
        }

        // without an installment a single payment counts once
        let multiplier = if loan.expected_weekly_payment.is_positive() {
            loan.payment_amount
                .floor_div(loan.expected_weekly_payment)
                .unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ONE
        };

        allocation.multiplier = multiplier;
        allocation.expected_commission = loan.base_commission_unit * multiplier;
        allocation.final_commission = allocation.expected_commission;
        allocation
    }

    pub fn reconcile(&self, reported: ReportedTotal, loans: &[CommissionLoan]) -> Result<ReconciliationOutcome> {
        for loan in loans {
            loan.validate()?;
        }

        let reported_total = reported.amount();
        let mut allocations: Vec<CommissionAllocation> =
            loans.iter().map(|loan| self.expected_allocation(loan)).collect();

        let eligible: Vec<usize> = allocations
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_eligible())
            .map(|(i, _)| i)
            .collect();

        let expected_total: Money = eligible.iter().map(|&i| allocations[i].expected_commission).sum();

        let adjustment = if reported_total.is_zero() {
            for &i in &eligible {
                let allocation = &mut allocations[i];
                allocation.final_commission = Money::ZERO;
                if allocation.expected_commission.is_positive() {
                    allocation.status = AllocationStatus::ZeroedByDeficit;
                }
            }
            AdjustmentKind::ZeroReported
        } else if eligible.is_empty() {
            return Err(CoverageError::NoEligibleLoans { total: reported_total });
        } else if reported_total == expected_total {
            AdjustmentKind::Exact
        } else if reported_total < expected_total {
            Self::absorb_deficit(&mut allocations, &eligible, expected_total - reported_total);
            AdjustmentKind::Deficit
        } else {
            Self::spread_surplus(&mut allocations, &eligible, reported_total - expected_total);
            AdjustmentKind::Surplus
        };

        let outcome = ReconciliationOutcome {
            allocations,
            reported_total,
            expected_total,
            discrepancy: reported_total - expected_total,
            adjustment,
        };
        debug_assert_eq!(outcome.total_final(), reported_total);

        info!(
            "commission reconciliation: reported {}, expected {}, {:?} across {} eligible loans",
            reported_total,
            expected_total,
            adjustment,
            eligible.len()
        );

        Ok(outcome)
    }

    /// reconcile and record every adjustment in the audit trail
    pub fn reconcile_with_events(
        &self,
        reported: ReportedTotal,
        loans: &[CommissionLoan],
        events: &mut EventStore,
    ) -> Result<ReconciliationOutcome> {
        let outcome = self.reconcile(reported, loans)?;

        for allocation in &outcome.allocations {
            match allocation.status {
                AllocationStatus::Excluded(reason) => events.emit(Event::CommissionExcluded {
                    loan_id: allocation.loan_id,
                    reason,
                }),
                AllocationStatus::Reduced | AllocationStatus::ZeroedByDeficit => {
                    events.emit(Event::CommissionReduced {
                        loan_id: allocation.loan_id,
                        expected: allocation.expected_commission,
                        reduced_by: allocation.expected_commission - allocation.final_commission,
                        final_commission: allocation.final_commission,
                    })
                }
                AllocationStatus::Increased => events.emit(Event::CommissionIncreased {
                    loan_id: allocation.loan_id,
                    expected: allocation.expected_commission,
                    increased_by: allocation.final_commission - allocation.expected_commission,
                    final_commission: allocation.final_commission,
                }),
                AllocationStatus::Unchanged => {}
            }
        }

        events.emit(Event::ReconciliationCompleted {
            reported_total: outcome.reported_total,
            expected_total: outcome.expected_total,
            adjustment: outcome.adjustment,
            eligible_loans: outcome.eligible_count(),
        });

        Ok(outcome)
    }

    fn absorb_deficit(allocations: &mut [CommissionAllocation], eligible: &[usize], deficit: Money) {
        let mut order = eligible.to_vec();
        order.sort_by(|&a, &b| allocations[a].payment_amount.cmp(&allocations[b].payment_amount));

        let mut remaining = deficit;
        for i in order {
            if remaining.is_zero() {
                break;
            }

            let allocation = &mut allocations[i];
            let commission = allocation.final_commission;
            if commission.is_zero() {
                continue;
            }

            if remaining >= commission {
                allocation.final_commission = Money::ZERO;
                allocation.status = AllocationStatus::ZeroedByDeficit;
                remaining -= commission;
            } else {
                allocation.final_commission = commission - remaining;
                allocation.status = AllocationStatus::Reduced;
                remaining = Money::ZERO;
            }

            debug!(
                "deficit: loan {} commission {} -> {}",
                allocation.loan_id, commission, allocation.final_commission
            );
        }
    }

    fn spread_surplus(allocations: &mut [CommissionAllocation], eligible: &[usize], surplus: Money) {
        let mut order = eligible.to_vec();
        // stable sort on reversed keys keeps input order among equal payments
        order.sort_by(|&a, &b| allocations[b].payment_amount.cmp(&allocations[a].payment_amount));

        let mut remaining = surplus;

        // whole passes at once; equivalent to cycling unit by unit
        let pass_total: Money = order.iter().map(|&i| allocations[i].base_commission_unit).sum();
        if let Some(passes) = remaining.floor_div(pass_total) {
            if passes > Decimal::ZERO {
                for &i in &order {
                    let unit = allocations[i].base_commission_unit;
                    allocations[i].final_commission += unit * passes;
                }
                remaining -= pass_total * passes;
            }
        }

        for &i in &order {
            if remaining.is_zero() {
                break;
            }
            let allocation = &mut allocations[i];
            let addition = allocation.base_commission_unit.min(remaining);
            allocation.final_commission += addition;
            remaining -= addition;
        }

        for &i in &order {
            let allocation = &mut allocations[i];
            if allocation.final_commission > allocation.expected_commission {
                allocation.status = AllocationStatus::Increased;
                debug!(
                    "surplus: loan {} commission {} -> {}",
                    allocation.loan_id, allocation.expected_commission, allocation.final_commission
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn loan(payment: i64, weekly: i64, unit: i64) -> CommissionLoan {
        CommissionLoan::new(
            Uuid::new_v4(),
            Money::from_major(payment),
            Money::from_major(weekly),
            Money::from_major(unit),
        )
    }

    fn reported(amount: i64) -> ReportedTotal {
        ReportedTotal::new(Money::from_major(amount)).unwrap()
    }

    fn finals(outcome: &ReconciliationOutcome) -> Vec<Money> {
        outcome.allocations.iter().map(|a| a.final_commission).collect()
    }

    #[test]
    fn test_expected_commission_multiplier() {
        let reconciler = CommissionReconciler::new();

        let double = reconciler.expected_allocation(&loan(1_000, 500, 15));
        assert_eq!(double.multiplier, dec!(2));
        assert_eq!(double.expected_commission, Money::from_major(30));

        // below one installment: eligible but nothing expected
        let short = reconciler.expected_allocation(&loan(300, 500, 15));
        assert_eq!(short.multiplier, Decimal::ZERO);
        assert_eq!(short.expected_commission, Money::ZERO);
        assert!(short.is_eligible());

        // no installment: one payment counts once
        let unscheduled = reconciler.expected_allocation(&loan(300, 0, 15));
        assert_eq!(unscheduled.expected_commission, Money::from_major(15));
    }

    #[test]
    fn test_exclusions_are_distinguishable() {
        let outcome = CommissionReconciler::new()
            .reconcile(
                reported(10),
                &[loan(0, 500, 10), loan(500, 500, 0), loan(500, 500, 10)],
            )
            .unwrap();

        assert_eq!(
            outcome.allocations[0].status,
            AllocationStatus::Excluded(ExclusionReason::NoPayment)
        );
        assert_eq!(
            outcome.allocations[1].status,
            AllocationStatus::Excluded(ExclusionReason::NoCommissionUnit)
        );
        assert_eq!(outcome.allocations[2].status, AllocationStatus::Unchanged);
        assert_eq!(outcome.adjustment, AdjustmentKind::Exact);
        assert_eq!(outcome.eligible_count(), 1);
    }

    #[test]
    fn test_deficit_zeroes_smallest_payer_first() {
        // expected 30, 20, 10 with payments ordered the same way
        let loans = [loan(1_500, 500, 10), loan(1_000, 500, 10), loan(500, 500, 10)];

        let outcome = CommissionReconciler::new().reconcile(reported(45), &loans).unwrap();

        assert_eq!(outcome.expected_total, Money::from_major(60));
        assert_eq!(outcome.discrepancy, Money::from_major(-15));
        assert_eq!(
            finals(&outcome),
            vec![Money::from_major(30), Money::from_major(15), Money::ZERO]
        );
        assert_eq!(outcome.allocations[2].status, AllocationStatus::ZeroedByDeficit);
        assert_eq!(outcome.allocations[1].status, AllocationStatus::Reduced);
        assert_eq!(outcome.allocations[0].status, AllocationStatus::Unchanged);
        assert_eq!(outcome.total_final(), Money::from_major(45));
    }

    #[test]
    fn test_deficit_partial_reduction_only() {
        let loans = [loan(1_000, 500, 10), loan(500, 500, 10)];

        let outcome = CommissionReconciler::new()
            .reconcile(ReportedTotal::parse("25.50").unwrap(), &loans)
            .unwrap();

        assert_eq!(finals(&outcome), vec![Money::from_major(20), Money::from_minor(550)]);
    }

    #[test]
    fn test_surplus_goes_to_largest_payer() {
        let loans = [loan(500, 500, 10), loan(600, 500, 10)];

        let outcome = CommissionReconciler::new().reconcile(reported(25), &loans).unwrap();

        assert_eq!(outcome.adjustment, AdjustmentKind::Surplus);
        assert_eq!(finals(&outcome), vec![Money::from_major(10), Money::from_major(15)]);
        assert_eq!(outcome.allocations[1].status, AllocationStatus::Increased);
    }

    #[test]
    fn test_surplus_full_unit_then_partial_to_next() {
        let loans = [loan(500, 500, 10), loan(600, 500, 10)];

        let outcome = CommissionReconciler::new().reconcile(reported(35), &loans).unwrap();

        // +10 to the largest payer, remaining +5 to the next
        assert_eq!(finals(&outcome), vec![Money::from_major(15), Money::from_major(20)]);
    }

    #[test]
    fn test_surplus_multiple_passes() {
        let loans = [loan(500, 500, 10), loan(600, 500, 5)];

        // expected 15, surplus 48: three full passes (+45) then 3 to the largest payer
        let outcome = CommissionReconciler::new().reconcile(reported(63), &loans).unwrap();

        assert_eq!(outcome.total_final(), Money::from_major(63));
        assert_eq!(finals(&outcome), vec![Money::from_major(40), Money::from_major(23)]);
    }

    #[test]
    fn test_surplus_many_passes_of_a_cent() {
        // ten billion passes of 0.01
        let loans = [CommissionLoan::new(
            Uuid::new_v4(),
            Money::from_major(500),
            Money::from_major(500),
            Money::CENT,
        )];

        let outcome = CommissionReconciler::new()
            .reconcile(reported(100_000_000), &loans)
            .unwrap();

        assert_eq!(outcome.total_final(), Money::from_major(100_000_000));
        assert_eq!(outcome.allocations[0].final_commission, Money::from_major(100_000_000));
        assert_eq!(outcome.allocations[0].status, AllocationStatus::Increased);
    }

    #[test]
    fn test_multiplier_beyond_u32() {
        let loan = CommissionLoan::new(
            Uuid::new_v4(),
            Money::from_major(100_000_000),
            Money::CENT,
            Money::CENT,
        );

        let allocation = CommissionReconciler::new().expected_allocation(&loan);

        assert_eq!(allocation.multiplier, dec!(10000000000));
        assert_eq!(allocation.expected_commission, Money::from_major(100_000_000));
    }

    #[test]
    fn test_surplus_ties_keep_input_order() {
        let loans = [loan(500, 500, 10), loan(500, 500, 10)];

        let outcome = CommissionReconciler::new().reconcile(reported(25), &loans).unwrap();

        assert_eq!(finals(&outcome), vec![Money::from_major(15), Money::from_major(10)]);
    }

    #[test]
    fn test_zero_reported_total() {
        let loans = [loan(500, 500, 10), loan(0, 500, 10)];

        let outcome = CommissionReconciler::new().reconcile(reported(0), &loans).unwrap();

        assert_eq!(outcome.adjustment, AdjustmentKind::ZeroReported);
        assert_eq!(outcome.total_final(), Money::ZERO);
        assert_eq!(outcome.allocations[0].status, AllocationStatus::ZeroedByDeficit);
        assert!(!outcome.allocations[1].is_eligible());
    }

    #[test]
    fn test_no_eligible_loans_with_positive_total() {
        let result = CommissionReconciler::new().reconcile(reported(10), &[loan(0, 500, 10)]);
        assert!(matches!(result, Err(CoverageError::NoEligibleLoans { .. })));
    }

    #[test]
    fn test_events_recorded() {
        let loans = [loan(1_000, 500, 10), loan(500, 500, 10), loan(0, 500, 10)];
        let mut events = EventStore::new();

        CommissionReconciler::new()
            .reconcile_with_events(reported(25), &loans, &mut events)
            .unwrap();

        let events = events.take_events();
        assert!(events.iter().any(|e| matches!(e, Event::CommissionReduced { .. })));
        assert!(events.iter().any(|e| matches!(e, Event::CommissionExcluded { .. })));
        assert!(matches!(
            events.last(),
            Some(Event::ReconciliationCompleted {
                adjustment: AdjustmentKind::Deficit,
                eligible_loans: 2,
                ..
            })
        ));
    }
}
