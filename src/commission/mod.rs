pub mod reconciler;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{CoverageError, Result};
use crate::loan::Loan;
use crate::types::{AdjustmentKind, AllocationStatus, LoanId};

pub use reconciler::CommissionReconciler;

/// commission input for one loan in a collection period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionLoan {
    pub loan_id: LoanId,
    /// amount collected this period
    pub payment_amount: Money,
    pub expected_weekly_payment: Money,
    /// commission owed per standard weekly payment for this loan type
    pub base_commission_unit: Money,
}

impl CommissionLoan {
    pub fn new(
        loan_id: LoanId,
        payment_amount: Money,
        expected_weekly_payment: Money,
        base_commission_unit: Money,
    ) -> Self {
        Self {
            loan_id,
            payment_amount,
            expected_weekly_payment,
            base_commission_unit,
        }
    }

    /// take id and installment from a loan
    pub fn from_loan(loan: &Loan, payment_amount: Money, base_commission_unit: Money) -> Self {
        Self::new(
            loan.id,
            payment_amount,
            loan.expected_weekly_payment(),
            base_commission_unit,
        )
    }

    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("payment amount", self.payment_amount),
            ("expected weekly payment", self.expected_weekly_payment),
            ("base commission unit", self.base_commission_unit),
        ];

        for (name, value) in checks {
            if value.is_negative() {
                return Err(CoverageError::InvalidCommissionInput {
                    loan_id: self.loan_id,
                    message: format!("{} is negative: {}", name, value),
                });
            }
        }

        Ok(())
    }
}

/// validated, non-negative commission total taken from the paper ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Money")]
pub struct ReportedTotal(Money);

impl ReportedTotal {
    pub fn new(amount: Money) -> Result<Self> {
        if amount.is_negative() {
            return Err(CoverageError::NegativeReportedTotal { total: amount });
        }
        Ok(Self(amount))
    }

    /// parse ledger text such as `"1250.50"`
    pub fn parse(input: &str) -> Result<Self> {
        let amount = Money::from_str_exact(input).map_err(|_| CoverageError::InvalidReportedTotal {
            input: input.to_string(),
        })?;
        Self::new(amount)
    }

    pub fn amount(&self) -> Money {
        self.0
    }
}

impl TryFrom<Money> for ReportedTotal {
    type Error = CoverageError;

    fn try_from(amount: Money) -> Result<Self> {
        Self::new(amount)
    }
}

/// final commission for one loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionAllocation {
    pub loan_id: LoanId,
    pub payment_amount: Money,
    pub expected_weekly_payment: Money,
    pub base_commission_unit: Money,
    /// whole installments covered by the payment
    pub multiplier: Decimal,
    pub expected_commission: Money,
    pub final_commission: Money,
    pub status: AllocationStatus,
}

impl CommissionAllocation {
    pub fn is_eligible(&self) -> bool {
        self.status.is_eligible()
    }

    /// signed change applied by the reconciliation
    pub fn adjustment(&self) -> Money {
        self.final_commission - self.expected_commission
    }
}

/// outcome of reconciling one reported total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationOutcome {
    /// one entry per input loan, in input order
    pub allocations: Vec<CommissionAllocation>,
    pub reported_total: Money,
    pub expected_total: Money,
    /// reported minus expected; negative for a deficit
    pub discrepancy: Money,
    pub adjustment: AdjustmentKind,
}

impl ReconciliationOutcome {
    pub fn total_final(&self) -> Money {
        self.allocations.iter().map(|a| a.final_commission).sum()
    }

    pub fn eligible_count(&self) -> usize {
        self.allocations.iter().filter(|a| a.is_eligible()).count()
    }

    pub fn allocation_for(&self, loan_id: LoanId) -> Option<&CommissionAllocation> {
        self.allocations.iter().find(|a| a.loan_id == loan_id)
    }

    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_reported_total_parse() {
        assert_eq!(
            ReportedTotal::parse(" 1250.50 ").unwrap().amount(),
            Money::from_minor(125_050)
        );
        assert!(matches!(
            ReportedTotal::parse("-10"),
            Err(CoverageError::NegativeReportedTotal { .. })
        ));
        for bad in ["", "abc", "NaN", "inf"] {
            assert!(
                matches!(ReportedTotal::parse(bad), Err(CoverageError::InvalidReportedTotal { .. })),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_reported_total_deserialize_validates() {
        let total: ReportedTotal = serde_json::from_str("\"1250.50\"").unwrap();
        assert_eq!(total.amount(), Money::from_minor(125_050));

        let negative = serde_json::from_str::<ReportedTotal>("\"-50\"");
        assert!(negative.is_err());
    }

    #[test]
    fn test_commission_loan_validation() {
        let loan = CommissionLoan::new(
            Uuid::new_v4(),
            Money::from_major(300),
            Money::from_major(-300),
            Money::from_major(10),
        );
        assert!(matches!(loan.validate(), Err(CoverageError::InvalidCommissionInput { .. })));
    }
}
