use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a payment
pub type PaymentId = Uuid;

/// how far into the calendar an evaluation reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WeekMode {
    /// only fully elapsed weeks, up to last sunday
    #[default]
    Current,
    /// include the in-progress week, up to min(now, this sunday)
    Next,
}

/// whether a chronology item records money received
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    Payment,
    NoPayment,
}

/// how a week relates to the expected installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoverageType {
    /// paid in the grace week, before any obligation exists
    Advance,
    /// paid at least the installment
    Full,
    /// paid something below the installment
    Partial,
    /// paid well above the installment (see `EngineConfig::overpaid_multiplier`)
    Overpaid,
    /// nothing paid, carried surplus absorbed the installment
    CoveredBySurplus,
    /// nothing paid and not enough surplus
    Uncovered,
}

impl CoverageType {
    /// true when the week's obligation was met one way or another
    pub fn is_covered(&self) -> bool {
        match self {
            CoverageType::Advance
            | CoverageType::Full
            | CoverageType::Overpaid
            | CoverageType::CoveredBySurplus => true,
            CoverageType::Partial | CoverageType::Uncovered => false,
        }
    }
}

/// what to do with surplus when earlier weeks were left uncovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SurplusPolicy {
    /// surplus only covers future empty weeks
    #[default]
    ForwardOnly,
    /// surplus first settles earlier uncovered weeks, oldest first
    BackfillMissed,
}

/// overall condition of a loan at evaluation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStanding {
    /// no arrears
    Current,
    /// one or more weeks behind
    InArrears,
    /// total debt fully paid
    Settled,
}

/// why a loan takes no part in commission allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExclusionReason {
    /// no payment this period
    NoPayment,
    /// loan type carries no commission
    NoCommissionUnit,
}

/// how a loan's commission ended up relative to its expectation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AllocationStatus {
    Excluded(ExclusionReason),
    Unchanged,
    Reduced,
    ZeroedByDeficit,
    Increased,
}

impl AllocationStatus {
    pub fn is_eligible(&self) -> bool {
        !matches!(self, AllocationStatus::Excluded(_))
    }
}

/// which redistribution branch a reconciliation took
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdjustmentKind {
    /// reported total was zero
    ZeroReported,
    /// reported matches expected
    Exact,
    /// reported below expected, smallest payers reduced
    Deficit,
    /// reported above expected, largest payers increased
    Surplus,
}
