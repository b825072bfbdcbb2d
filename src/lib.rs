pub mod commission;
pub mod config;
pub mod coverage;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod loan;
pub mod types;
pub mod views;

// re-export key types
pub use commission::{
    CommissionAllocation, CommissionLoan, CommissionReconciler, ReconciliationOutcome, ReportedTotal,
};
pub use config::EngineConfig;
pub use coverage::{
    evaluation_cutoff, weekly_ledger, ArrearsCalculator, ArrearsResult, Chronology, ChronologyBuilder,
    ChronologyItem, ChronologySummary, WeekBucket, WeekCalendar, WeekEntry,
};
pub use decimal::{Money, Rate};
pub use errors::{CoverageError, Result};
pub use events::{Event, EventStore};
pub use loan::{Loan, LoanBuilder, Payment};
pub use types::{
    AdjustmentKind, AllocationStatus, CoverageType, ExclusionReason, ItemType, LoanId, LoanStanding,
    PaymentId, SurplusPolicy, WeekMode,
};
pub use views::LoanCoverageView;

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
