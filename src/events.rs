use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{AdjustmentKind, ExclusionReason, LoanId, WeekMode};

/// audit events recorded while evaluating loans and reconciling commissions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // arrears events
    ArrearsEvaluated {
        loan_id: LoanId,
        mode: WeekMode,
        cutoff: NaiveDate,
        weeks_without_payment: u32,
        arrears_amount: Money,
        surplus: Money,
        evaluated_at: DateTime<Utc>,
    },
    DegenerateSchedule {
        loan_id: LoanId,
        payments_received: Money,
    },

    // commission events
    CommissionExcluded {
        loan_id: LoanId,
        reason: ExclusionReason,
    },
    CommissionReduced {
        loan_id: LoanId,
        expected: Money,
        reduced_by: Money,
        final_commission: Money,
    },
    CommissionIncreased {
        loan_id: LoanId,
        expected: Money,
        increased_by: Money,
        final_commission: Money,
    },
    ReconciliationCompleted {
        reported_total: Money,
        expected_total: Money,
        adjustment: AdjustmentKind,
        eligible_loans: usize,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
