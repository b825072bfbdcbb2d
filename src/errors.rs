use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::decimal::{Money, Rate};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoverageError {
    #[error("invalid payment amount: {amount} (payment {payment_id})")]
    InvalidPaymentAmount {
        payment_id: Uuid,
        amount: Money,
    },

    #[error("invalid loan terms: {message}")]
    InvalidLoanTerms {
        message: String,
    },

    #[error("invalid interest rate: {rate}")]
    InvalidInterestRate {
        rate: Rate,
    },

    #[error("payment {payment_id} at {timestamp} precedes loan sign date {sign_date}")]
    PaymentBeforeSignDate {
        payment_id: Uuid,
        timestamp: DateTime<Utc>,
        sign_date: DateTime<Utc>,
    },

    #[error("reported commission total is negative: {total}")]
    NegativeReportedTotal {
        total: Money,
    },

    #[error("reported commission total is not a number: {input:?}")]
    InvalidReportedTotal {
        input: String,
    },

    #[error("invalid commission input for loan {loan_id}: {message}")]
    InvalidCommissionInput {
        loan_id: Uuid,
        message: String,
    },

    #[error("no eligible loans to carry reported commission total {total}")]
    NoEligibleLoans {
        total: Money,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("loan builder missing required field: {field}")]
    MissingField {
        field: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, CoverageError>;
