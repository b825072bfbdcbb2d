use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{CoverageError, Result};
use crate::types::{LoanId, PaymentId};

/// a recorded payment; immutable once captured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub amount: Money,
    /// when the collector received the money, if known
    pub received_at: Option<DateTime<Utc>>,
    /// when the payment was entered
    pub created_at: DateTime<Utc>,
    pub reference: Option<String>,
}

impl Payment {
    pub fn new(amount: Money, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount,
            received_at: None,
            created_at,
            reference: None,
        }
    }

    pub fn received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = Some(received_at);
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// effective timestamp: received date wins over entry date
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.received_at.unwrap_or(self.created_at)
    }

    /// utc calendar date used for week bucketing
    pub fn date(&self) -> NaiveDate {
        self.timestamp().date_naive()
    }
}

/// a weekly-collected loan and its payment history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub sign_date: DateTime<Utc>,
    pub requested_amount: Money,
    pub rate: Rate,
    /// contractual number of weekly installments
    pub week_duration: Option<u32>,
    /// explicit installment; derived from terms when absent
    pub expected_weekly_payment: Option<Money>,
    pub payments: Vec<Payment>,
    /// date the loan was closed or renewed
    pub finished_date: Option<DateTime<Utc>>,
}

impl Loan {
    pub fn builder() -> LoanBuilder {
        LoanBuilder::new()
    }

    pub fn sign_day(&self) -> NaiveDate {
        self.sign_date.date_naive()
    }

    /// requested amount plus interest
    pub fn total_debt(&self) -> Money {
        self.requested_amount * self.rate.factor()
    }

    /// installment per week; zero when there is no usable schedule
    pub fn expected_weekly_payment(&self) -> Money {
        if let Some(explicit) = self.expected_weekly_payment {
            return explicit;
        }

        match self.week_duration {
            Some(weeks) if weeks > 0 && self.requested_amount.is_positive() => {
                self.total_debt() / Decimal::from(weeks)
            }
            _ => Money::ZERO,
        }
    }

    pub fn has_schedule(&self) -> bool {
        self.expected_weekly_payment().is_positive()
    }

    /// every payment ever recorded, regardless of date
    pub fn total_paid(&self) -> Money {
        self.payments.iter().map(|p| p.amount).sum()
    }

    /// what is still owed, never negative
    pub fn pending_amount(&self) -> Money {
        self.total_debt().saturating_sub(self.total_paid())
    }

    /// payments ordered by timestamp, ties kept in recorded order
    pub fn sorted_payments(&self) -> Vec<&Payment> {
        let mut payments: Vec<&Payment> = self.payments.iter().collect();
        payments.sort_by_key(|p| p.timestamp());
        payments
    }

    pub fn add_payment(&mut self, payment: Payment) -> Result<()> {
        self.validate_payment(&payment)?;
        self.payments.push(payment);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.requested_amount.is_negative() {
            return Err(CoverageError::InvalidLoanTerms {
                message: format!("requested amount is negative: {}", self.requested_amount),
            });
        }

        if self.rate.is_negative() {
            return Err(CoverageError::InvalidInterestRate { rate: self.rate });
        }

        if let Some(weekly) = self.expected_weekly_payment {
            if weekly.is_negative() {
                return Err(CoverageError::InvalidLoanTerms {
                    message: format!("expected weekly payment is negative: {}", weekly),
                });
            }
        }

        if let Some(finished) = self.finished_date {
            if finished.date_naive() < self.sign_day() {
                return Err(CoverageError::InvalidLoanTerms {
                    message: format!(
                        "finished date {} precedes sign date {}",
                        finished, self.sign_date
                    ),
                });
            }
        }

        for payment in &self.payments {
            self.validate_payment(payment)?;
        }

        Ok(())
    }

    fn validate_payment(&self, payment: &Payment) -> Result<()> {
        if payment.amount.is_negative() {
            return Err(CoverageError::InvalidPaymentAmount {
                payment_id: payment.id,
                amount: payment.amount,
            });
        }

        // compared by calendar day, same granularity as week bucketing
        if payment.date() < self.sign_day() {
            return Err(CoverageError::PaymentBeforeSignDate {
                payment_id: payment.id,
                timestamp: payment.timestamp(),
                sign_date: self.sign_date,
            });
        }

        Ok(())
    }
}

/// builder for loans
#[derive(Debug, Default)]
pub struct LoanBuilder {
    id: Option<LoanId>,
    sign_date: Option<DateTime<Utc>>,
    requested_amount: Option<Money>,
    rate: Option<Rate>,
    week_duration: Option<u32>,
    expected_weekly_payment: Option<Money>,
    payments: Vec<Payment>,
    finished_date: Option<DateTime<Utc>>,
}

impl LoanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: LoanId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn sign_date(mut self, date: DateTime<Utc>) -> Self {
        self.sign_date = Some(date);
        self
    }

    pub fn requested_amount(mut self, amount: Money) -> Self {
        self.requested_amount = Some(amount);
        self
    }

    pub fn rate(mut self, rate: Rate) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn week_duration(mut self, weeks: u32) -> Self {
        self.week_duration = Some(weeks);
        self
    }

    pub fn expected_weekly_payment(mut self, amount: Money) -> Self {
        self.expected_weekly_payment = Some(amount);
        self
    }

    pub fn payment(mut self, payment: Payment) -> Self {
        self.payments.push(payment);
        self
    }

    pub fn payments(mut self, payments: impl IntoIterator<Item = Payment>) -> Self {
        self.payments.extend(payments);
        self
    }

    pub fn finished_date(mut self, date: DateTime<Utc>) -> Self {
        self.finished_date = Some(date);
        self
    }

    /// build and validate
    pub fn build(self) -> Result<Loan> {
        let loan = Loan {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            sign_date: self.sign_date.ok_or(CoverageError::MissingField { field: "sign_date" })?,
            requested_amount: self.requested_amount.unwrap_or(Money::ZERO),
            rate: self.rate.unwrap_or(Rate::ZERO),
            week_duration: self.week_duration,
            expected_weekly_payment: self.expected_weekly_payment,
            payments: self.payments,
            finished_date: self.finished_date,
        };

        loan.validate()?;
        Ok(loan)
    }
}
