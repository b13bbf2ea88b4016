//! Loan lifecycle state machine.
//!
//! Every transition goes through a single private `advance` step, which only permits moving to the
//! immediate successor state. Each trigger checks its precondition before touching
//! the record, so a rejected transition leaves the loan exactly as it was.
//!
//! | Transition | Trigger |
//! |---|---|
//! | (create) → Proposed | [`Loan::propose`] |
//! | Proposed → Approved | [`Loan::approve`] |
//! | Approved → Invested | [`Loan::mark_invested`], once [`assess_funding`] reports completion |
//! | Invested → Disbursed | [`Loan::disburse`], after [`Loan::reconcile`] |

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::cmp::Ordering;

use crate::math::interest::calculate_total_interest;
use crate::types::{BorrowerId, LendingError, Loan, LoanOperation, LoanStatus, OfficerId};

/// Outcome of comparing a prospective investment against the remaining capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundingCheck {
    /// The loan stays under-funded; `remaining` is left after this amount
    Under {
        /// Capacity left after the investment
        remaining: Decimal,
    },
    /// The investment brings the running total exactly to the principal
    Completes,
    /// The investment would overshoot the principal by `excess`
    Exceeds {
        /// Amount past the principal
        excess: Decimal,
    },
}

impl FundingCheck {
    /// Whether the investment may be recorded
    pub fn is_acceptable(&self) -> bool {
        !matches!(self, FundingCheck::Exceeds { .. })
    }

    /// Whether the investment completes funding
    pub fn completes(&self) -> bool {
        matches!(self, FundingCheck::Completes)
    }
}

/// Compare `running_total + amount` against `principal`.
///
/// Works on the remaining capacity, so an oversized `amount` reports
/// [`FundingCheck::Exceeds`] instead of overflowing.
///
/// # Examples
/// ```
/// use lending_core::lifecycle::{assess_funding, FundingCheck};
/// use rust_decimal::Decimal;
///
/// let principal = Decimal::from(500);
/// assert_eq!(
///     assess_funding(principal, Decimal::from(300), Decimal::from(200)),
///     FundingCheck::Completes
/// );
/// assert_eq!(
///     assess_funding(principal, Decimal::from(300), Decimal::from(300)),
///     FundingCheck::Exceeds { excess: Decimal::from(100) }
/// );
/// ```
pub fn assess_funding(principal: Decimal, running_total: Decimal, amount: Decimal) -> FundingCheck {
    let capacity = principal.saturating_sub(running_total);
    match amount.cmp(&capacity) {
        Ordering::Less => FundingCheck::Under {
            remaining: capacity - amount,
        },
        Ordering::Equal => FundingCheck::Completes,
        Ordering::Greater => FundingCheck::Exceeds {
            excess: amount.saturating_sub(capacity),
        },
    }
}

impl Loan {
    /// Build a new `Proposed` loan with its total interest derived.
    ///
    /// The identifier stays 0 until the ledger store assigns one. Fails with
    /// [`LendingError::Validation`] when the interest is not representable.
    pub fn propose(
        borrower_id: BorrowerId,
        principal_amount: Decimal,
        rate: Decimal,
        term_months: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, LendingError> {
        let total_interest = calculate_total_interest(principal_amount, rate).ok_or_else(|| {
            LendingError::validation("principal_amount and rate overflow the total interest")
        })?;
        Ok(Self {
            id: 0,
            borrower_id,
            principal_amount,
            rate,
            term_months,
            total_interest,
            status: LoanStatus::Proposed,
            agreement_letter_ref: None,
            field_validator_id: None,
            field_validator_proof_ref: None,
            field_officer_id: None,
            approval_timestamp: None,
            disbursement_timestamp: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Proposed → Approved. Attaches the validator and their proof.
    pub fn approve(
        &mut self,
        validator_id: OfficerId,
        proof_ref: String,
        at: DateTime<Utc>,
    ) -> Result<(), LendingError> {
        self.advance(LoanStatus::Approved, LoanOperation::Approve, at)?;
        self.field_validator_id = Some(validator_id);
        self.field_validator_proof_ref = Some(proof_ref);
        self.approval_timestamp = Some(at);
        Ok(())
    }

    /// Approved → Invested. Issues the agreement letter reference.
    pub fn mark_invested(
        &mut self,
        agreement_letter_ref: String,
        at: DateTime<Utc>,
    ) -> Result<(), LendingError> {
        self.advance(LoanStatus::Invested, LoanOperation::Invest, at)?;
        self.agreement_letter_ref = Some(agreement_letter_ref);
        Ok(())
    }

    /// Verify the running total matches the principal exactly.
    ///
    /// Holds by construction while the funding cap is enforced; a mismatch means
    /// the ledger was corrupted outside the engine.
    pub fn reconcile(&self, running_total: Decimal) -> Result<(), LendingError> {
        if running_total == self.principal_amount {
            Ok(())
        } else {
            Err(LendingError::Reconciliation {
                loan_id: self.id,
                principal: self.principal_amount,
                invested: running_total,
            })
        }
    }

    /// Invested → Disbursed. Records the officer and the final agreement letter.
    pub fn disburse(
        &mut self,
        field_officer_id: OfficerId,
        agreement_letter_ref: String,
        at: DateTime<Utc>,
    ) -> Result<(), LendingError> {
        self.advance(LoanStatus::Disbursed, LoanOperation::Disburse, at)?;
        self.field_officer_id = Some(field_officer_id);
        self.agreement_letter_ref = Some(agreement_letter_ref);
        self.disbursement_timestamp = Some(at);
        Ok(())
    }

    /// Require that `operation` is legal from the current status
    pub fn ensure_can(&self, operation: LoanOperation) -> Result<(), LendingError> {
        let legal = match operation {
            LoanOperation::Approve => self.status == LoanStatus::Proposed,
            LoanOperation::Invest => self.status.accepts_investment(),
            LoanOperation::Disburse => self.status == LoanStatus::Invested,
        };
        if legal {
            Ok(())
        } else {
            Err(LendingError::state_conflict(self.id, self.status, operation))
        }
    }

    fn advance(
        &mut self,
        target: LoanStatus,
        operation: LoanOperation,
        at: DateTime<Utc>,
    ) -> Result<(), LendingError> {
        if !self.status.can_advance_to(target) {
            return Err(LendingError::state_conflict(self.id, self.status, operation));
        }
        self.status = target;
        self.updated_at = at;
        Ok(())
    }
}
