//! Validated inputs for the four lifecycle operations.
//!
//! Each request collects every rule violation into a single
//! [`LendingError::Validation`] so callers see all problems at once. Validation never
//! touches storage.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{BorrowerId, InvestorId, LendingError, LoanId, OfficerId};

fn into_result(errors: Vec<String>) -> Result<(), LendingError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(LendingError::Validation(errors.join("; ")))
    }
}

fn require_id(errors: &mut Vec<String>, name: &str, id: i64) {
    if id <= 0 {
        errors.push(format!("{} must be a positive identifier", name));
    }
}

fn require_reference(errors: &mut Vec<String>, name: &str, reference: &Option<String>) {
    if let Some(reference) = reference {
        if reference.trim().is_empty() {
            errors.push(format!("{} must not be blank", name));
        }
    }
}

/// Request to propose a new loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateLoanRequest {
    /// Borrower requesting the funds
    pub borrower_id: BorrowerId,
    /// Principal, must be positive
    pub principal_amount: Decimal,
    /// Rate in percent, must be positive
    pub rate: Decimal,
    /// Term in months, at least 1
    #[serde(alias = "loan_term")]
    pub term_months: u32,
}

impl CreateLoanRequest {
    /// Check field ranges
    pub fn validate(&self) -> Result<(), LendingError> {
        let mut errors = Vec::new();
        require_id(&mut errors, "borrower_id", self.borrower_id);
        if self.principal_amount <= Decimal::ZERO {
            errors.push("principal_amount must be greater than 0".to_string());
        }
        if self.rate <= Decimal::ZERO {
            errors.push("rate must be greater than 0".to_string());
        }
        if self.term_months < 1 {
            errors.push("term_months must be at least 1".to_string());
        }
        into_result(errors)
    }
}

/// Request to approve a proposed loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproveLoanRequest {
    /// Loan to approve
    pub loan_id: LoanId,
    /// Field validator who visited the borrower
    pub field_validator_id: OfficerId,
    /// Reference to the validator's proof; issued by the engine when absent
    #[serde(default, alias = "field_validator_picture")]
    pub field_validator_proof: Option<String>,
}

impl ApproveLoanRequest {
    /// Check identifiers and the optional proof reference
    pub fn validate(&self) -> Result<(), LendingError> {
        let mut errors = Vec::new();
        require_id(&mut errors, "loan_id", self.loan_id);
        require_id(&mut errors, "field_validator_id", self.field_validator_id);
        require_reference(&mut errors, "field_validator_proof", &self.field_validator_proof);
        into_result(errors)
    }
}

/// Request to invest in an approved loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestLoanRequest {
    /// Loan to fund
    pub loan_id: LoanId,
    /// Contributing investor
    pub investor_id: InvestorId,
    /// Contribution, must be positive
    pub amount: Decimal,
}

impl InvestLoanRequest {
    /// Check identifiers and amount
    pub fn validate(&self) -> Result<(), LendingError> {
        let mut errors = Vec::new();
        require_id(&mut errors, "loan_id", self.loan_id);
        require_id(&mut errors, "investor_id", self.investor_id);
        if self.amount <= Decimal::ZERO {
            errors.push("amount must be greater than 0".to_string());
        }
        into_result(errors)
    }
}

/// Request to disburse a fully funded loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisburseLoanRequest {
    /// Loan to disburse
    pub loan_id: LoanId,
    /// Field officer handing over the funds
    pub field_officer_id: OfficerId,
    /// Signed agreement letter reference; issued by the engine when absent
    #[serde(default)]
    pub agreement_letter: Option<String>,
}

impl DisburseLoanRequest {
    /// Check identifiers and the optional agreement reference
    pub fn validate(&self) -> Result<(), LendingError> {
        let mut errors = Vec::new();
        require_id(&mut errors, "loan_id", self.loan_id);
        require_id(&mut errors, "field_officer_id", self.field_officer_id);
        require_reference(&mut errors, "agreement_letter", &self.agreement_letter);
        into_result(errors)
    }
}
