//! Core domain types.
//!
//! This module provides:
//! - Identifier aliases (`LoanId`, `BorrowerId`, `InvestorId`, `OfficerId`)
//! - `LoanStatus`: the four lifecycle states in their required order
//! - `Loan`, `Investment`, `InvestmentSummary`, `LoanDetail`: ledger records
//! - `LendingError`, `DependencyError`: structured error handling

pub mod error;
pub mod loan;

pub use error::{
    Collaborator, DependencyError, EntityKind, LendingError, LoanOperation, NotificationFailure,
};
pub use loan::{
    BorrowerId, Investment, InvestmentSummary, InvestorId, Loan, LoanDetail, LoanId, LoanStatus,
    OfficerId,
};
