//! Error types for structured error handling.
//!
//! This module provides:
//! - `LendingError`: Errors surfaced by the four lifecycle operations
//! - `DependencyError`: Failures of the ledger store, notifier or event sink
//! - `NotificationFailure`: One investor's failed agreement-letter dispatch

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use super::loan::{InvestorId, LoanId, LoanStatus};

/// External collaborator the engine depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collaborator {
    /// Durable loan and investment storage
    LedgerStore,
    /// Agreement-letter delivery
    Notifier,
    /// Lifecycle event publication
    EventSink,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collaborator::LedgerStore => write!(f, "ledger store"),
            Collaborator::Notifier => write!(f, "notifier"),
            Collaborator::EventSink => write!(f, "event sink"),
        }
    }
}

/// Kind of record a lookup refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Loan record
    Loan,
    /// Borrower registry entry
    Borrower,
    /// Investor registry entry
    Investor,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Loan => write!(f, "Loan"),
            EntityKind::Borrower => write!(f, "Borrower"),
            EntityKind::Investor => write!(f, "Investor"),
        }
    }
}

/// Lifecycle operation that can be rejected by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanOperation {
    /// Proposed → Approved
    Approve,
    /// Record an investment
    Invest,
    /// Invested → Disbursed
    Disburse,
}

impl fmt::Display for LoanOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoanOperation::Approve => write!(f, "be approved"),
            LoanOperation::Invest => write!(f, "receive investments"),
            LoanOperation::Disburse => write!(f, "be disbursed"),
        }
    }
}

/// A failed call into an external collaborator.
///
/// # Examples
/// ```
/// use lending_core::types::{Collaborator, DependencyError};
///
/// let err = DependencyError::ledger("connection reset");
/// assert_eq!(err.collaborator, Collaborator::LedgerStore);
/// assert_eq!(format!("{}", err), "ledger store call failed: connection reset");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{collaborator} call failed: {message}")]
pub struct DependencyError {
    /// Which collaborator failed
    pub collaborator: Collaborator,
    /// Failure detail
    pub message: String,
}

impl DependencyError {
    /// Create a dependency error for the given collaborator
    pub fn new(collaborator: Collaborator, message: impl Into<String>) -> Self {
        Self {
            collaborator,
            message: message.into(),
        }
    }

    /// Ledger store failure
    pub fn ledger(message: impl Into<String>) -> Self {
        Self::new(Collaborator::LedgerStore, message)
    }

    /// Notifier failure
    pub fn notifier(message: impl Into<String>) -> Self {
        Self::new(Collaborator::Notifier, message)
    }

    /// Event sink failure
    pub fn event_sink(message: impl Into<String>) -> Self {
        Self::new(Collaborator::EventSink, message)
    }

    /// A collaborator call that did not finish within its deadline
    pub fn timeout(collaborator: Collaborator, after: Duration) -> Self {
        Self::new(collaborator, format!("timed out after {}ms", after.as_millis()))
    }
}

/// One investor whose agreement-letter notification failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFailure {
    /// Investor that was not notified
    pub investor_id: InvestorId,
    /// Failure detail
    pub reason: String,
}

/// Errors returned by the lifecycle operations.
///
/// Every variant except [`LendingError::PartialNotification`] guarantees that no state
/// was written. Use [`LendingError::state_changed`] to tell the two apart.
///
/// # Examples
/// ```
/// use lending_core::types::LendingError;
///
/// let err = LendingError::validation("amount must be greater than 0");
/// assert!(!err.state_changed());
/// assert_eq!(err.code(), "validation_error");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LendingError {
    /// Malformed or out-of-range input, rejected before any storage access
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced loan, borrower or investor is absent
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record
        entity: EntityKind,
        /// Identifier looked up
        id: i64,
    },

    /// Operation is illegal for the loan's current status
    #[error("Loan {loan_id} cannot {operation} from status {status}")]
    StateConflict {
        /// Loan
        loan_id: LoanId,
        /// Status at the time of the attempt
        status: LoanStatus,
        /// Rejected operation
        operation: LoanOperation,
    },

    /// Investment would push the running total past the principal
    #[error(
        "Investment of {requested} exceeds principal of loan {loan_id}: {invested} of {principal} already invested"
    )]
    Overfunding {
        /// Loan
        loan_id: LoanId,
        /// Loan principal
        principal: Decimal,
        /// Running total before the attempt
        invested: Decimal,
        /// Rejected amount
        requested: Decimal,
    },

    /// Disbursement attempted while the running total differs from the principal
    #[error("Loan {loan_id} cannot be disbursed: invested {invested} does not match principal {principal}")]
    Reconciliation {
        /// Loan
        loan_id: LoanId,
        /// Loan principal
        principal: Decimal,
        /// Running total at disbursement
        invested: Decimal,
    },

    /// Ledger store, notifier or event sink call failed
    #[error(transparent)]
    Dependency(#[from] DependencyError),

    /// Funding completed and was persisted, but some investors were not notified
    #[error("Loan {loan_id} is funded but {} agreement-letter notification(s) failed", .failures.len())]
    PartialNotification {
        /// Loan that reached `Invested`
        loan_id: LoanId,
        /// Investors that were not notified
        failures: Vec<NotificationFailure>,
    },
}

impl LendingError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(entity: EntityKind, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// Create a state conflict error
    pub fn state_conflict(loan_id: LoanId, status: LoanStatus, operation: LoanOperation) -> Self {
        Self::StateConflict {
            loan_id,
            status,
            operation,
        }
    }

    /// Whether persisted state changed despite the error.
    ///
    /// Only a partial notification failure leaves a committed transition behind.
    pub fn state_changed(&self) -> bool {
        matches!(self, LendingError::PartialNotification { .. })
    }

    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            LendingError::Validation(_) => "validation_error",
            LendingError::NotFound { .. } => "not_found",
            LendingError::StateConflict { .. } => "state_conflict",
            LendingError::Overfunding { .. } => "overfunding",
            LendingError::Reconciliation { .. } => "reconciliation_error",
            LendingError::Dependency(_) => "dependency_error",
            LendingError::PartialNotification { .. } => "partial_notification",
        }
    }
}
