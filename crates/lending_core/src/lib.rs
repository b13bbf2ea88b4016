//! # lending_core: Foundation for the Peer-to-Peer Loan Lifecycle
//!
//! ## Layer 1 (Foundation) Role
//!
//! lending_core is the bottom layer of the workspace, providing:
//! - Loan and investment records (`types::loan`)
//! - The forward-only lifecycle state machine (`lifecycle`)
//! - Flat-rate interest and ROI calculations (`math::interest`)
//! - Validated request types for the four lifecycle operations (`request`)
//! - Error types: `LendingError`, `DependencyError` (`types::error`)
//!
//! ## Zero I/O Principle
//!
//! Nothing in this crate performs I/O or spawns tasks. Storage, notification and
//! event publication are driven by `lending_engine`; this crate only decides
//! whether a transition is legal and what the resulting record looks like.
//!
//! ## Usage Examples
//!
//! ```rust
//! use lending_core::math::interest::{calculate_roi, calculate_total_interest};
//! use rust_decimal::Decimal;
//!
//! let interest = calculate_total_interest(Decimal::from(1_000_000), Decimal::from(5));
//! assert_eq!(interest, Some(Decimal::from(50_000)));
//!
//! let roi = calculate_roi(
//!     Decimal::from(500_000),
//!     Decimal::new(5, 2),
//!     Decimal::from(100_000),
//! );
//! assert_eq!(roi, Some(Decimal::from(125_000)));
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod lifecycle;
pub mod math;
pub mod request;
pub mod types;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::lifecycle::{assess_funding, FundingCheck};
    pub use crate::math::interest::{calculate_roi, calculate_total_interest};
    pub use crate::request::{
        ApproveLoanRequest, CreateLoanRequest, DisburseLoanRequest, InvestLoanRequest,
    };
    pub use crate::types::{
        BorrowerId, Collaborator, DependencyError, EntityKind, Investment, InvestmentSummary,
        InvestorId, LendingError, Loan, LoanDetail, LoanId, LoanOperation, LoanStatus,
        NotificationFailure, OfficerId,
    };
}
