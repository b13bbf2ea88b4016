//! Collaborator contracts consumed by the engine.
//!
//! Transport and encoding are the implementor's business. Every method reports
//! failure as a [`DependencyError`]; the engine never retries.

use async_trait::async_trait;
use lending_core::types::{
    BorrowerId, DependencyError, Investment, InvestmentSummary, InvestorId, Loan, LoanId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::event::LoanEvent;

/// Durable storage for loans and investments.
///
/// The engine serialises all mutations of one loan, so implementations only need
/// each individual call to be atomic. [`LedgerStore::record_investment`] is the one
/// compound write and must commit both of its records or neither.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Persist a new loan and return its assigned id
    async fn create_loan(&self, loan: &Loan) -> Result<LoanId, DependencyError>;

    /// Fetch a loan, `None` when absent
    async fn get_loan(&self, id: LoanId) -> Result<Option<Loan>, DependencyError>;

    /// Replace a stored loan
    async fn update_loan(&self, loan: &Loan) -> Result<(), DependencyError>;

    /// Append an investment and return its assigned id
    async fn create_investment(&self, investment: &Investment) -> Result<i64, DependencyError>;

    /// Sum of all investment amounts for a loan (zero when none)
    async fn total_invested(&self, loan_id: LoanId) -> Result<Decimal, DependencyError>;

    /// Investors that funded a loan
    async fn investors_for(&self, loan_id: LoanId) -> Result<Vec<InvestorId>, DependencyError>;

    /// Per-investor totals for a loan
    async fn investment_summary(
        &self,
        loan_id: LoanId,
    ) -> Result<Vec<InvestmentSummary>, DependencyError>;

    /// Whether the borrower is registered
    async fn borrower_exists(&self, id: BorrowerId) -> Result<bool, DependencyError>;

    /// Whether the investor is registered
    async fn investor_exists(&self, id: InvestorId) -> Result<bool, DependencyError>;

    /// Append an investment and, when funding completes, store the funded loan.
    ///
    /// Both writes land in one transaction. On error neither the investment nor the
    /// loan update may be visible.
    async fn record_investment(
        &self,
        investment: &Investment,
        funded_loan: Option<&Loan>,
    ) -> Result<i64, DependencyError>;
}

/// Agreement letter addressed to one investor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementNotice {
    /// Funded loan
    pub loan_id: LoanId,
    /// Recipient
    pub investor_id: InvestorId,
    /// Agreement letter reference issued at funding
    pub agreement_letter_ref: String,
}

/// Delivers agreement letters. Each call is independent of the others.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send the agreement letter to a single investor
    async fn send_agreement_letter(&self, notice: &AgreementNotice) -> Result<(), DependencyError>;
}

/// Receives lifecycle events. Delivery guarantees are the sink's own.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Publish one event
    async fn publish(&self, event: &LoanEvent) -> Result<(), DependencyError>;
}
