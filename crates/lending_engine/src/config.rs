//! Engine configuration.

use lending_core::types::LoanId;
use std::time::Duration;

/// Default base for issued agreement-letter references
pub const DEFAULT_AGREEMENT_LETTER_BASE: &str = "https://documents.lendflow.local/agreement-letter";

/// Default base for issued validator-proof references
pub const DEFAULT_PROOF_BASE: &str = "https://documents.lendflow.local/proof-validator";

/// Engine tuning and reference issuance
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Deadline applied to every ledger, notifier and event-sink call.
    /// `None` waits indefinitely.
    pub dependency_timeout: Option<Duration>,
    /// Base URL for agreement letters
    pub agreement_letter_base: String,
    /// Base URL for field validator proofs
    pub proof_base: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dependency_timeout: None,
            agreement_letter_base: DEFAULT_AGREEMENT_LETTER_BASE.to_string(),
            proof_base: DEFAULT_PROOF_BASE.to_string(),
        }
    }
}

impl EngineConfig {
    /// Set the dependency call deadline
    pub fn with_dependency_timeout(mut self, timeout: Duration) -> Self {
        self.dependency_timeout = Some(timeout);
        self
    }

    /// Agreement letter reference for a loan
    pub fn agreement_letter_ref(&self, loan_id: LoanId) -> String {
        format!("{}/loan-{}", self.agreement_letter_base.trim_end_matches('/'), loan_id)
    }

    /// Validator proof reference for a loan
    pub fn proof_ref(&self, loan_id: LoanId) -> String {
        format!("{}/loan-{}", self.proof_base.trim_end_matches('/'), loan_id)
    }
}
