//! In-memory ledger store.

use async_trait::async_trait;
use lending_core::types::{
    BorrowerId, DependencyError, Investment, InvestmentSummary, InvestorId, Loan, LoanId,
};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::RwLock;

use crate::ports::LedgerStore;

#[derive(Debug, Default)]
struct LedgerState {
    loans: BTreeMap<LoanId, Loan>,
    investments: Vec<Investment>,
    borrowers: HashSet<BorrowerId>,
    investors: HashSet<InvestorId>,
    next_loan_id: LoanId,
    next_investment_id: i64,
}

impl LedgerState {
    fn insert_investment(&mut self, investment: &Investment) -> Result<i64, DependencyError> {
        if !self.loans.contains_key(&investment.loan_id) {
            return Err(DependencyError::ledger(format!(
                "investment references unknown loan {}",
                investment.loan_id
            )));
        }
        self.next_investment_id += 1;
        let id = self.next_investment_id;
        self.investments.push(Investment {
            id,
            ..investment.clone()
        });
        Ok(id)
    }

    fn replace_loan(&mut self, loan: &Loan) -> Result<(), DependencyError> {
        match self.loans.get_mut(&loan.id) {
            Some(stored) => {
                *stored = loan.clone();
                Ok(())
            }
            None => Err(DependencyError::ledger(format!("loan {} does not exist", loan.id))),
        }
    }
}

/// Strongly consistent ledger kept in process memory.
///
/// Every call is atomic under one lock, and [`LedgerStore::record_investment`] writes
/// the investment and the funded loan together. Ids start at 1.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    /// Create an empty ledger with no registered parties
    pub fn new() -> Self {
        Self::default()
    }

    /// Register borrowers
    pub fn with_borrowers(self, ids: impl IntoIterator<Item = BorrowerId>) -> Self {
        self.write().borrowers.extend(ids);
        self
    }

    /// Register investors
    pub fn with_investors(self, ids: impl IntoIterator<Item = InvestorId>) -> Self {
        self.write().investors.extend(ids);
        self
    }

    /// Register one borrower
    pub fn register_borrower(&self, id: BorrowerId) {
        self.write().borrowers.insert(id);
    }

    /// Register one investor
    pub fn register_investor(&self, id: InvestorId) {
        self.write().investors.insert(id);
    }

    /// Remove a borrower from the registry; returns whether it was present
    pub fn remove_borrower(&self, id: BorrowerId) -> bool {
        self.write().borrowers.remove(&id)
    }

    /// All investments for a loan in insertion order
    pub fn investments_for(&self, loan_id: LoanId) -> Vec<Investment> {
        self.read()
            .investments
            .iter()
            .filter(|inv| inv.loan_id == loan_id)
            .cloned()
            .collect()
    }

    /// Number of stored loans
    pub fn loan_count(&self) -> usize {
        self.read().loans.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, LedgerState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, LedgerState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn create_loan(&self, loan: &Loan) -> Result<LoanId, DependencyError> {
        let mut state = self.write();
        state.next_loan_id += 1;
        let id = state.next_loan_id;
        state.loans.insert(
            id,
            Loan {
                id,
                ..loan.clone()
            },
        );
        Ok(id)
    }

    async fn get_loan(&self, id: LoanId) -> Result<Option<Loan>, DependencyError> {
        Ok(self.read().loans.get(&id).cloned())
    }

    async fn update_loan(&self, loan: &Loan) -> Result<(), DependencyError> {
        self.write().replace_loan(loan)
    }

    async fn create_investment(&self, investment: &Investment) -> Result<i64, DependencyError> {
        self.write().insert_investment(investment)
    }

    async fn total_invested(&self, loan_id: LoanId) -> Result<Decimal, DependencyError> {
        Ok(self
            .read()
            .investments
            .iter()
            .filter(|inv| inv.loan_id == loan_id)
            .map(|inv| inv.amount)
            .sum())
    }

    async fn investors_for(&self, loan_id: LoanId) -> Result<Vec<InvestorId>, DependencyError> {
        let investors: BTreeSet<InvestorId> = self
            .read()
            .investments
            .iter()
            .filter(|inv| inv.loan_id == loan_id)
            .map(|inv| inv.investor_id)
            .collect();
        Ok(investors.into_iter().collect())
    }

    async fn investment_summary(
        &self,
        loan_id: LoanId,
    ) -> Result<Vec<InvestmentSummary>, DependencyError> {
        Ok(InvestmentSummary::aggregate(&self.investments_for(loan_id)))
    }

    async fn borrower_exists(&self, id: BorrowerId) -> Result<bool, DependencyError> {
        Ok(self.read().borrowers.contains(&id))
    }

    async fn investor_exists(&self, id: InvestorId) -> Result<bool, DependencyError> {
        Ok(self.read().investors.contains(&id))
    }

    async fn record_investment(
        &self,
        investment: &Investment,
        funded_loan: Option<&Loan>,
    ) -> Result<i64, DependencyError> {
        let mut state = self.write();
        if let Some(loan) = funded_loan {
            if !state.loans.contains_key(&loan.id) {
                return Err(DependencyError::ledger(format!("loan {} does not exist", loan.id)));
            }
        }
        let id = state.insert_investment(investment)?;
        if let Some(loan) = funded_loan {
            state.replace_loan(loan)?;
        }
        Ok(id)
    }
}
