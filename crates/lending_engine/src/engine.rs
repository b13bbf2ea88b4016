//! The lifecycle engine.
//!
//! Each operation validates its request, takes the loan's guard (mutations only),
//! checks every precondition against fresh ledger reads, and writes at most once.
//! Side effects run after the guard is released: the notification fan-out is awaited,
//! the lifecycle event is detached.

use chrono::Utc;
use lending_core::lifecycle::{assess_funding, FundingCheck};
use lending_core::math::interest::{calculate_roi, percent_to_fraction};
use lending_core::request::{
    ApproveLoanRequest, CreateLoanRequest, DisburseLoanRequest, InvestLoanRequest,
};
use lending_core::types::{
    Collaborator, DependencyError, EntityKind, Investment, InvestorId, LendingError, Loan,
    LoanDetail, LoanId, LoanOperation,
};
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

use crate::config::EngineConfig;
use crate::deadline::bounded;
use crate::dispatch::EventDispatcher;
use crate::event::{LoanEvent, LoanEventType};
use crate::fanout::NotificationFanout;
use crate::locks::LoanLocks;
use crate::observer::{LifecycleObserver, TracingObserver};
use crate::ports::{EventSink, LedgerStore, Notifier};

/// Result of a successful investment.
#[derive(Debug, Clone, PartialEq)]
pub struct InvestmentOutcome {
    /// The stored investment, id and ROI assigned
    pub investment: Investment,
    /// The loan after the investment
    pub loan: Loan,
    /// How the investment related to the remaining capacity
    pub funding: FundingCheck,
    /// Running total including this investment
    pub running_total: Decimal,
    /// Investors that received the agreement letter (empty unless funding completed)
    pub notified: Vec<InvestorId>,
}

impl InvestmentOutcome {
    /// Whether this investment completed funding
    pub fn completed_funding(&self) -> bool {
        self.funding.completes()
    }
}

/// Builder for [`LifecycleEngine`].
pub struct EngineBuilder {
    ledger: Arc<dyn LedgerStore>,
    notifier: Option<Arc<dyn Notifier>>,
    event_sink: Option<Arc<dyn EventSink>>,
    observer: Arc<dyn LifecycleObserver>,
    config: EngineConfig,
}

impl EngineBuilder {
    /// Attach the agreement-letter notifier
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Attach the lifecycle event sink
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Replace the default [`TracingObserver`]
    pub fn observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Set the engine configuration
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the engine
    pub fn build(self) -> LifecycleEngine {
        let timeout = self.config.dependency_timeout;
        LifecycleEngine {
            ledger: self.ledger,
            locks: LoanLocks::new(),
            fanout: NotificationFanout::new(self.notifier, self.observer.clone(), timeout),
            events: EventDispatcher::new(self.event_sink, self.observer.clone(), timeout),
            observer: self.observer,
            config: self.config,
        }
    }
}

/// Drives loans through their lifecycle against an external ledger.
///
/// Safe to share across tasks; operations on different loans never wait on each
/// other.
pub struct LifecycleEngine {
    ledger: Arc<dyn LedgerStore>,
    locks: LoanLocks,
    fanout: NotificationFanout,
    events: EventDispatcher,
    observer: Arc<dyn LifecycleObserver>,
    config: EngineConfig,
}

impl LifecycleEngine {
    /// Start building an engine over `ledger`
    pub fn builder(ledger: Arc<dyn LedgerStore>) -> EngineBuilder {
        EngineBuilder {
            ledger,
            notifier: None,
            event_sink: None,
            observer: Arc::new(TracingObserver),
            config: EngineConfig::default(),
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Propose a new loan. Returns the stored loan with its assigned id.
    pub async fn create_loan(&self, request: CreateLoanRequest) -> Result<Loan, LendingError> {
        let result = self.try_create_loan(&request).await;
        self.settle("create_loan", result)
    }

    /// Approve a proposed loan
    pub async fn approve_loan(&self, request: ApproveLoanRequest) -> Result<Loan, LendingError> {
        let result = self.try_approve_loan(&request).await;
        self.settle("approve_loan", result)
    }

    /// Record an investment; completes funding when the principal is reached.
    ///
    /// On completion every distinct investor is notified before this returns. If some
    /// notifications fail the loan stays `Invested` and
    /// [`LendingError::PartialNotification`] is returned.
    pub async fn invest_loan(
        &self,
        request: InvestLoanRequest,
    ) -> Result<InvestmentOutcome, LendingError> {
        let result = self.try_invest_loan(&request).await;
        self.settle("invest_loan", result)
    }

    /// Disburse a fully funded loan
    pub async fn disburse_loan(&self, request: DisburseLoanRequest) -> Result<Loan, LendingError> {
        let result = self.try_disburse_loan(&request).await;
        self.settle("disburse_loan", result)
    }

    /// Loan with its per-investor investment totals
    pub async fn loan_detail(&self, loan_id: LoanId) -> Result<LoanDetail, LendingError> {
        let result: Result<LoanDetail, LendingError> = async {
            let loan = self.load_loan(loan_id).await?;
            let investment_detail = self
                .ledger_call(self.ledger.investment_summary(loan_id))
                .await?;
            Ok(LoanDetail {
                loan,
                investment_detail,
            })
        }
        .await;
        self.settle("loan_detail", result)
    }

    /// Running total of a loan
    pub async fn total_invested(&self, loan_id: LoanId) -> Result<Decimal, LendingError> {
        self.ledger_call(self.ledger.total_invested(loan_id)).await
    }

    async fn try_create_loan(&self, request: &CreateLoanRequest) -> Result<Loan, LendingError> {
        request.validate()?;

        if !self
            .ledger_call(self.ledger.borrower_exists(request.borrower_id))
            .await?
        {
            return Err(LendingError::not_found(EntityKind::Borrower, request.borrower_id));
        }

        let mut loan = Loan::propose(
            request.borrower_id,
            request.principal_amount,
            request.rate,
            request.term_months,
            Utc::now(),
        )?;
        loan.id = self.ledger_call(self.ledger.create_loan(&loan)).await?;

        self.observer.loan_transitioned(&loan, None);
        self.events
            .emit(LoanEvent::snapshot(LoanEventType::LoanCreated, loan.id, &loan));
        Ok(loan)
    }

    async fn try_approve_loan(&self, request: &ApproveLoanRequest) -> Result<Loan, LendingError> {
        request.validate()?;

        let guard = self.lock_existing(request.loan_id).await?;
        let mut loan = self.load_loan(request.loan_id).await?;
        let from = loan.status;

        let proof = request
            .field_validator_proof
            .clone()
            .unwrap_or_else(|| self.config.proof_ref(loan.id));
        loan.approve(request.field_validator_id, proof, Utc::now())?;
        self.ledger_call(self.ledger.update_loan(&loan)).await?;
        drop(guard);

        self.observer.loan_transitioned(&loan, Some(from));
        self.events
            .emit(LoanEvent::snapshot(LoanEventType::LoanApproved, loan.id, request));
        Ok(loan)
    }

    async fn try_invest_loan(
        &self,
        request: &InvestLoanRequest,
    ) -> Result<InvestmentOutcome, LendingError> {
        request.validate()?;

        let guard = self.lock_existing(request.loan_id).await?;
        let loan = self.load_loan(request.loan_id).await?;
        if !self
            .ledger_call(self.ledger.investor_exists(request.investor_id))
            .await?
        {
            return Err(LendingError::not_found(EntityKind::Investor, request.investor_id));
        }
        loan.ensure_can(LoanOperation::Invest)?;

        let invested = self.ledger_call(self.ledger.total_invested(loan.id)).await?;
        let funding = assess_funding(loan.principal_amount, invested, request.amount);
        if !funding.is_acceptable() {
            return Err(LendingError::Overfunding {
                loan_id: loan.id,
                principal: loan.principal_amount,
                invested,
                requested: request.amount,
            });
        }

        let now = Utc::now();
        let mut investment = Investment {
            id: 0,
            loan_id: loan.id,
            investor_id: request.investor_id,
            amount: request.amount,
            roi: calculate_roi(
                loan.principal_amount,
                percent_to_fraction(loan.rate),
                request.amount,
            )
            .ok_or_else(|| LendingError::validation("amount overflows the investment return"))?,
            created_at: now,
        };

        // Recipients are read before the write so a committed completion never
        // depends on a later ledger call.
        let completion = if funding.completes() {
            let mut funded = loan.clone();
            funded.mark_invested(self.config.agreement_letter_ref(loan.id), now)?;
            let mut recipients = self.ledger_call(self.ledger.investors_for(loan.id)).await?;
            recipients.push(request.investor_id);
            Some((funded, recipients))
        } else {
            None
        };

        investment.id = self
            .ledger_call(
                self.ledger
                    .record_investment(&investment, completion.as_ref().map(|(l, _)| l)),
            )
            .await?;
        drop(guard);

        let running_total = invested + request.amount;
        self.observer.investment_recorded(&investment, running_total);

        let from = loan.status;
        let (loan, recipients) = match completion {
            Some((funded, recipients)) => {
                self.observer.loan_transitioned(&funded, Some(from));
                (funded, recipients)
            }
            None => (loan, Vec::new()),
        };

        self.events.emit(LoanEvent::snapshot(
            LoanEventType::LoanInvested,
            loan.id,
            &investment,
        ));

        let mut notified = Vec::new();
        if funding.completes() {
            let letter = loan.agreement_letter_ref.as_deref().unwrap_or_default();
            let report = self.fanout.notify_all(loan.id, letter, &recipients).await;
            if !report.is_complete() {
                return Err(LendingError::PartialNotification {
                    loan_id: loan.id,
                    failures: report.failures,
                });
            }
            notified = report.delivered;
        }

        Ok(InvestmentOutcome {
            investment,
            loan,
            funding,
            running_total,
            notified,
        })
    }

    async fn try_disburse_loan(&self, request: &DisburseLoanRequest) -> Result<Loan, LendingError> {
        request.validate()?;

        let guard = self.lock_existing(request.loan_id).await?;
        let mut loan = self.load_loan(request.loan_id).await?;
        loan.ensure_can(LoanOperation::Disburse)?;

        let invested = self.ledger_call(self.ledger.total_invested(loan.id)).await?;
        loan.reconcile(invested)?;

        if !self
            .ledger_call(self.ledger.borrower_exists(loan.borrower_id))
            .await?
        {
            return Err(LendingError::not_found(EntityKind::Borrower, loan.borrower_id));
        }

        let from = loan.status;
        let agreement = request
            .agreement_letter
            .clone()
            .unwrap_or_else(|| self.config.agreement_letter_ref(loan.id));
        loan.disburse(request.field_officer_id, agreement, Utc::now())?;
        self.ledger_call(self.ledger.update_loan(&loan)).await?;
        drop(guard);

        self.observer.loan_transitioned(&loan, Some(from));
        self.events
            .emit(LoanEvent::snapshot(LoanEventType::LoanDisbursed, loan.id, request));
        Ok(loan)
    }

    /// Take the guard of a loan known to the ledger.
    ///
    /// Unknown ids fail before an arena entry is created, so the arena only ever
    /// holds loans that exist.
    async fn lock_existing(&self, loan_id: LoanId) -> Result<OwnedMutexGuard<()>, LendingError> {
        self.load_loan(loan_id).await?;
        Ok(self.locks.acquire(loan_id).await)
    }

    async fn load_loan(&self, loan_id: LoanId) -> Result<Loan, LendingError> {
        self.ledger_call(self.ledger.get_loan(loan_id))
            .await?
            .ok_or_else(|| LendingError::not_found(EntityKind::Loan, loan_id))
    }

    async fn ledger_call<T, F>(&self, call: F) -> Result<T, LendingError>
    where
        F: Future<Output = Result<T, DependencyError>>,
    {
        Ok(bounded(Collaborator::LedgerStore, self.config.dependency_timeout, call).await?)
    }

    fn settle<T>(
        &self,
        operation: &'static str,
        result: Result<T, LendingError>,
    ) -> Result<T, LendingError> {
        if let Err(e) = &result {
            self.observer.operation_failed(operation, e);
        }
        result
    }
}
