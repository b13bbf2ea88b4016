//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use lending_engine::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BORROWER: BorrowerId = 1;
pub const VALIDATOR: OfficerId = 8;
pub const OFFICER: OfficerId = 9;

/// Notifier that records every recipient and rejects a configured set.
#[derive(Default)]
pub struct MockNotifier {
    pub sent: Mutex<Vec<AgreementNotice>>,
    pub reject: HashSet<InvestorId>,
    pub delay: Option<Duration>,
}

impl MockNotifier {
    pub fn rejecting(ids: impl IntoIterator<Item = InvestorId>) -> Self {
        Self {
            reject: ids.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn recipients(&self) -> Vec<InvestorId> {
        let mut ids: Vec<_> = self
            .sent
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.investor_id)
            .collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_agreement_letter(&self, notice: &AgreementNotice) -> Result<(), DependencyError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.reject.contains(&notice.investor_id) {
            return Err(DependencyError::notifier(format!(
                "mailbox of investor {} unavailable",
                notice.investor_id
            )));
        }
        self.sent.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

/// Event sink that keeps everything it receives.
#[derive(Default)]
pub struct MemorySink {
    pub events: Mutex<Vec<LoanEvent>>,
    pub fail: AtomicBool,
}

impl MemorySink {
    pub fn types(&self) -> Vec<LoanEventType> {
        self.events.lock().unwrap().iter().map(|e| e.event_type).collect()
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn publish(&self, event: &LoanEvent) -> Result<(), DependencyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DependencyError::event_sink("broker unreachable"));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub struct Harness {
    pub engine: Arc<LifecycleEngine>,
    pub ledger: Arc<InMemoryLedger>,
    pub notifier: Arc<MockNotifier>,
    pub sink: Arc<MemorySink>,
    pub observer: Arc<RecordingObserver>,
}

impl Harness {
    pub fn new(investors: impl IntoIterator<Item = InvestorId>) -> Self {
        Self::with_notifier(investors, MockNotifier::default())
    }

    pub fn with_notifier(
        investors: impl IntoIterator<Item = InvestorId>,
        notifier: MockNotifier,
    ) -> Self {
        let ledger = Arc::new(
            InMemoryLedger::new()
                .with_borrowers([BORROWER])
                .with_investors(investors),
        );
        let notifier = Arc::new(notifier);
        let sink = Arc::new(MemorySink::default());
        let observer = Arc::new(RecordingObserver::new());
        let engine = LifecycleEngine::builder(ledger.clone())
            .notifier(notifier.clone())
            .event_sink(sink.clone())
            .observer(observer.clone())
            .build();

        Self {
            engine: Arc::new(engine),
            ledger,
            notifier,
            sink,
            observer,
        }
    }

    pub async fn approved_loan(&self, principal: Decimal) -> Loan {
        let loan = self
            .engine
            .create_loan(CreateLoanRequest {
                borrower_id: BORROWER,
                principal_amount: principal,
                rate: Decimal::from(5),
                term_months: 12,
            })
            .await
            .unwrap();
        self.engine
            .approve_loan(ApproveLoanRequest {
                loan_id: loan.id,
                field_validator_id: VALIDATOR,
                field_validator_proof: Some(format!("proof-{}", loan.id)),
            })
            .await
            .unwrap()
    }

    pub async fn invest(
        &self,
        loan_id: LoanId,
        investor_id: InvestorId,
        amount: Decimal,
    ) -> Result<InvestmentOutcome, LendingError> {
        self.engine
            .invest_loan(InvestLoanRequest {
                loan_id,
                investor_id,
                amount,
            })
            .await
    }

    pub async fn disburse(&self, loan_id: LoanId) -> Result<Loan, LendingError> {
        self.engine
            .disburse_loan(DisburseLoanRequest {
                loan_id,
                field_officer_id: OFFICER,
                agreement_letter: None,
            })
            .await
    }

    pub async fn stored(&self, loan_id: LoanId) -> Loan {
        self.ledger.get_loan(loan_id).await.unwrap().unwrap()
    }
}
