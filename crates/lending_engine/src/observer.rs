//! Injected observation of engine activity.
//!
//! The engine never logs directly. It reports what happened to a
//! [`LifecycleObserver`]: [`TracingObserver`] turns reports into `tracing` events,
//! [`RecordingObserver`] keeps them for assertions, including reports that arrive
//! from detached tasks after the triggering operation has returned.

use lending_core::types::{
    DependencyError, Investment, InvestorId, LendingError, Loan, LoanId, LoanStatus,
};
use rust_decimal::Decimal;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::event::{LoanEvent, LoanEventType};
use crate::ports::AgreementNotice;

/// Receives reports of engine activity. All methods default to no-ops.
pub trait LifecycleObserver: Send + Sync {
    /// A loan entered `loan.status`; `from` is `None` on creation
    fn loan_transitioned(&self, _loan: &Loan, _from: Option<LoanStatus>) {}

    /// An investment was written; `running_total` includes it
    fn investment_recorded(&self, _investment: &Investment, _running_total: Decimal) {}

    /// An operation returned an error
    fn operation_failed(&self, _operation: &'static str, _error: &LendingError) {}

    /// An agreement letter was delivered
    fn notification_sent(&self, _notice: &AgreementNotice) {}

    /// An agreement letter could not be delivered
    fn notification_failed(&self, _notice: &AgreementNotice, _error: &DependencyError) {}

    /// Funding completed but no notifier is configured
    fn notifier_unavailable(&self, _loan_id: LoanId) {}

    /// A detached publication finished
    fn event_published(&self, _event: &LoanEvent) {}

    /// A detached publication failed
    fn event_failed(&self, _event: &LoanEvent, _error: &DependencyError) {}
}

/// Forwards every report to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl LifecycleObserver for TracingObserver {
    fn loan_transitioned(&self, loan: &Loan, from: Option<LoanStatus>) {
        match from {
            None => info!(
                loan_id = loan.id,
                borrower_id = loan.borrower_id,
                principal = %loan.principal_amount,
                "Loan proposed"
            ),
            Some(from) => info!(loan_id = loan.id, %from, to = %loan.status, "Loan transitioned"),
        }
    }

    fn investment_recorded(&self, investment: &Investment, running_total: Decimal) {
        info!(
            loan_id = investment.loan_id,
            investor_id = investment.investor_id,
            amount = %investment.amount,
            roi = %investment.roi,
            %running_total,
            "Investment recorded"
        );
    }

    fn operation_failed(&self, operation: &'static str, error: &LendingError) {
        if error.state_changed() {
            error!(operation, code = error.code(), %error, "Operation committed with degraded side effects");
        } else {
            warn!(operation, code = error.code(), %error, "Operation rejected");
        }
    }

    fn notification_sent(&self, notice: &AgreementNotice) {
        debug!(loan_id = notice.loan_id, investor_id = notice.investor_id, "Agreement letter sent");
    }

    fn notification_failed(&self, notice: &AgreementNotice, error: &DependencyError) {
        error!(
            loan_id = notice.loan_id,
            investor_id = notice.investor_id,
            %error,
            "Agreement letter not sent"
        );
    }

    fn notifier_unavailable(&self, loan_id: LoanId) {
        warn!(loan_id, "No notifier configured, agreement letters skipped");
    }

    fn event_published(&self, event: &LoanEvent) {
        debug!(event_type = %event.event_type, loan_id = event.loan_id, "Lifecycle event published");
    }

    fn event_failed(&self, event: &LoanEvent, error: &DependencyError) {
        warn!(event_type = %event.event_type, loan_id = event.loan_id, %error, "Lifecycle event dropped");
    }
}

/// A single recorded report
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// See [`LifecycleObserver::loan_transitioned`]
    Transitioned {
        /// Loan
        loan_id: LoanId,
        /// Previous status
        from: Option<LoanStatus>,
        /// New status
        to: LoanStatus,
    },
    /// See [`LifecycleObserver::investment_recorded`]
    InvestmentRecorded {
        /// Loan
        loan_id: LoanId,
        /// Investor
        investor_id: InvestorId,
        /// Amount
        amount: Decimal,
        /// Running total including this investment
        running_total: Decimal,
    },
    /// See [`LifecycleObserver::operation_failed`]
    OperationFailed {
        /// Operation name
        operation: &'static str,
        /// Error code
        code: &'static str,
    },
    /// See [`LifecycleObserver::notification_sent`]
    NotificationSent {
        /// Loan
        loan_id: LoanId,
        /// Investor
        investor_id: InvestorId,
    },
    /// See [`LifecycleObserver::notification_failed`]
    NotificationFailed {
        /// Loan
        loan_id: LoanId,
        /// Investor
        investor_id: InvestorId,
    },
    /// See [`LifecycleObserver::notifier_unavailable`]
    NotifierUnavailable {
        /// Loan
        loan_id: LoanId,
    },
    /// See [`LifecycleObserver::event_published`]
    EventPublished {
        /// Event type
        event_type: LoanEventType,
        /// Loan
        loan_id: LoanId,
    },
    /// See [`LifecycleObserver::event_failed`]
    EventFailed {
        /// Event type
        event_type: LoanEventType,
        /// Loan
        loan_id: LoanId,
    },
}

/// Keeps every report in memory and wakes waiters on each new one
#[derive(Debug, Default)]
pub struct RecordingObserver {
    records: Mutex<Vec<Observation>>,
    changed: Notify,
}

impl RecordingObserver {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, observation: Observation) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(observation);
        self.changed.notify_waiters();
    }

    /// Copy of everything recorded so far
    pub fn observations(&self) -> Vec<Observation> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of recorded reports matching `predicate`
    pub fn count(&self, predicate: impl Fn(&Observation) -> bool) -> usize {
        self.observations().iter().filter(|o| predicate(o)).count()
    }

    /// Wait until `condition` holds over the recorded reports, or `timeout` elapses.
    ///
    /// Returns whether the condition was met.
    pub async fn wait_until(
        &self,
        timeout: Duration,
        condition: impl Fn(&[Observation]) -> bool,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let changed = self.changed.notified();
            if condition(&self.observations()) {
                return true;
            }
            if tokio::time::timeout_at(deadline, changed).await.is_err() {
                return condition(&self.observations());
            }
        }
    }

    /// Wait for `expected` detached publications to settle, successful or not
    pub async fn wait_for_events(&self, expected: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |records| {
            records
                .iter()
                .filter(|o| {
                    matches!(
                        o,
                        Observation::EventPublished { .. } | Observation::EventFailed { .. }
                    )
                })
                .count()
                >= expected
        })
        .await
    }
}

impl LifecycleObserver for RecordingObserver {
    fn loan_transitioned(&self, loan: &Loan, from: Option<LoanStatus>) {
        self.push(Observation::Transitioned {
            loan_id: loan.id,
            from,
            to: loan.status,
        });
    }

    fn investment_recorded(&self, investment: &Investment, running_total: Decimal) {
        self.push(Observation::InvestmentRecorded {
            loan_id: investment.loan_id,
            investor_id: investment.investor_id,
            amount: investment.amount,
            running_total,
        });
    }

    fn operation_failed(&self, operation: &'static str, error: &LendingError) {
        self.push(Observation::OperationFailed {
            operation,
            code: error.code(),
        });
    }

    fn notification_sent(&self, notice: &AgreementNotice) {
        self.push(Observation::NotificationSent {
            loan_id: notice.loan_id,
            investor_id: notice.investor_id,
        });
    }

    fn notification_failed(&self, notice: &AgreementNotice, _error: &DependencyError) {
        self.push(Observation::NotificationFailed {
            loan_id: notice.loan_id,
            investor_id: notice.investor_id,
        });
    }

    fn notifier_unavailable(&self, loan_id: LoanId) {
        self.push(Observation::NotifierUnavailable { loan_id });
    }

    fn event_published(&self, event: &LoanEvent) {
        self.push(Observation::EventPublished {
            event_type: event.event_type,
            loan_id: event.loan_id,
        });
    }

    fn event_failed(&self, event: &LoanEvent, _error: &DependencyError) {
        self.push(Observation::EventFailed {
            event_type: event.event_type,
            loan_id: event.loan_id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_wait_until_wakes_on_push() {
        let observer = Arc::new(RecordingObserver::new());
        let writer = observer.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer.notifier_unavailable(4);
        });

        let seen = observer
            .wait_until(Duration::from_secs(5), |records| !records.is_empty())
            .await;
        assert!(seen);
        assert_eq!(
            observer.observations(),
            vec![Observation::NotifierUnavailable { loan_id: 4 }]
        );
    }

    #[tokio::test]
    async fn test_wait_until_times_out() {
        let observer = RecordingObserver::new();
        let seen = observer
            .wait_until(Duration::from_millis(20), |records| !records.is_empty())
            .await;
        assert!(!seen);
    }

    #[test]
    fn test_count() {
        let observer = RecordingObserver::new();
        observer.notifier_unavailable(1);
        observer.notifier_unavailable(2);
        assert_eq!(
            observer.count(|o| matches!(o, Observation::NotifierUnavailable { .. })),
            2
        );
    }
}
