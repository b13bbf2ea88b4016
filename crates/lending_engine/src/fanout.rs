//! Agreement-letter fan-out.
//!
//! Once a loan is fully funded every distinct investor gets the agreement letter.
//! All sends start together; a failing send does not cancel the others.

use futures::future::join_all;
use lending_core::types::{Collaborator, InvestorId, LoanId, NotificationFailure};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use crate::deadline::bounded;
use crate::observer::LifecycleObserver;
use crate::ports::{AgreementNotice, Notifier};

/// Result of one fan-out round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Investors that received the letter
    pub delivered: Vec<InvestorId>,
    /// Investors that did not, with the reason
    pub failures: Vec<NotificationFailure>,
}

impl FanoutReport {
    /// Whether every send succeeded
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sends agreement letters concurrently through an optional notifier.
#[derive(Clone)]
pub struct NotificationFanout {
    notifier: Option<Arc<dyn Notifier>>,
    observer: Arc<dyn LifecycleObserver>,
    timeout: Option<Duration>,
}

impl NotificationFanout {
    /// Create a fan-out
    pub fn new(
        notifier: Option<Arc<dyn Notifier>>,
        observer: Arc<dyn LifecycleObserver>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            notifier,
            observer,
            timeout,
        }
    }

    /// Notify each distinct investor once and wait for every send to settle.
    ///
    /// Without a notifier this reports an empty, complete round.
    pub async fn notify_all(
        &self,
        loan_id: LoanId,
        agreement_letter_ref: &str,
        investors: &[InvestorId],
    ) -> FanoutReport {
        let Some(notifier) = &self.notifier else {
            self.observer.notifier_unavailable(loan_id);
            return FanoutReport::default();
        };

        let recipients: BTreeSet<InvestorId> = investors.iter().copied().collect();
        let sends = recipients.into_iter().map(|investor_id| {
            let notice = AgreementNotice {
                loan_id,
                investor_id,
                agreement_letter_ref: agreement_letter_ref.to_string(),
            };
            async move {
                let outcome = bounded(
                    Collaborator::Notifier,
                    self.timeout,
                    notifier.send_agreement_letter(&notice),
                )
                .await;
                (notice, outcome)
            }
        });

        let mut report = FanoutReport::default();
        for (notice, outcome) in join_all(sends).await {
            match outcome {
                Ok(()) => {
                    self.observer.notification_sent(&notice);
                    report.delivered.push(notice.investor_id);
                }
                Err(e) => {
                    self.observer.notification_failed(&notice, &e);
                    report.failures.push(NotificationFailure {
                        investor_id: notice.investor_id,
                        reason: e.to_string(),
                    });
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{Observation, RecordingObserver};
    use async_trait::async_trait;
    use lending_core::types::DependencyError;
    use std::sync::Mutex;
    use tokio::sync::Barrier;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<InvestorId>>,
        reject: Vec<InvestorId>,
    }

    #[async_trait]
    impl Notifier for Recorder {
        async fn send_agreement_letter(&self, notice: &AgreementNotice) -> Result<(), DependencyError> {
            if self.reject.contains(&notice.investor_id) {
                return Err(DependencyError::notifier("mailbox full"));
            }
            self.sent.lock().unwrap().push(notice.investor_id);
            Ok(())
        }
    }

    /// Every send waits on a barrier sized to the number of recipients, so the round
    /// only completes if all sends are in flight at once.
    struct Rendezvous {
        barrier: Barrier,
    }

    #[async_trait]
    impl Notifier for Rendezvous {
        async fn send_agreement_letter(&self, _notice: &AgreementNotice) -> Result<(), DependencyError> {
            self.barrier.wait().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_duplicates_notified_once() {
        let recorder = Arc::new(Recorder::default());
        let fanout = NotificationFanout::new(
            Some(recorder.clone()),
            Arc::new(RecordingObserver::new()),
            None,
        );

        let report = fanout.notify_all(1, "letter", &[3, 1, 3, 2, 1]).await;

        assert!(report.is_complete());
        assert_eq!(report.delivered, vec![1, 2, 3]);
        let mut sent = recorder.sent.lock().unwrap().clone();
        sent.sort();
        assert_eq!(sent, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_failures_aggregated() {
        let recorder = Arc::new(Recorder {
            reject: vec![2],
            ..Default::default()
        });
        let observer = Arc::new(RecordingObserver::new());
        let fanout = NotificationFanout::new(Some(recorder), observer.clone(), None);

        let report = fanout.notify_all(9, "letter", &[1, 2, 3]).await;

        assert_eq!(report.delivered, vec![1, 3]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].investor_id, 2);
        assert!(report.failures[0].reason.contains("mailbox full"));
        assert_eq!(
            observer.count(|o| matches!(o, Observation::NotificationFailed { investor_id: 2, .. })),
            1
        );
    }

    #[tokio::test]
    async fn test_sends_run_concurrently() {
        let fanout = NotificationFanout::new(
            Some(Arc::new(Rendezvous {
                barrier: Barrier::new(4),
            })),
            Arc::new(RecordingObserver::new()),
            None,
        );

        let report = tokio::time::timeout(
            Duration::from_secs(5),
            fanout.notify_all(1, "letter", &[1, 2, 3, 4]),
        )
        .await
        .expect("sends should not be sequential");

        assert_eq!(report.delivered.len(), 4);
    }

    #[tokio::test]
    async fn test_missing_notifier_is_noop() {
        let observer = Arc::new(RecordingObserver::new());
        let fanout = NotificationFanout::new(None, observer.clone(), None);

        let report = fanout.notify_all(5, "letter", &[1, 2]).await;

        assert!(report.is_complete());
        assert!(report.delivered.is_empty());
        assert_eq!(
            observer.observations(),
            vec![Observation::NotifierUnavailable { loan_id: 5 }]
        );
    }
}
