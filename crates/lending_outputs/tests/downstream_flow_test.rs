//! Downstream Flow Integration Tests
//!
//! Wires the engine to the mock mailer, the event channel with its consumer and the
//! audit trail, then drives a loan through its whole lifecycle.

use lending_engine::prelude::*;
use lending_outputs::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

struct Downstream {
    engine: LifecycleEngine,
    mailer: Arc<EmailNotifier>,
    channel: Arc<ChannelEventSink>,
    audit: Arc<AuditTrail>,
    observer: Arc<RecordingObserver>,
    consumer: tokio::task::JoinHandle<ConsumerStats>,
}

fn wire(investors: &[InvestorId]) -> Downstream {
    let ledger = Arc::new(
        InMemoryLedger::new()
            .with_borrowers([1])
            .with_investors(investors.iter().copied()),
    );
    let mailer = Arc::new(EmailNotifier::mock());
    let (channel, rx) = ChannelEventSink::bounded(64);
    let channel = Arc::new(channel);
    let audit = Arc::new(AuditTrail::new());
    let observer = Arc::new(RecordingObserver::new());
    let consumer = EventConsumer::new(rx).spawn();

    let engine = LifecycleEngine::builder(ledger)
        .notifier(mailer.clone())
        .event_sink(Arc::new(
            FanoutSink::new().with(channel.clone()).with(audit.clone()),
        ))
        .observer(observer.clone())
        .build();

    Downstream {
        engine,
        mailer,
        channel,
        audit,
        observer,
        consumer,
    }
}

async fn fund(
    d: &Downstream,
    investors: &[InvestorId],
    principal: u32,
) -> (LoanId, Result<InvestmentOutcome, LendingError>) {
    let loan = d
        .engine
        .create_loan(CreateLoanRequest {
            borrower_id: 1,
            principal_amount: Decimal::from(principal),
            rate: dec!(5),
            term_months: 12,
        })
        .await
        .unwrap();
    d.engine
        .approve_loan(ApproveLoanRequest {
            loan_id: loan.id,
            field_validator_id: 8,
            field_validator_proof: None,
        })
        .await
        .unwrap();

    let share = Decimal::from(principal) / Decimal::from(investors.len() as u32);
    let mut last = None;
    for &investor_id in investors {
        last = Some(
            d.engine
                .invest_loan(InvestLoanRequest {
                    loan_id: loan.id,
                    investor_id,
                    amount: share,
                })
                .await,
        );
    }
    (loan.id, last.unwrap())
}

#[tokio::test]
async fn test_full_lifecycle_reaches_every_downstream_system() {
    let d = wire(&[7]);
    let (loan_id, outcome) = fund(&d, &[7], 500000).await;
    assert!(outcome.unwrap().completed_funding());

    d.engine
        .disburse_loan(DisburseLoanRequest {
            loan_id,
            field_officer_id: 9,
            agreement_letter: None,
        })
        .await
        .unwrap();

    let letters = d.mailer.letters_for(loan_id);
    assert_eq!(letters.len(), 1);
    assert_eq!(letters[0].investor_id, 7);
    assert_eq!(
        letters[0].attachment,
        d.engine.config().agreement_letter_ref(loan_id)
    );

    assert!(d.observer.wait_for_events(4, Duration::from_secs(5)).await);
    assert_eq!(d.audit.entries_for_loan(loan_id).len(), 4);
    assert_eq!(d.channel.published_count(), 4);

    d.channel.close();
    let stats = d.consumer.await.unwrap();
    assert_eq!(
        stats,
        ConsumerStats {
            created: 1,
            approved: 1,
            invested: 1,
            disbursed: 1,
            malformed: 0,
        }
    );
}

#[tokio::test]
async fn test_unreachable_investor_surfaces_partial_notification() {
    let d = wire(&[1, 2, 3]);
    d.mailer.mark_unreachable(2);

    let (loan_id, outcome) = fund(&d, &[1, 2, 3], 300).await;

    match outcome {
        Err(LendingError::PartialNotification { loan_id: id, failures }) => {
            assert_eq!(id, loan_id);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].investor_id, 2);
        }
        other => panic!("Expected partial notification, got {:?}", other),
    }

    let mut delivered: Vec<_> = d
        .mailer
        .letters_for(loan_id)
        .into_iter()
        .map(|l| l.investor_id)
        .collect();
    delivered.sort();
    assert_eq!(delivered, vec![1, 3]);

    let detail = d.engine.loan_detail(loan_id).await.unwrap();
    assert_eq!(detail.loan.status, LoanStatus::Invested);
    assert_eq!(detail.investment_detail.len(), 3);
}
