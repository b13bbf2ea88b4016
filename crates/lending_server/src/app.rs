//! Application wiring
//!
//! Builds the lifecycle engine and its downstream collaborators from a [`ServerConfig`].

use std::sync::Arc;

use lending_engine::prelude::*;
use lending_outputs::prelude::*;

use crate::config::ServerConfig;

/// Engine plus the collaborators it was wired with
pub struct Application {
    /// Lifecycle engine shared by all handlers
    pub engine: Arc<LifecycleEngine>,
    /// Ledger backing the engine
    pub ledger: Arc<InMemoryLedger>,
    /// Agreement-letter mailer, absent when notifications are disabled
    pub mailer: Option<Arc<EmailNotifier>>,
    /// Channel feeding the event consumer
    pub channel: Arc<ChannelEventSink>,
    /// Audit trail of every published event
    pub audit: Arc<AuditTrail>,
    consumer: Option<EventConsumer>,
}

impl Application {
    /// Wire everything described by `config`. The event consumer is not started.
    pub fn wire(config: &ServerConfig) -> Self {
        let ledger = Arc::new(
            InMemoryLedger::new()
                .with_borrowers(config.borrowers.iter().copied())
                .with_investors(config.investors.iter().copied()),
        );
        let (channel, rx) = ChannelEventSink::bounded(config.event_channel_capacity);
        let channel = Arc::new(channel);
        let audit = Arc::new(AuditTrail::new().with_max_entries(config.audit_max_entries));

        let mut builder = LifecycleEngine::builder(ledger.clone())
            .event_sink(Arc::new(
                FanoutSink::new().with(channel.clone()).with(audit.clone()),
            ))
            .config(config.engine_config());

        let mailer = config
            .notifier_enabled
            .then(|| Arc::new(EmailNotifier::mock()));
        if let Some(mailer) = &mailer {
            builder = builder.notifier(mailer.clone());
        }

        Self {
            engine: Arc::new(builder.build()),
            ledger,
            mailer,
            channel,
            audit,
            consumer: Some(EventConsumer::new(rx)),
        }
    }

    /// Take the event consumer so it can be spawned; `None` once taken
    pub fn take_consumer(&mut self) -> Option<EventConsumer> {
        self.consumer.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_wire_seeds_registries() {
        let config = ServerConfig {
            borrowers: vec![5],
            investors: vec![6, 7],
            ..Default::default()
        };
        let app = Application::wire(&config);

        assert!(app.ledger.borrower_exists(5).await.unwrap());
        assert!(!app.ledger.borrower_exists(1).await.unwrap());
        assert!(app.ledger.investor_exists(7).await.unwrap());
    }

    #[test]
    fn test_notifier_toggle() {
        let app = Application::wire(&ServerConfig::default());
        assert!(app.mailer.is_some());

        let config = ServerConfig {
            notifier_enabled: false,
            ..Default::default()
        };
        assert!(Application::wire(&config).mailer.is_none());
    }

    #[test]
    fn test_consumer_taken_once() {
        let mut app = Application::wire(&ServerConfig::default());
        assert!(app.take_consumer().is_some());
        assert!(app.take_consumer().is_none());
    }

    #[tokio::test]
    async fn test_events_reach_audit_and_consumer() {
        let mut app = Application::wire(&ServerConfig::default());
        let consumer = app.take_consumer().unwrap().spawn();

        let loan = app
            .engine
            .create_loan(CreateLoanRequest {
                borrower_id: 1,
                principal_amount: dec!(1000),
                rate: dec!(5),
                term_months: 6,
            })
            .await
            .unwrap();

        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
        while app.audit.count() == 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(app.audit.entries_for_loan(loan.id).len(), 1);

        while app.channel.published_count() == 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        app.channel.close();
        let stats = consumer.await.unwrap();
        assert_eq!(stats.created, 1);
    }
}
