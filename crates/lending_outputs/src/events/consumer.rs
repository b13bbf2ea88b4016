//! Lifecycle event consumer.

use async_channel::Receiver;
use lending_engine::event::{LoanEvent, LoanEventType};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Counts of processed messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerStats {
    /// `LoanCreated` events
    pub created: usize,
    /// `LoanApproved` events
    pub approved: usize,
    /// `LoanInvested` events
    pub invested: usize,
    /// `LoanDisbursed` events
    pub disbursed: usize,
    /// Messages that could not be decoded
    pub malformed: usize,
}

impl ConsumerStats {
    /// Total decoded events
    pub fn processed(&self) -> usize {
        self.created + self.approved + self.invested + self.disbursed
    }
}

/// Drains a channel of JSON-encoded lifecycle events and logs one line per event.
///
/// Undecodable messages, including unknown event types, are counted and skipped.
pub struct EventConsumer {
    rx: Receiver<String>,
    stats: ConsumerStats,
}

impl EventConsumer {
    /// Create a consumer over `rx`
    pub fn new(rx: Receiver<String>) -> Self {
        Self {
            rx,
            stats: ConsumerStats::default(),
        }
    }

    /// Process messages until the channel is closed and drained
    pub async fn run(mut self) -> ConsumerStats {
        info!("Event consumer started");
        while let Ok(message) = self.rx.recv().await {
            self.handle(&message);
        }
        info!(processed = self.stats.processed(), malformed = self.stats.malformed, "Event consumer stopped");
        self.stats
    }

    /// Run on a Tokio task
    pub fn spawn(self) -> JoinHandle<ConsumerStats> {
        tokio::spawn(self.run())
    }

    fn handle(&mut self, message: &str) {
        let event: LoanEvent = match serde_json::from_str(message) {
            Ok(event) => event,
            Err(e) => {
                self.stats.malformed += 1;
                warn!(error = %e, "Skipping undecodable event");
                return;
            }
        };

        match event.event_type {
            LoanEventType::LoanCreated => {
                self.stats.created += 1;
                info!(loan_id = event.loan_id, at = %event.timestamp, "Loan created");
            }
            LoanEventType::LoanApproved => {
                self.stats.approved += 1;
                info!(loan_id = event.loan_id, at = %event.timestamp, "Loan approved");
            }
            LoanEventType::LoanInvested => {
                self.stats.invested += 1;
                info!(
                    loan_id = event.loan_id,
                    investor_id = %event.payload["investor_id"],
                    amount = %event.payload["amount"],
                    "Loan invested"
                );
            }
            LoanEventType::LoanDisbursed => {
                self.stats.disbursed += 1;
                info!(loan_id = event.loan_id, at = %event.timestamp, "Loan disbursed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_per_type_and_skips_garbage() {
        let (tx, rx) = async_channel::unbounded();
        let handle = EventConsumer::new(rx).spawn();

        for event_type in [
            LoanEventType::LoanCreated,
            LoanEventType::LoanApproved,
            LoanEventType::LoanInvested,
            LoanEventType::LoanInvested,
            LoanEventType::LoanDisbursed,
        ] {
            let event = LoanEvent::snapshot(event_type, 1, &());
            tx.send(serde_json::to_string(&event).unwrap()).await.unwrap();
        }
        tx.send("not json".to_string()).await.unwrap();
        tx.send(r#"{"type":"LoanArchived","loan_id":1,"timestamp":"2024-01-01T00:00:00Z","payload":null}"#.to_string())
            .await
            .unwrap();
        tx.close();

        let stats = handle.await.unwrap();
        assert_eq!(
            stats,
            ConsumerStats {
                created: 1,
                approved: 1,
                invested: 2,
                disbursed: 1,
                malformed: 2,
            }
        );
        assert_eq!(stats.processed(), 5);
    }
}
