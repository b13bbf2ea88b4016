//! Channel-backed event sink.

use async_channel::{Receiver, Sender};
use async_trait::async_trait;
use lending_core::types::DependencyError;
use lending_engine::event::LoanEvent;
use lending_engine::ports::EventSink;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Publishes JSON-encoded events onto a bounded channel.
///
/// A full channel applies backpressure to the publishing task; a closed channel
/// fails the publish.
pub struct ChannelEventSink {
    tx: Sender<String>,
    published: AtomicUsize,
}

impl ChannelEventSink {
    /// Create a sink and the receiving end for its consumer
    pub fn bounded(capacity: usize) -> (Self, Receiver<String>) {
        let (tx, rx) = async_channel::bounded(capacity);
        (
            Self {
                tx,
                published: AtomicUsize::new(0),
            },
            rx,
        )
    }

    /// Events accepted by the channel
    pub fn published_count(&self) -> usize {
        self.published.load(Ordering::SeqCst)
    }

    /// Close the channel; the consumer finishes after draining it
    pub fn close(&self) -> bool {
        self.tx.close()
    }
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn publish(&self, event: &LoanEvent) -> Result<(), DependencyError> {
        let message = serde_json::to_string(event)
            .map_err(|e| DependencyError::event_sink(format!("encode failed: {}", e)))?;
        self.tx
            .send(message)
            .await
            .map_err(|_| DependencyError::event_sink("event channel closed"))?;
        self.published.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
