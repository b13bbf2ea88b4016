//! Publish to several sinks at once.

use async_trait::async_trait;
use lending_core::types::DependencyError;
use lending_engine::event::LoanEvent;
use lending_engine::ports::EventSink;
use std::sync::Arc;

/// Forwards each event to every inner sink in order.
///
/// Every sink is attempted; the first failure is returned.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    /// Create an empty fan-out
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink
    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of inner sinks
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether there are no inner sinks
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl EventSink for FanoutSink {
    async fn publish(&self, event: &LoanEvent) -> Result<(), DependencyError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.publish(event).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
