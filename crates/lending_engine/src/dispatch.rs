//! Fire-and-forget event publication.

use lending_core::types::{Collaborator, DependencyError};
use std::sync::Arc;
use std::time::Duration;

use crate::deadline::bounded;
use crate::event::LoanEvent;
use crate::observer::LifecycleObserver;
use crate::ports::EventSink;

/// Publishes lifecycle events on detached tasks.
///
/// The caller never waits for the sink and never sees its errors; outcomes go to the
/// observer. Without a sink, events are discarded.
#[derive(Clone)]
pub struct EventDispatcher {
    sink: Option<Arc<dyn EventSink>>,
    observer: Arc<dyn LifecycleObserver>,
    timeout: Option<Duration>,
}

impl EventDispatcher {
    /// Create a dispatcher
    pub fn new(
        sink: Option<Arc<dyn EventSink>>,
        observer: Arc<dyn LifecycleObserver>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            sink,
            observer,
            timeout,
        }
    }

    /// Whether a sink is attached
    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Hand `event` to a detached task and return immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn emit(&self, event: LoanEvent) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        let observer = self.observer.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let outcome: Result<(), DependencyError> =
                bounded(Collaborator::EventSink, timeout, sink.publish(&event)).await;
            match outcome {
                Ok(()) => observer.event_published(&event),
                Err(e) => observer.event_failed(&event, &e),
            }
        });
    }
}
