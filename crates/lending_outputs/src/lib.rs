//! # Downstream Collaborators
//!
//! Implementations of the engine's collaborator traits that stand in for the
//! external systems around the loan lifecycle.
//!
//! ## Modules
//!
//! - [`notifier`]: mock mailer delivering agreement letters to investors
//! - [`events`]: channel-backed event sink and the consumer task that processes
//!   lifecycle events
//! - [`audit`]: bounded audit trail of every lifecycle event

pub mod audit;
pub mod events;
pub mod notifier;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::audit::{AuditEntry, AuditTrail};
    pub use crate::events::{ChannelEventSink, ConsumerStats, EventConsumer, FanoutSink};
    pub use crate::notifier::{EmailNotifier, SentLetter};
}
