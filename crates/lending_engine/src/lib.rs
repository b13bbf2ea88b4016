//! # lending_engine: Loan Lifecycle Engine
//!
//! Drives loans through `Proposed → Approved → Invested → Disbursed` against an
//! external ledger store, and coordinates the side effects of each transition.
//!
//! ## Features
//!
//! - **Per-loan serialisation**: the read-check-write funding sequence runs under a
//!   lock keyed by loan id ([`locks::LoanLocks`]); different loans never contend
//! - **Funding fan-out**: when an investment completes funding, every distinct
//!   investor is notified concurrently ([`fanout::NotificationFanout`]) and failures
//!   are aggregated without unwinding the committed transition
//! - **Fire-and-forget events**: one lifecycle event per successful operation,
//!   published on a detached task ([`dispatch::EventDispatcher`])
//! - **Injected observation**: logging goes through a [`observer::LifecycleObserver`]
//!   so tests can record what the engine did, including detached work
//!
//! ## Collaborators
//!
//! The engine owns no storage. It talks to the outside world through the traits in
//! [`ports`]: [`ports::LedgerStore`], [`ports::Notifier`] and [`ports::EventSink`].
//! [`memory::InMemoryLedger`] is a strongly consistent ledger implementation.

pub mod config;
pub mod deadline;
pub mod dispatch;
pub mod engine;
pub mod event;
pub mod fanout;
pub mod locks;
pub mod memory;
pub mod observer;
pub mod ports;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::engine::{EngineBuilder, InvestmentOutcome, LifecycleEngine};
    pub use crate::event::{LoanEvent, LoanEventType};
    pub use crate::memory::InMemoryLedger;
    pub use crate::observer::{LifecycleObserver, Observation, RecordingObserver, TracingObserver};
    pub use crate::ports::{AgreementNotice, EventSink, LedgerStore, Notifier};
    pub use lending_core::prelude::*;
}
