//! Agreement-letter delivery.
//!
//! The engine only needs [`lending_engine::ports::Notifier`]; this module provides a
//! mock mailer that logs and records each letter instead of talking to SMTP.

mod email_notifier;

pub use email_notifier::{EmailNotifier, SentLetter};
