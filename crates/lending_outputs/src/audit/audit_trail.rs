//! Bounded in-memory audit trail.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lending_core::types::{DependencyError, LoanId};
use lending_engine::event::{LoanEvent, LoanEventType};
use lending_engine::ports::EventSink;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::RwLock;

/// One audited lifecycle event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry ID
    pub entry_id: String,
    /// When the entry was recorded
    pub recorded_at: DateTime<Utc>,
    /// The event as published
    pub event: LoanEvent,
}

#[derive(Debug, Default)]
struct TrailState {
    entries: VecDeque<AuditEntry>,
    counter: u64,
}

/// Audit trail store.
///
/// Keeps at most `max_entries`, evicting the oldest first.
#[derive(Debug)]
pub struct AuditTrail {
    state: RwLock<TrailState>,
    max_entries: usize,
}

impl AuditTrail {
    /// Create a new audit trail
    pub fn new() -> Self {
        Self {
            state: RwLock::new(TrailState::default()),
            max_entries: 100_000,
        }
    }

    /// Set maximum entries to retain
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max.max(1);
        self
    }

    /// Record an event and return its entry id
    pub fn record(&self, event: &LoanEvent) -> String {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.counter += 1;
        let entry_id = format!("AUD-{:012}", state.counter);

        if state.entries.len() >= self.max_entries {
            state.entries.pop_front();
        }
        state.entries.push_back(AuditEntry {
            entry_id: entry_id.clone(),
            recorded_at: Utc::now(),
            event: event.clone(),
        });
        entry_id
    }

    /// Entries for one loan, oldest first
    pub fn entries_for_loan(&self, loan_id: LoanId) -> Vec<AuditEntry> {
        self.filtered(|e| e.event.loan_id == loan_id)
    }

    /// Entries of one event type, oldest first
    pub fn entries_by_type(&self, event_type: LoanEventType) -> Vec<AuditEntry> {
        self.filtered(|e| e.event.event_type == event_type)
    }

    /// Most recent entries, newest first
    pub fn recent(&self, count: usize) -> Vec<AuditEntry> {
        let state = self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.entries.iter().rev().take(count).cloned().collect()
    }

    /// Get total entry count
    pub fn count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entries
            .len()
    }

    /// Export all entries as JSON
    pub fn export_json(&self) -> serde_json::Result<String> {
        let state = self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        serde_json::to_string_pretty(&state.entries)
    }

    fn filtered(&self, keep: impl Fn(&AuditEntry) -> bool) -> Vec<AuditEntry> {
        let state = self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.entries.iter().filter(|e| keep(e)).cloned().collect()
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for AuditTrail {
    async fn publish(&self, event: &LoanEvent) -> Result<(), DependencyError> {
        self.record(event);
        Ok(())
    }
}
