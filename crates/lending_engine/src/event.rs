//! Lifecycle events.

use chrono::{DateTime, Utc};
use lending_core::types::LoanId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanEventType {
    /// A loan was proposed
    LoanCreated,
    /// A loan was approved
    LoanApproved,
    /// An investment was recorded
    LoanInvested,
    /// A loan was disbursed
    LoanDisbursed,
}

impl LoanEventType {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanEventType::LoanCreated => "LoanCreated",
            LoanEventType::LoanApproved => "LoanApproved",
            LoanEventType::LoanInvested => "LoanInvested",
            LoanEventType::LoanDisbursed => "LoanDisbursed",
        }
    }
}

impl fmt::Display for LoanEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One lifecycle event.
///
/// `payload` is an opaque snapshot of the request or record that triggered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanEvent {
    /// Operation type
    #[serde(rename = "type")]
    pub event_type: LoanEventType,
    /// Loan the event concerns
    pub loan_id: LoanId,
    /// Emission time
    pub timestamp: DateTime<Utc>,
    /// Snapshot of the triggering request or entity
    pub payload: serde_json::Value,
}

impl LoanEvent {
    /// Build an event stamped with the current time.
    ///
    /// A payload that fails to serialise is replaced by `null`; the event itself is
    /// still emitted.
    pub fn snapshot<T: Serialize>(event_type: LoanEventType, loan_id: LoanId, payload: &T) -> Self {
        let payload = serde_json::to_value(payload).unwrap_or_else(|e| {
            tracing::warn!(%event_type, loan_id, error = %e, "Event payload not serialisable");
            serde_json::Value::Null
        });

        Self {
            event_type,
            loan_id,
            timestamp: Utc::now(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event = LoanEvent::snapshot(
            LoanEventType::LoanApproved,
            5,
            &serde_json::json!({"field_validator_id": 8}),
        );
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "LoanApproved");
        assert_eq!(json["loan_id"], 5);
        assert_eq!(json["payload"]["field_validator_id"], 8);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_event_round_trip() {
        let event = LoanEvent::snapshot(LoanEventType::LoanDisbursed, 9, &"payload");
        let json = serde_json::to_string(&event).unwrap();
        let back: LoanEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
