//! Mock agreement-letter mailer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lending_core::types::{DependencyError, InvestorId, LoanId};
use lending_engine::ports::{AgreementNotice, Notifier};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tracing::{info, warn};

/// Record of a delivered agreement letter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentLetter {
    /// Email ID
    pub email_id: String,
    /// From address
    pub from: String,
    /// Recipient address
    pub to: String,
    /// Recipient investor
    pub investor_id: InvestorId,
    /// Funded loan
    pub loan_id: LoanId,
    /// Subject
    pub subject: String,
    /// Attached agreement letter reference
    pub attachment: String,
    /// Sent timestamp
    pub sent_at: DateTime<Utc>,
}

/// Mock email notifier.
///
/// Investors resolve to `investor-<id>@<domain>`. Investors marked unreachable fail
/// delivery, which lets callers exercise partial fan-out failures.
pub struct EmailNotifier {
    smtp_server: String,
    from_address: String,
    recipient_domain: String,
    sent: RwLock<Vec<SentLetter>>,
    unreachable: RwLock<HashSet<InvestorId>>,
    counter: AtomicU64,
}

impl EmailNotifier {
    /// Create a new notifier
    pub fn new(smtp_server: &str, from_address: &str, recipient_domain: &str) -> Self {
        Self {
            smtp_server: smtp_server.to_string(),
            from_address: from_address.to_string(),
            recipient_domain: recipient_domain.to_string(),
            sent: RwLock::new(Vec::new()),
            unreachable: RwLock::new(HashSet::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// Create with default settings (mock)
    pub fn mock() -> Self {
        Self::new("smtp.lendflow.local", "agreements@lendflow.local", "investors.lendflow.local")
    }

    /// Make deliveries to `investor_id` fail
    pub fn mark_unreachable(&self, investor_id: InvestorId) {
        self.unreachable
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(investor_id);
    }

    /// Address an investor's letters go to
    pub fn address_of(&self, investor_id: InvestorId) -> String {
        format!("investor-{}@{}", investor_id, self.recipient_domain)
    }

    /// Letters delivered so far
    pub fn sent_letters(&self) -> Vec<SentLetter> {
        self.sent
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Letters delivered for one loan
    pub fn letters_for(&self, loan_id: LoanId) -> Vec<SentLetter> {
        self.sent_letters()
            .into_iter()
            .filter(|l| l.loan_id == loan_id)
            .collect()
    }

    /// Get SMTP server
    pub fn smtp_server(&self) -> &str {
        &self.smtp_server
    }

    /// Get email count
    pub fn email_count(&self) -> usize {
        self.sent
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn is_unreachable(&self, investor_id: InvestorId) -> bool {
        self.unreachable
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&investor_id)
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send_agreement_letter(&self, notice: &AgreementNotice) -> Result<(), DependencyError> {
        let to = self.address_of(notice.investor_id);
        if self.is_unreachable(notice.investor_id) {
            warn!(smtp = %self.smtp_server, %to, loan_id = notice.loan_id, "Recipient rejected (mock)");
            return Err(DependencyError::notifier(format!("{} rejected by {}", to, self.smtp_server)));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let letter = SentLetter {
            email_id: format!("EMAIL-{:08}", n),
            from: self.from_address.clone(),
            to,
            investor_id: notice.investor_id,
            loan_id: notice.loan_id,
            subject: format!("[LendFlow] Agreement letter for loan {}", notice.loan_id),
            attachment: notice.agreement_letter_ref.clone(),
            sent_at: Utc::now(),
        };

        info!(
            email_id = %letter.email_id,
            to = %letter.to,
            subject = %letter.subject,
            "Email sent (mock)"
        );

        self.sent
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(letter);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(investor_id: InvestorId) -> AgreementNotice {
        AgreementNotice {
            loan_id: 3,
            investor_id,
            agreement_letter_ref: "https://docs.test/loan-3".to_string(),
        }
    }

    #[tokio::test]
    async fn test_letter_recorded() {
        let notifier = EmailNotifier::mock();
        notifier.send_agreement_letter(&notice(7)).await.unwrap();

        let letters = notifier.letters_for(3);
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].to, "investor-7@investors.lendflow.local");
        assert_eq!(letters[0].attachment, "https://docs.test/loan-3");
        assert!(letters[0].email_id.starts_with("EMAIL-"));
    }

    #[tokio::test]
    async fn test_unreachable_investor_fails() {
        let notifier = EmailNotifier::mock();
        notifier.mark_unreachable(2);

        let err = notifier.send_agreement_letter(&notice(2)).await.unwrap_err();
        assert!(err.message.contains("investor-2@"));
        assert_eq!(notifier.email_count(), 0);

        notifier.send_agreement_letter(&notice(1)).await.unwrap();
        assert_eq!(notifier.email_count(), 1);
    }
}
