//! Loan and investment records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Loan identifier assigned by the ledger store.
pub type LoanId = i64;

/// Borrower identifier.
pub type BorrowerId = i64;

/// Investor identifier.
pub type InvestorId = i64;

/// Field validator or field officer identifier.
pub type OfficerId = i64;

/// Lifecycle state of a loan.
///
/// States advance strictly in declaration order:
/// `Proposed → Approved → Invested → Disbursed`.
///
/// # Examples
/// ```
/// use lending_core::types::LoanStatus;
///
/// assert_eq!(LoanStatus::Proposed.next(), Some(LoanStatus::Approved));
/// assert!(LoanStatus::Approved.can_advance_to(LoanStatus::Invested));
/// assert!(!LoanStatus::Approved.can_advance_to(LoanStatus::Disbursed));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// Created, awaiting field validation
    Proposed,
    /// Validated, open for investment
    Approved,
    /// Fully funded by investors
    Invested,
    /// Funds handed over to the borrower (terminal)
    Disbursed,
}

impl LoanStatus {
    /// All states in lifecycle order
    pub const ALL: [LoanStatus; 4] = [
        LoanStatus::Proposed,
        LoanStatus::Approved,
        LoanStatus::Invested,
        LoanStatus::Disbursed,
    ];

    /// The state that directly follows this one, if any
    pub fn next(&self) -> Option<LoanStatus> {
        match self {
            LoanStatus::Proposed => Some(LoanStatus::Approved),
            LoanStatus::Approved => Some(LoanStatus::Invested),
            LoanStatus::Invested => Some(LoanStatus::Disbursed),
            LoanStatus::Disbursed => None,
        }
    }

    /// Whether `target` is the immediate successor of this state.
    ///
    /// Backward moves, self-loops and skips are all rejected.
    pub fn can_advance_to(&self, target: LoanStatus) -> bool {
        self.next() == Some(target)
    }

    /// Whether the loan can still take investments in this state
    pub fn accepts_investment(&self) -> bool {
        matches!(self, LoanStatus::Approved | LoanStatus::Invested)
    }

    /// Whether this is the terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Disbursed)
    }

    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Proposed => "proposed",
            LoanStatus::Approved => "approved",
            LoanStatus::Invested => "invested",
            LoanStatus::Disbursed => "disbursed",
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "proposed" => Ok(LoanStatus::Proposed),
            "approved" => Ok(LoanStatus::Approved),
            "invested" => Ok(LoanStatus::Invested),
            "disbursed" => Ok(LoanStatus::Disbursed),
            other => Err(format!("Unknown loan status: {}", other)),
        }
    }
}

/// A peer-to-peer loan.
///
/// `principal_amount` and `rate` are fixed at creation; the lifecycle methods in
/// [`crate::lifecycle`] only ever touch status, references, officers and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    /// Ledger-assigned identifier (0 until persisted)
    pub id: LoanId,
    /// Borrower requesting the funds
    pub borrower_id: BorrowerId,
    /// Amount the loan must be funded to
    pub principal_amount: Decimal,
    /// Flat interest rate in percent
    pub rate: Decimal,
    /// Term in months
    pub term_months: u32,
    /// `principal * rate / 100`, derived at creation
    pub total_interest: Decimal,
    /// Current lifecycle state
    pub status: LoanStatus,
    /// Agreement letter reference, issued at funding and finalised at disbursement
    pub agreement_letter_ref: Option<String>,
    /// Field validator who approved the loan
    pub field_validator_id: Option<OfficerId>,
    /// Reference to the field validator's proof
    pub field_validator_proof_ref: Option<String>,
    /// Field officer who disbursed the loan
    pub field_officer_id: Option<OfficerId>,
    /// When the loan was approved
    pub approval_timestamp: Option<DateTime<Utc>>,
    /// When the loan was disbursed
    pub disbursement_timestamp: Option<DateTime<Utc>>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last transition time
    pub updated_at: DateTime<Utc>,
}

/// A single investor contribution. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    /// Ledger-assigned identifier (0 until persisted)
    pub id: i64,
    /// Funded loan
    pub loan_id: LoanId,
    /// Contributing investor
    pub investor_id: InvestorId,
    /// Contributed amount
    pub amount: Decimal,
    /// ROI frozen at write time
    pub roi: Decimal,
    /// When the contribution was recorded
    pub created_at: DateTime<Utc>,
}

/// Per-investor aggregation over one loan's investments. Computed on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentSummary {
    /// Investor
    pub investor_id: InvestorId,
    /// Sum of the investor's amounts
    pub total_amount: Decimal,
    /// Sum of the investor's frozen ROI values
    pub total_roi: Decimal,
}

impl InvestmentSummary {
    /// Aggregate investments per investor, ordered by investor id.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use lending_core::types::{Investment, InvestmentSummary};
    /// use rust_decimal::Decimal;
    ///
    /// let inv = |investor_id, amount: i64| Investment {
    ///     id: 0,
    ///     loan_id: 1,
    ///     investor_id,
    ///     amount: Decimal::from(amount),
    ///     roi: Decimal::from(amount),
    ///     created_at: Utc::now(),
    /// };
    /// let summary = InvestmentSummary::aggregate(&[inv(2, 10), inv(1, 5), inv(2, 15)]);
    /// assert_eq!(summary.len(), 2);
    /// assert_eq!(summary[1].total_amount, Decimal::from(25));
    /// ```
    pub fn aggregate(investments: &[Investment]) -> Vec<InvestmentSummary> {
        let mut by_investor: BTreeMap<InvestorId, (Decimal, Decimal)> = BTreeMap::new();
        for investment in investments {
            let entry = by_investor
                .entry(investment.investor_id)
                .or_insert((Decimal::ZERO, Decimal::ZERO));
            entry.0 += investment.amount;
            entry.1 += investment.roi;
        }

        by_investor
            .into_iter()
            .map(|(investor_id, (total_amount, total_roi))| InvestmentSummary {
                investor_id,
                total_amount,
                total_roi,
            })
            .collect()
    }
}

/// Loan with its per-investor investment breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanDetail {
    /// The loan record
    #[serde(flatten)]
    pub loan: Loan,
    /// Per-investor totals
    pub investment_detail: Vec<InvestmentSummary>,
}
