use crate::rules::RiskAssessment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const NO_ANOMALY_EXPLANATION: &str = "Transaction aligns with normal user behavior";

// ============================================================================
// STATUS
// ============================================================================

/// Decision derived from the risk score.
/// Variants are declared in order of severity so `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Approved,
    Review,
    Blocked,
}

impl TransactionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TransactionStatus::Approved => "APPROVED",
            TransactionStatus::Review => "REVIEW",
            TransactionStatus::Blocked => "BLOCKED",
        }
    }

    pub fn verdict(&self) -> &'static str {
        match self {
            TransactionStatus::Approved => "Transaction approved",
            TransactionStatus::Review => "Suspicious transaction. User confirmation required",
            TransactionStatus::Blocked => "Transaction blocked due to high fraud risk",
        }
    }
}

/// How a row entered the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Produced by a regular tick
    Simulated,
    /// Forced in by the operator
    Injected,
}

// ============================================================================
// DRAFT
// ============================================================================

/// Unscored transaction as it leaves the synthesizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub amount: f64,
    pub merchant: String,
    pub location: String,
    pub category: String,
}

// ============================================================================
// TRANSACTION
// ============================================================================

/// Scored transaction. Immutable once built: fields are read through accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    id: Uuid,
    timestamp: DateTime<Utc>,
    amount: f64,
    merchant: String,
    location: String,
    category: String,
    risk_score: u8,
    reasons: Vec<String>,
    status: TransactionStatus,
    origin: Origin,
}

impl Transaction {
    /// Seal a draft with the assessment the scorer produced for it
    pub fn from_draft(draft: TransactionDraft, assessment: RiskAssessment, origin: Origin) -> Self {
        let (risk_score, reasons, status) = assessment.into_parts();
        Transaction {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            amount: draft.amount,
            merchant: draft.merchant,
            location: draft.location,
            category: draft.category,
            risk_score,
            reasons,
            status,
            origin,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn merchant(&self) -> &str {
        &self.merchant
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn risk_score(&self) -> u8 {
        self.risk_score
    }

    /// Empty means no anomaly was detected
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Reasons for display, with a fallback line for clean transactions
    pub fn explanation(&self) -> Vec<&str> {
        if self.reasons.is_empty() {
            vec![NO_ANOMALY_EXPLANATION]
        } else {
            self.reasons.iter().map(String::as_str).collect()
        }
    }
}
