// 🛡️ Risk Rules - Rules as Data
// Additive threshold rules that turn (amount, merchant, location) into a bounded score

use crate::config::{RiskRules, SimulationConfig, StatusThresholds, RISK_SCORE_MAX};
use crate::error::{ConfigError, ValidationError};
use crate::transaction::TransactionStatus;
use serde::{Deserialize, Serialize};

pub const REASON_HIGH_AMOUNT: &str = "Transaction amount significantly higher than usual";
pub const REASON_UNKNOWN_MERCHANT: &str = "Merchant not seen in user history";
pub const REASON_FOREIGN_LOCATION: &str = "Transaction location differs from normal usage";

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleCondition {
    /// Amount strictly above the threshold
    AmountAbove { threshold: f64 },
    MerchantIs { merchant: String },
    LocationIs { location: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRule {
    /// Rule ID for tracking
    pub id: String,

    pub condition: RuleCondition,

    /// Points added to the score when the rule fires
    pub weight: u8,

    /// Human-readable explanation appended when the rule fires
    pub reason: String,
}

impl RiskRule {
    pub fn matches(&self, amount: f64, merchant: &str, location: &str) -> bool {
        match &self.condition {
            RuleCondition::AmountAbove { threshold } => amount > *threshold,
            RuleCondition::MerchantIs { merchant: m } => merchant == m,
            RuleCondition::LocationIs { location: l } => location == l,
        }
    }
}

// ============================================================================
// ASSESSMENT
// ============================================================================

/// Outcome of scoring one transaction.
/// Only `RiskScorer::score` builds these, so the status always matches the score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    risk_score: u8,
    reasons: Vec<String>,
    status: TransactionStatus,
}

impl RiskAssessment {
    /// Always within 0..=RISK_SCORE_MAX
    pub fn risk_score(&self) -> u8 {
        self.risk_score
    }

    /// One entry per fired rule, in rule order
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub(crate) fn into_parts(self) -> (u8, Vec<String>, TransactionStatus) {
        (self.risk_score, self.reasons, self.status)
    }
}

// ============================================================================
// RISK SCORER
// ============================================================================

#[derive(Debug, Clone)]
pub struct RiskScorer {
    rules: Vec<RiskRule>,
    thresholds: StatusThresholds,
}

impl RiskScorer {
    /// Build the three standard rules from weights and sentinels
    pub fn new(
        weights: &RiskRules,
        unknown_merchant: &str,
        foreign_location: &str,
        thresholds: StatusThresholds,
    ) -> Result<Self, ConfigError> {
        let rules = vec![
            RiskRule {
                id: "high_amount".to_string(),
                condition: RuleCondition::AmountAbove {
                    threshold: weights.high_amount_threshold,
                },
                weight: weights.high_amount_weight,
                reason: REASON_HIGH_AMOUNT.to_string(),
            },
            RiskRule {
                id: "unknown_merchant".to_string(),
                condition: RuleCondition::MerchantIs {
                    merchant: unknown_merchant.to_string(),
                },
                weight: weights.unknown_merchant_weight,
                reason: REASON_UNKNOWN_MERCHANT.to_string(),
            },
            RiskRule {
                id: "foreign_location".to_string(),
                condition: RuleCondition::LocationIs {
                    location: foreign_location.to_string(),
                },
                weight: weights.foreign_location_weight,
                reason: REASON_FOREIGN_LOCATION.to_string(),
            },
        ];

        Self::from_rules(rules, thresholds)
    }

    pub fn from_config(config: &SimulationConfig) -> Result<Self, ConfigError> {
        Self::new(
            &config.rules,
            &config.unknown_merchant,
            &config.foreign_location,
            config.thresholds,
        )
    }

    /// Create scorer from an explicit rule list (evaluated in order)
    pub fn from_rules(rules: Vec<RiskRule>, thresholds: StatusThresholds) -> Result<Self, ConfigError> {
        thresholds.validate()?;
        Ok(RiskScorer { rules, thresholds })
    }

    /// Score one transaction. Pure: same inputs, same output.
    pub fn score(
        &self,
        amount: f64,
        merchant: &str,
        location: &str,
    ) -> Result<RiskAssessment, ValidationError> {
        if !amount.is_finite() {
            return Err(ValidationError::NonFiniteAmount(amount));
        }
        if amount < 0.0 {
            return Err(ValidationError::NegativeAmount(amount));
        }

        let mut total: u32 = 0;
        let mut reasons = Vec::new();

        for rule in &self.rules {
            if rule.weight > 0 && rule.matches(amount, merchant, location) {
                total += u32::from(rule.weight);
                reasons.push(rule.reason.clone());
            }
        }

        let risk_score = total.min(u32::from(RISK_SCORE_MAX)) as u8;

        Ok(RiskAssessment {
            risk_score,
            reasons,
            status: self.status_for(risk_score),
        })
    }

    /// Monotonic threshold mapping from score to status
    pub fn status_for(&self, risk_score: u8) -> TransactionStatus {
        if risk_score >= self.thresholds.block_at {
            TransactionStatus::Blocked
        } else if risk_score >= self.thresholds.review_at {
            TransactionStatus::Review
        } else {
            TransactionStatus::Approved
        }
    }

    pub fn thresholds(&self) -> StatusThresholds {
        self.thresholds
    }

    pub fn rules(&self) -> &[RiskRule] {
        &self.rules
    }

    /// Get number of rules loaded
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

// ============================================================================
// TESTS
// ============================================================================
