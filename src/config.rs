// ⚙️ Simulation Config - Rules as Data
// Every threshold, weight and whitelist lives here, never inline

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Lowest value a risk score can take
pub const RISK_SCORE_MIN: u8 = 0;
/// Highest value a risk score can take; sums above this are clamped
pub const RISK_SCORE_MAX: u8 = 100;

pub const UNKNOWN_MERCHANT: &str = "Unknown Merchant";
pub const FOREIGN_LOCATION: &str = "Foreign Location";
pub const DEFAULT_CATEGORY: &str = "Others";

pub const MIN_TICK_SECS: f64 = 0.1;
pub const MAX_TICK_SECS: f64 = 2.0;

// ============================================================================
// AMOUNT RANGE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
}

impl AmountRange {
    pub const fn new(min: f64, max: f64) -> Self {
        AmountRange { min, max }
    }

    pub(crate) fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        let ok = self.min.is_finite() && self.max.is_finite() && self.min >= 0.0 && self.min <= self.max;
        if ok {
            Ok(())
        } else {
            Err(ConfigError::InvalidAmountRange {
                name,
                min: self.min,
                max: self.max,
            })
        }
    }
}

// ============================================================================
// RISK RULES & STATUS THRESHOLDS
// ============================================================================

/// Weights of the additive risk rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskRules {
    /// Amounts strictly above this trigger the high-amount rule
    pub high_amount_threshold: f64,
    pub high_amount_weight: u8,
    pub unknown_merchant_weight: u8,
    pub foreign_location_weight: u8,
}

impl Default for RiskRules {
    fn default() -> Self {
        RiskRules {
            high_amount_threshold: 10_000.0,
            high_amount_weight: 40,
            unknown_merchant_weight: 30,
            foreign_location_weight: 30,
        }
    }
}

/// Score cut-offs for status derivation.
/// `score < review_at` is APPROVED, `score >= block_at` is BLOCKED, REVIEW in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusThresholds {
    pub review_at: u8,
    pub block_at: u8,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        StatusThresholds {
            review_at: 30,
            block_at: 70,
        }
    }
}

impl StatusThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.review_at >= self.block_at || self.block_at > RISK_SCORE_MAX {
            return Err(ConfigError::InvalidThresholds {
                review: self.review_at,
                block: self.block_at,
            });
        }
        Ok(())
    }
}

// ============================================================================
// SIMULATION CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Display label only; amounts are currency-agnostic
    pub currency: String,

    /// Known merchants drawn uniformly for normal transactions
    pub merchants: Vec<String>,

    /// Normal locations drawn uniformly for normal transactions
    pub locations: Vec<String>,

    /// Sentinel merchant that always triggers the unknown-merchant rule
    pub unknown_merchant: String,

    /// Sentinel location that always triggers the foreign-location rule
    pub foreign_location: String,

    /// Merchant -> category lookup
    pub categories: BTreeMap<String, String>,

    /// Category for merchants missing from `categories`
    pub default_category: String,

    pub normal_amount: AmountRange,
    pub anomalous_amount: AmountRange,

    /// Chance that an unforced tick is biased toward an anomaly
    pub anomaly_probability: f64,

    pub rules: RiskRules,
    pub thresholds: StatusThresholds,

    pub ledger_capacity: usize,

    /// Seconds between ticks (simulation speed)
    pub tick_interval_secs: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let categories = [
            ("Amazon", "Shopping"),
            ("Flipkart", "Shopping"),
            ("Swiggy", "Food"),
            ("Uber", "Travel"),
            ("Netflix", "Subscription"),
            (UNKNOWN_MERCHANT, DEFAULT_CATEGORY),
        ]
        .into_iter()
        .map(|(m, c)| (m.to_string(), c.to_string()))
        .collect();

        SimulationConfig {
            currency: "INR".to_string(),
            merchants: ["Amazon", "Flipkart", "Swiggy", "Uber", "Netflix"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            locations: ["Delhi", "Mumbai", "Bangalore", "Chennai"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            unknown_merchant: UNKNOWN_MERCHANT.to_string(),
            foreign_location: FOREIGN_LOCATION.to_string(),
            categories,
            default_category: DEFAULT_CATEGORY.to_string(),
            normal_amount: AmountRange::new(100.0, 3_000.0),
            anomalous_amount: AmountRange::new(15_000.0, 50_000.0),
            anomaly_probability: 0.15,
            rules: RiskRules::default(),
            thresholds: StatusThresholds::default(),
            ledger_capacity: 50,
            tick_interval_secs: 1.0,
        }
    }
}

impl SimulationConfig {
    /// Parse a TOML document; missing keys fall back to defaults
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load and validate a TOML config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Check everything the live loop relies on. Fail fast.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.merchants.is_empty() {
            return Err(ConfigError::EmptyMerchants);
        }
        if self.locations.is_empty() {
            return Err(ConfigError::EmptyLocations);
        }
        if self.merchants.contains(&self.unknown_merchant) {
            return Err(ConfigError::SentinelInWhitelist(self.unknown_merchant.clone()));
        }
        if self.locations.contains(&self.foreign_location) {
            return Err(ConfigError::SentinelInWhitelist(self.foreign_location.clone()));
        }

        self.thresholds.validate()?;
        self.normal_amount.validate("normal")?;
        self.anomalous_amount.validate("anomalous")?;

        if !(0.0..=1.0).contains(&self.anomaly_probability) {
            return Err(ConfigError::InvalidProbability(self.anomaly_probability));
        }

        if !(MIN_TICK_SECS..=MAX_TICK_SECS).contains(&self.tick_interval_secs) {
            return Err(ConfigError::InvalidTickInterval(self.tick_interval_secs));
        }

        if self.ledger_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }

        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(self.tick_interval_secs)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

// ============================================================================
// TESTS
// ============================================================================
