// ⚠️ Error Taxonomy
// Configuration errors are fatal at startup, validation errors cost one tick

use std::path::PathBuf;
use thiserror::Error;

/// Raised while building the simulation from its configuration.
/// Any of these must stop the process before the live loop starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("merchant whitelist is empty")]
    EmptyMerchants,

    #[error("location whitelist is empty")]
    EmptyLocations,

    #[error("sentinel {0:?} must not appear in its own whitelist")]
    SentinelInWhitelist(String),

    #[error("invalid status thresholds: review_at={review} must be below block_at={block} (max 100)")]
    InvalidThresholds { review: u8, block: u8 },

    #[error("invalid {name} amount range: {min}..={max}")]
    InvalidAmountRange { name: &'static str, min: f64, max: f64 },

    #[error("anomaly probability {0} is outside 0.0..=1.0")]
    InvalidProbability(f64),

    #[error("tick interval {0}s is outside 0.1..=2.0")]
    InvalidTickInterval(f64),

    #[error("ledger capacity must be at least 1")]
    ZeroCapacity,

    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Caller contract violations caught by the risk scorer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("amount {0} is negative")]
    NegativeAmount(f64),

    #[error("amount {0} is not a finite number")]
    NonFiniteAmount(f64),
}
