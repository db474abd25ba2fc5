// FinGuard - Core Library
// Transaction synthesizer, risk scorer and bounded ledger behind the live dashboard

pub mod config;
pub mod entities;
pub mod error;
pub mod export;
pub mod ledger;
pub mod live;
pub mod rules;
pub mod synth;
pub mod transaction;

// Re-export commonly used types
pub use config::{
    AmountRange, RiskRules, SimulationConfig, StatusThresholds,
    RISK_SCORE_MAX, RISK_SCORE_MIN,
};
pub use entities::{LocationDirectory, MerchantDirectory};
pub use error::{ConfigError, ValidationError};
pub use export::{export_csv, write_csv};
pub use ledger::{Aggregates, Ledger};
pub use live::{run_headless, HaltSignal, LiveLoop, LoopState, LoopStats, TickOutcome, Ticker};
pub use rules::{RiskAssessment, RiskRule, RiskScorer, RuleCondition};
pub use synth::{AnomalyStrategy, Synthesizer};
pub use transaction::{Origin, Transaction, TransactionDraft, TransactionStatus};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
