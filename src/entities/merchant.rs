// 🏪 Merchant Directory - Whitelist + sentinel + category lookup
//
// Known merchants are drawn for normal traffic. The sentinel stands in for
// any merchant not seen in the user's history and always trips a risk rule.

use crate::config::SimulationConfig;
use crate::error::ConfigError;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct MerchantDirectory {
    known: Vec<String>,
    unknown: String,
    categories: BTreeMap<String, String>,
    default_category: String,
}

impl MerchantDirectory {
    pub fn new(
        known: Vec<String>,
        unknown: String,
        categories: BTreeMap<String, String>,
        default_category: String,
    ) -> Result<Self, ConfigError> {
        if known.is_empty() {
            return Err(ConfigError::EmptyMerchants);
        }
        if known.contains(&unknown) {
            return Err(ConfigError::SentinelInWhitelist(unknown));
        }

        Ok(MerchantDirectory {
            known,
            unknown,
            categories,
            default_category,
        })
    }

    pub fn from_config(config: &SimulationConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.merchants.clone(),
            config.unknown_merchant.clone(),
            config.categories.clone(),
            config.default_category.clone(),
        )
    }

    /// Whitelisted merchants (never empty)
    pub fn known(&self) -> &[String] {
        &self.known
    }

    pub fn unknown(&self) -> &str {
        &self.unknown
    }

    pub fn is_unknown(&self, merchant: &str) -> bool {
        merchant == self.unknown
    }

    /// Fixed lookup; unmapped merchants land in the default category
    pub fn category_for(&self, merchant: &str) -> &str {
        self.categories
            .get(merchant)
            .map(String::as_str)
            .unwrap_or(&self.default_category)
    }
}
