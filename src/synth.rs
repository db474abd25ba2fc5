// 🎲 Transaction Synthesizer
// Produces one unscored transaction per call, optionally skewed toward an anomaly

use crate::config::{AmountRange, SimulationConfig};
use crate::entities::{LocationDirectory, MerchantDirectory};
use crate::error::ConfigError;
use crate::transaction::TransactionDraft;
use rand::Rng;

// ============================================================================
// ANOMALY STRATEGY
// ============================================================================

/// Weighted choice between a normal and an anomalous profile.
/// `force` wins over the probability draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyStrategy {
    probability: f64,
    force: bool,
}

impl AnomalyStrategy {
    /// Probability must be a finite value in 0.0..=1.0
    pub fn new(probability: f64) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(ConfigError::InvalidProbability(probability));
        }
        Ok(AnomalyStrategy {
            probability,
            force: false,
        })
    }

    pub fn forced() -> Self {
        AnomalyStrategy {
            probability: 1.0,
            force: true,
        }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn is_forced(&self) -> bool {
        self.force
    }

    pub fn set_force(&mut self, force: bool) {
        self.force = force;
    }

    pub fn should_bias<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        self.force || rng.gen_bool(self.probability)
    }
}

// ============================================================================
// SYNTHESIZER
// ============================================================================

#[derive(Debug, Clone)]
pub struct Synthesizer {
    merchants: MerchantDirectory,
    locations: LocationDirectory,
    normal_amount: AmountRange,
    anomalous_amount: AmountRange,
}

impl Synthesizer {
    pub fn new(config: &SimulationConfig) -> Result<Self, ConfigError> {
        config.normal_amount.validate("normal")?;
        config.anomalous_amount.validate("anomalous")?;

        Ok(Synthesizer {
            merchants: MerchantDirectory::from_config(config)?,
            locations: LocationDirectory::from_config(config)?,
            normal_amount: config.normal_amount,
            anomalous_amount: config.anomalous_amount,
        })
    }

    pub fn merchants(&self) -> &MerchantDirectory {
        &self.merchants
    }

    pub fn locations(&self) -> &LocationDirectory {
        &self.locations
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R, biased: bool) -> TransactionDraft {
        let (amount, merchant, location) = if biased {
            (
                draw_amount(rng, self.anomalous_amount),
                self.merchants.unknown().to_string(),
                self.locations.foreign().to_string(),
            )
        } else {
            (
                draw_amount(rng, self.normal_amount),
                pick(rng, self.merchants.known()).to_string(),
                pick(rng, self.locations.normal()).to_string(),
            )
        };

        self.draft(amount, merchant, location)
    }

    pub fn generate_with_strategy<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        strategy: &AnomalyStrategy,
    ) -> TransactionDraft {
        let biased = strategy.should_bias(rng);
        self.generate(rng, biased)
    }

    /// Deterministic worst-case profile used for operator injections
    pub fn attack_draft(&self) -> TransactionDraft {
        self.draft(
            self.anomalous_amount.max,
            self.merchants.unknown().to_string(),
            self.locations.foreign().to_string(),
        )
    }

    fn draft(&self, amount: f64, merchant: String, location: String) -> TransactionDraft {
        let category = self.merchants.category_for(&merchant).to_string();
        TransactionDraft {
            amount,
            merchant,
            location,
            category,
        }
    }
}

// Ranges are validated on construction, so gen_range never sees min > max
fn draw_amount<R: Rng + ?Sized>(rng: &mut R, range: AmountRange) -> f64 {
    let raw = rng.gen_range(range.min..=range.max);
    ((raw * 100.0).round() / 100.0).clamp(range.min, range.max)
}

// Directories reject empty whitelists, so the index is always in bounds
fn pick<'a, R: Rng + ?Sized>(rng: &mut R, items: &'a [String]) -> &'a str {
    &items[rng.gen_range(0..items.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn synth() -> Synthesizer {
        Synthesizer::new(&SimulationConfig::default()).unwrap()
    }

    #[test]
    fn test_normal_profile() {
        let synth = synth();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..500 {
            let draft = synth.generate(&mut rng, false);
            assert!((100.0..=3_000.0).contains(&draft.amount));
            assert!(synth.merchants().known().contains(&draft.merchant));
            assert!(synth.locations().normal().contains(&draft.location));
            assert_eq!(draft.category, synth.merchants().category_for(&draft.merchant));
        }
    }

    #[test]
    fn test_biased_profile() {
        let synth = synth();
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..200 {
            let draft = synth.generate(&mut rng, true);
            assert!((15_000.0..=50_000.0).contains(&draft.amount));
            assert_eq!(draft.merchant, "Unknown Merchant");
            assert_eq!(draft.location, "Foreign Location");
            assert_eq!(draft.category, "Others");
        }
    }

    #[test]
    fn test_amounts_have_two_decimals() {
        let synth = synth();
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..100 {
            let draft = synth.generate(&mut rng, false);
            let cents = draft.amount * 100.0;
            assert!((cents - cents.round()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_strategy_probability_edges() {
        let mut rng = StdRng::seed_from_u64(5);

        let never = AnomalyStrategy::new(0.0).unwrap();
        let always = AnomalyStrategy::new(1.0).unwrap();
        for _ in 0..100 {
            assert!(!never.should_bias(&mut rng));
            assert!(always.should_bias(&mut rng));
        }

        let mut forced = AnomalyStrategy::new(0.0).unwrap();
        forced.set_force(true);
        assert!(forced.is_forced());
        assert!(forced.should_bias(&mut rng));
        assert!(AnomalyStrategy::forced().should_bias(&mut rng));
    }

    #[test]
    fn test_strategy_rejects_bad_probability() {
        for p in [f64::NAN, f64::INFINITY, -0.1, 1.5] {
            assert!(matches!(
                AnomalyStrategy::new(p),
                Err(ConfigError::InvalidProbability(_))
            ));
        }
    }

    #[test]
    fn test_inverted_ranges_refused() {
        let mut config = SimulationConfig::default();
        config.anomalous_amount = AmountRange::new(50_000.0, 15_000.0);
        assert!(matches!(
            Synthesizer::new(&config),
            Err(ConfigError::InvalidAmountRange { name: "anomalous", .. })
        ));

        let mut config = SimulationConfig::default();
        config.normal_amount = AmountRange::new(f64::NAN, 3_000.0);
        assert!(matches!(
            Synthesizer::new(&config),
            Err(ConfigError::InvalidAmountRange { name: "normal", .. })
        ));
    }

    #[test]
    fn test_strategy_rate_is_roughly_respected() {
        let synth = synth();
        let mut rng = StdRng::seed_from_u64(42);
        let strategy = AnomalyStrategy::new(0.15).unwrap();

        let anomalies = (0..10_000)
            .map(|_| synth.generate_with_strategy(&mut rng, &strategy))
            .filter(|d| d.merchant == "Unknown Merchant")
            .count();

        assert!((1_000..2_000).contains(&anomalies), "got {}", anomalies);
    }

    #[test]
    fn test_attack_draft_is_worst_case() {
        let draft = synth().attack_draft();
        assert_eq!(draft.amount, 50_000.0);
        assert_eq!(draft.merchant, "Unknown Merchant");
        assert_eq!(draft.location, "Foreign Location");
    }
}
