// 🔁 Live Loop - generate → score → append → render, one tick at a time
//
// Single-threaded and cooperative: a tick runs to completion before the next
// one starts, so the ledger needs no locking. The only suspension point is the
// wait between ticks, owned by `Ticker`.

use crate::config::SimulationConfig;
use crate::error::{ConfigError, ValidationError};
use crate::ledger::{Aggregates, Ledger};
use crate::rules::RiskScorer;
use crate::synth::{AnomalyStrategy, Synthesizer};
use crate::transaction::{Origin, Transaction, TransactionDraft};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// ============================================================================
// STATE MACHINE
// ============================================================================

/// Phase of the live loop.
///
/// `Generating`, `Scoring`, `Appending` and `Rendering` only exist while a
/// `tick`/`process` call is running. Between calls the loop is always `Idle`
/// or `Halted`; the in-tick phases are visible through trace-level logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Generating,
    Scoring,
    Appending,
    Rendering,
    /// Terminal. No further transactions are processed.
    Halted,
}

impl LoopState {
    pub fn name(&self) -> &'static str {
        match self {
            LoopState::Idle => "IDLE",
            LoopState::Generating => "GENERATING",
            LoopState::Scoring => "SCORING",
            LoopState::Appending => "APPENDING",
            LoopState::Rendering => "RENDERING",
            LoopState::Halted => "HALTED",
        }
    }

    /// True for the phases that never outlive a single tick
    pub fn is_transient(&self) -> bool {
        !matches!(self, LoopState::Idle | LoopState::Halted)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// A transaction reached the ledger
    Appended(Aggregates),
    /// Scoring rejected the draft; the ledger is untouched
    Skipped(ValidationError),
    Halted,
}

/// Lockdown switch. Clones share the flag; once set it never clears.
#[derive(Debug, Clone, Default)]
pub struct HaltSignal(Arc<AtomicBool>);

impl HaltSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn halt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_halted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// TICKER
// ============================================================================

/// Paces ticks. Callers wait on `timeout()` (poll for input, sleep, ...)
/// and run a tick once `is_due()`.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    last_tick: Instant,
}

impl Ticker {
    pub fn new(interval: Duration) -> Self {
        Ticker {
            interval,
            last_tick: Instant::now(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Time left until the next tick is due
    pub fn timeout(&self) -> Duration {
        self.interval.saturating_sub(self.last_tick.elapsed())
    }

    pub fn is_due(&self) -> bool {
        self.last_tick.elapsed() >= self.interval
    }

    pub fn reset(&mut self) {
        self.last_tick = Instant::now();
    }
}

// ============================================================================
// LIVE LOOP
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub appended: u64,
    pub skipped: u64,
    pub injected: u64,
}

pub struct LiveLoop {
    synth: Synthesizer,
    scorer: RiskScorer,
    ledger: Ledger,
    strategy: AnomalyStrategy,
    rng: StdRng,
    state: LoopState,
    halt: HaltSignal,
    stats: LoopStats,
}

impl LiveLoop {
    pub fn new(config: &SimulationConfig) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Reproducible loop for tests and replays
    pub fn seeded(config: &SimulationConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &SimulationConfig, rng: StdRng) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(LiveLoop {
            synth: Synthesizer::new(config)?,
            scorer: RiskScorer::from_config(config)?,
            ledger: Ledger::with_capacity(config.ledger_capacity)?,
            strategy: AnomalyStrategy::new(config.anomaly_probability)?,
            rng,
            state: LoopState::Idle,
            halt: HaltSignal::new(),
            stats: LoopStats::default(),
        })
    }

    /// One full iteration. Checks the halt signal before doing any work.
    pub fn tick(&mut self) -> TickOutcome {
        if self.check_halt() {
            return TickOutcome::Halted;
        }

        self.stats.ticks += 1;
        self.enter(LoopState::Generating);
        let draft = self.synth.generate_with_strategy(&mut self.rng, &self.strategy);

        self.process(draft, Origin::Simulated)
    }

    /// Score and append one draft. A rejected draft costs only this tick.
    pub fn process(&mut self, draft: TransactionDraft, origin: Origin) -> TickOutcome {
        if self.check_halt() {
            return TickOutcome::Halted;
        }

        self.enter(LoopState::Scoring);
        let assessment = match self.scorer.score(draft.amount, &draft.merchant, &draft.location) {
            Ok(assessment) => assessment,
            Err(err) => {
                tracing::warn!(error = %err, merchant = %draft.merchant, "skipping tick");
                self.stats.skipped += 1;
                self.enter(LoopState::Idle);
                return TickOutcome::Skipped(err);
            }
        };

        let status = assessment.status();
        let transaction = Transaction::from_draft(draft, assessment, origin);

        self.enter(LoopState::Appending);
        tracing::debug!(
            id = %transaction.id(),
            amount = transaction.amount(),
            merchant = transaction.merchant(),
            risk_score = transaction.risk_score(),
            status = status.label(),
            "scored transaction"
        );
        match origin {
            Origin::Simulated => self.ledger.append(transaction),
            Origin::Injected => self.ledger.manual_insert(transaction),
        };
        self.stats.appended += 1;

        self.enter(LoopState::Rendering);
        let aggregates = self.ledger.aggregate();
        self.enter(LoopState::Idle);

        TickOutcome::Appended(aggregates)
    }

    /// Operator-forced attack. Routed through the scorer so the row
    /// carries the same reasons a natural anomaly would.
    pub fn inject_attack(&mut self) -> TickOutcome {
        let draft = self.synth.attack_draft();
        let outcome = self.process(draft, Origin::Injected);
        if matches!(outcome, TickOutcome::Appended(_)) {
            self.stats.injected += 1;
        }
        outcome
    }

    /// Lockdown. Terminal: nothing is processed afterwards.
    pub fn halt(&mut self) {
        if !self.halt.is_halted() {
            tracing::warn!(ticks = self.stats.ticks, "live loop halted by operator");
        }
        self.halt.halt();
        self.state = LoopState::Halted;
    }

    /// Handle for halting from outside the loop owner
    pub fn halt_signal(&self) -> HaltSignal {
        self.halt.clone()
    }

    fn enter(&mut self, state: LoopState) {
        tracing::trace!(from = self.state.name(), to = state.name(), "loop state");
        self.state = state;
    }

    fn check_halt(&mut self) -> bool {
        if self.halt.is_halted() {
            self.state = LoopState::Halted;
            true
        } else {
            false
        }
    }

    pub fn is_halted(&self) -> bool {
        self.state == LoopState::Halted || self.halt.is_halted()
    }

    /// Bias every tick toward an anomaly while set
    pub fn set_force_anomaly(&mut self, force: bool) {
        self.strategy.set_force(force);
    }

    pub fn force_anomaly(&self) -> bool {
        self.strategy.is_forced()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn scorer(&self) -> &RiskScorer {
        &self.scorer
    }
}

/// Drive up to `ticks` iterations, sleeping between them.
/// `on_render` sees the ledger after every tick. Stops early on halt.
pub fn run_headless<F>(live: &mut LiveLoop, ticks: u64, interval: Duration, mut on_render: F) -> LoopStats
where
    F: FnMut(&TickOutcome, &Ledger),
{
    let mut ticker = Ticker::new(interval);

    for n in 0..ticks {
        ticker.reset();
        let outcome = live.tick();
        on_render(&outcome, live.ledger());

        if outcome == TickOutcome::Halted {
            break;
        }

        // Whatever is left of the interval after the tick's own work
        if n + 1 < ticks {
            std::thread::sleep(ticker.timeout());
        }
    }

    live.stats()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RISK_SCORE_MAX;
    use crate::rules::{REASON_FOREIGN_LOCATION, REASON_HIGH_AMOUNT, REASON_UNKNOWN_MERCHANT};
    use crate::transaction::TransactionStatus;

    fn live() -> LiveLoop {
        LiveLoop::seeded(&SimulationConfig::default(), 99).unwrap()
    }

    #[test]
    fn test_starts_idle_and_empty() {
        let live = live();
        assert_eq!(live.state(), LoopState::Idle);
        assert!(live.ledger().is_empty());
        assert!(!live.is_halted());
    }

    #[test]
    fn test_invalid_config_refuses_to_start() {
        let mut config = SimulationConfig::default();
        config.thresholds.review_at = 90;
        assert!(LiveLoop::new(&config).is_err());

        let mut config = SimulationConfig::default();
        config.locations.clear();
        assert!(matches!(LiveLoop::new(&config), Err(ConfigError::EmptyLocations)));
    }

    #[test]
    fn test_ticks_fill_ledger_up_to_capacity() {
        let mut live = live();

        for _ in 0..120 {
            assert!(matches!(live.tick(), TickOutcome::Appended(_)));
            assert_eq!(live.state(), LoopState::Idle);
        }

        assert_eq!(live.ledger().len(), 50);
        assert_eq!(live.stats().ticks, 120);
        assert_eq!(live.stats().appended, 120);

        for tx in live.ledger().iter() {
            assert!(tx.risk_score() <= RISK_SCORE_MAX);
            assert_eq!(tx.status(), live.scorer().status_for(tx.risk_score()));
            assert_eq!(tx.origin(), Origin::Simulated);
        }
        assert_eq!(live.ledger().aggregate(), live.ledger().recompute());
    }

    #[test]
    fn test_only_resting_states_visible_between_calls() {
        let mut live = live();
        let mut seen = vec![live.state()];

        for _ in 0..5 {
            live.tick();
            seen.push(live.state());
        }
        live.inject_attack();
        seen.push(live.state());
        let bad = TransactionDraft {
            amount: f64::NAN,
            merchant: "Amazon".to_string(),
            location: "Delhi".to_string(),
            category: "Shopping".to_string(),
        };
        live.process(bad, Origin::Simulated);
        seen.push(live.state());
        live.halt();
        live.tick();
        seen.push(live.state());

        assert!(seen.iter().all(|state| !state.is_transient()));
        assert_eq!(seen.last(), Some(&LoopState::Halted));
        assert!(LoopState::Scoring.is_transient());
    }

    #[test]
    fn test_forced_anomaly_blocks_every_tick() {
        let mut live = live();
        live.set_force_anomaly(true);

        for _ in 0..10 {
            live.tick();
        }

        let agg = live.ledger().aggregate();
        assert_eq!(agg.blocked_count, 10);
        assert_eq!(agg.approved_volume, 0.0);
        assert!(live.ledger().iter().all(|tx| tx.merchant() == "Unknown Merchant"));
    }

    #[test]
    fn test_invalid_draft_skips_tick_without_touching_ledger() {
        let mut live = live();
        live.tick();
        live.tick();
        let before: Vec<_> = live.ledger().iter().map(|tx| tx.id()).collect();

        let bad = TransactionDraft {
            amount: -5.0,
            merchant: "Amazon".to_string(),
            location: "Delhi".to_string(),
            category: "Shopping".to_string(),
        };
        let outcome = live.process(bad, Origin::Simulated);

        assert_eq!(outcome, TickOutcome::Skipped(ValidationError::NegativeAmount(-5.0)));
        assert_eq!(live.state(), LoopState::Idle);
        assert_eq!(live.stats().skipped, 1);
        let after: Vec<_> = live.ledger().iter().map(|tx| tx.id()).collect();
        assert_eq!(before, after);

        assert!(matches!(live.tick(), TickOutcome::Appended(_)));
    }

    #[test]
    fn test_injected_attack_is_scored_and_at_head() {
        let mut live = live();
        for _ in 0..5 {
            live.tick();
        }

        let outcome = live.inject_attack();
        let head = live.ledger().head().unwrap();

        assert!(matches!(outcome, TickOutcome::Appended(ref agg) if agg.last_risk == Some(100)));
        assert_eq!(head.origin(), Origin::Injected);
        assert_eq!(head.risk_score(), 100);
        assert_eq!(head.status(), TransactionStatus::Blocked);
        assert_eq!(
            head.reasons(),
            &[
                REASON_HIGH_AMOUNT.to_string(),
                REASON_UNKNOWN_MERCHANT.to_string(),
                REASON_FOREIGN_LOCATION.to_string(),
            ]
        );
        assert_eq!(live.stats().injected, 1);
    }

    #[test]
    fn test_halt_is_terminal() {
        let mut live = live();
        live.tick();
        live.halt();

        assert_eq!(live.state(), LoopState::Halted);
        assert_eq!(live.tick(), TickOutcome::Halted);
        assert_eq!(live.inject_attack(), TickOutcome::Halted);
        assert_eq!(live.ledger().len(), 1);
        assert_eq!(live.stats().ticks, 1);
    }

    #[test]
    fn test_external_halt_signal_stops_next_tick() {
        let mut live = live();
        let signal = live.halt_signal();
        live.tick();

        signal.halt();
        assert!(live.is_halted());
        assert_eq!(live.tick(), TickOutcome::Halted);
        assert_eq!(live.state(), LoopState::Halted);
    }

    #[test]
    fn test_run_headless_stops_on_halt() {
        let mut live = live();
        let signal = live.halt_signal();
        let mut seen = 0;

        let stats = run_headless(&mut live, 100, Duration::ZERO, |_, ledger| {
            seen += 1;
            if ledger.len() == 3 {
                signal.halt();
            }
        });

        assert_eq!(stats.appended, 3);
        assert_eq!(seen, 4);
        assert_eq!(live.state(), LoopState::Halted);
    }

    #[test]
    fn test_ticker() {
        let mut ticker = Ticker::new(Duration::from_secs(60));
        assert!(!ticker.is_due());
        assert!(ticker.timeout() <= Duration::from_secs(60));

        ticker.set_interval(Duration::ZERO);
        assert!(ticker.is_due());
        assert_eq!(ticker.timeout(), Duration::ZERO);

        ticker.reset();
        assert!(ticker.is_due());
    }
}
