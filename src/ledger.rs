// 📒 Bounded Ledger - newest first, fixed capacity
// Feeds the live view. Appends never rescan or rescore existing entries.

use crate::error::ConfigError;
use crate::transaction::{Transaction, TransactionStatus};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

/// Rolling metrics derived from the ledger's current contents
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregates {
    /// Sum of amounts with status APPROVED
    pub approved_volume: f64,
    pub approved_count: usize,
    pub review_count: usize,
    pub blocked_count: usize,
    /// Risk score of the head entry
    pub last_risk: Option<u8>,
    pub len: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct StatusCounts {
    approved: usize,
    review: usize,
    blocked: usize,
}

impl StatusCounts {
    fn slot(&mut self, status: TransactionStatus) -> &mut usize {
        match status {
            TransactionStatus::Approved => &mut self.approved,
            TransactionStatus::Review => &mut self.review,
            TransactionStatus::Blocked => &mut self.blocked,
        }
    }
}

/// Owned by one session; dropped with it. There is no global instance.
#[derive(Debug, Clone)]
pub struct Ledger {
    entries: VecDeque<Transaction>,
    capacity: usize,
    counts: StatusCounts,
}

impl Ledger {
    pub fn with_capacity(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }

        Ok(Ledger {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
            counts: StatusCounts::default(),
        })
    }

    /// Insert at the head; returns the evicted tail entry once full
    pub fn append(&mut self, transaction: Transaction) -> Option<Transaction> {
        *self.counts.slot(transaction.status()) += 1;
        self.entries.push_front(transaction);

        if self.entries.len() > self.capacity {
            let evicted = self.entries.pop_back()?;
            *self.counts.slot(evicted.status()) -= 1;
            tracing::trace!(id = %evicted.id(), "evicted oldest ledger entry");
            Some(evicted)
        } else {
            None
        }
    }

    /// Operator override. Same path and eviction rules as `append`.
    pub fn manual_insert(&mut self, transaction: Transaction) -> Option<Transaction> {
        tracing::warn!(
            id = %transaction.id(),
            risk_score = transaction.risk_score(),
            status = transaction.status().label(),
            "manual ledger insert"
        );
        self.append(transaction)
    }

    /// Status counts are kept incrementally; the volume is summed on demand
    pub fn aggregate(&self) -> Aggregates {
        Aggregates {
            approved_volume: self.approved_volume(),
            approved_count: self.counts.approved,
            review_count: self.counts.review,
            blocked_count: self.counts.blocked,
            last_risk: self.head().map(Transaction::risk_score),
            len: self.entries.len(),
        }
    }

    /// Full scan, ignoring incremental state
    pub fn recompute(&self) -> Aggregates {
        let count = |status: TransactionStatus| self.entries.iter().filter(|tx| tx.status() == status).count();

        Aggregates {
            approved_volume: self.approved_volume(),
            approved_count: count(TransactionStatus::Approved),
            review_count: count(TransactionStatus::Review),
            blocked_count: count(TransactionStatus::Blocked),
            last_risk: self.head().map(Transaction::risk_score),
            len: self.entries.len(),
        }
    }

    fn approved_volume(&self) -> f64 {
        self.entries
            .iter()
            .filter(|tx| tx.status() == TransactionStatus::Approved)
            .map(Transaction::amount)
            .sum()
    }

    /// Approved spend per category, largest first
    pub fn category_totals(&self) -> Vec<(String, f64)> {
        let mut totals: HashMap<&str, f64> = HashMap::new();

        for tx in self.entries.iter().filter(|tx| tx.status() == TransactionStatus::Approved) {
            *totals.entry(tx.category()).or_insert(0.0) += tx.amount();
        }

        let mut result: Vec<_> = totals
            .into_iter()
            .map(|(category, total)| (category.to_string(), total))
            .collect();

        result.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        result
    }

    /// Newest first
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Transaction> {
        self.entries.get(index)
    }

    pub fn head(&self) -> Option<&Transaction> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::rules::RiskScorer;
    use crate::transaction::{Origin, TransactionDraft};
    use proptest::prelude::*;

    /// Score a row that lands on `status` under the default rules.
    /// Blocked rows need an amount above the high-amount threshold.
    fn tx(amount: f64, category: &str, status: TransactionStatus) -> Transaction {
        let (merchant, location) = match status {
            TransactionStatus::Approved => ("Amazon", "Delhi"),
            TransactionStatus::Review => ("Unknown Merchant", "Delhi"),
            TransactionStatus::Blocked => ("Unknown Merchant", "Foreign Location"),
        };
        let scorer = RiskScorer::from_config(&SimulationConfig::default()).unwrap();
        let assessment = scorer.score(amount, merchant, location).unwrap();
        assert_eq!(assessment.status(), status);

        Transaction::from_draft(
            TransactionDraft {
                amount,
                merchant: merchant.to_string(),
                location: location.to_string(),
                category: category.to_string(),
            },
            assessment,
            Origin::Simulated,
        )
    }

    fn status_from(n: u8) -> TransactionStatus {
        match n % 3 {
            0 => TransactionStatus::Approved,
            1 => TransactionStatus::Review,
            _ => TransactionStatus::Blocked,
        }
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(Ledger::with_capacity(0), Err(ConfigError::ZeroCapacity)));
    }

    #[test]
    fn test_newest_first() {
        let mut ledger = Ledger::with_capacity(5).unwrap();
        ledger.append(tx(1.0, "Food", TransactionStatus::Approved));
        ledger.append(tx(2.0, "Food", TransactionStatus::Approved));

        let amounts: Vec<f64> = ledger.iter().map(Transaction::amount).collect();
        assert_eq!(amounts, vec![2.0, 1.0]);
        assert_eq!(ledger.head().map(Transaction::amount), Some(2.0));
    }

    #[test]
    fn test_evicts_oldest_once_full() {
        let mut ledger = Ledger::with_capacity(50).unwrap();
        let first = tx(1.0, "Food", TransactionStatus::Approved);
        let first_id = first.id();

        assert!(ledger.append(first).is_none());
        for i in 2..=50 {
            assert!(ledger.append(tx(i as f64, "Food", TransactionStatus::Approved)).is_none());
        }
        assert_eq!(ledger.len(), 50);

        let evicted = ledger.append(tx(51.0, "Food", TransactionStatus::Approved));
        assert_eq!(evicted.map(|t| t.id()), Some(first_id));
        assert_eq!(ledger.len(), 50);
        assert!(ledger.iter().all(|t| t.id() != first_id));
        assert_eq!(ledger.head().map(Transaction::amount), Some(51.0));
    }

    #[test]
    fn test_manual_insert_lands_at_head() {
        let mut ledger = Ledger::with_capacity(3).unwrap();
        for i in 0..3 {
            ledger.append(tx(i as f64, "Food", TransactionStatus::Approved));
        }

        let attack = tx(50_000.0, "Others", TransactionStatus::Blocked);
        let attack_id = attack.id();
        let evicted = ledger.manual_insert(attack);

        assert!(evicted.is_some());
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.head().map(Transaction::id), Some(attack_id));
        assert_eq!(ledger.aggregate().blocked_count, 1);
        assert_eq!(ledger.aggregate().last_risk, Some(100));
    }

    #[test]
    fn test_aggregates() {
        let mut ledger = Ledger::with_capacity(10).unwrap();
        assert_eq!(ledger.aggregate(), Aggregates::default());

        ledger.append(tx(100.0, "Food", TransactionStatus::Approved));
        ledger.append(tx(250.0, "Shopping", TransactionStatus::Approved));
        ledger.append(tx(900.0, "Others", TransactionStatus::Review));
        ledger.append(tx(20_000.0, "Others", TransactionStatus::Blocked));

        let agg = ledger.aggregate();
        assert_eq!(agg.approved_volume, 350.0);
        assert_eq!(agg.approved_count, 2);
        assert_eq!(agg.review_count, 1);
        assert_eq!(agg.blocked_count, 1);
        assert_eq!(agg.last_risk, Some(100));
        assert_eq!(agg.len, 4);
    }

    #[test]
    fn test_category_totals_only_count_approved() {
        let mut ledger = Ledger::with_capacity(10).unwrap();
        ledger.append(tx(100.0, "Food", TransactionStatus::Approved));
        ledger.append(tx(300.0, "Shopping", TransactionStatus::Approved));
        ledger.append(tx(50.0, "Food", TransactionStatus::Approved));
        ledger.append(tx(40_000.0, "Others", TransactionStatus::Blocked));

        assert_eq!(
            ledger.category_totals(),
            vec![("Shopping".to_string(), 300.0), ("Food".to_string(), 150.0)]
        );
    }

    proptest! {
        #[test]
        fn incremental_matches_full_scan(
            capacity in 1usize..20,
            ops in prop::collection::vec((0u8..3, 1u32..5_000), 0..200),
        ) {
            let mut ledger = Ledger::with_capacity(capacity).unwrap();
            for (n, cents) in ops {
                let status = status_from(n);
                let amount = match status {
                    TransactionStatus::Blocked => 20_000.0,
                    _ => f64::from(cents) / 100.0,
                };
                ledger.append(tx(amount, "Food", status));
                prop_assert!(ledger.len() <= capacity);
                prop_assert_eq!(ledger.aggregate(), ledger.recompute());
            }
        }
    }
}
