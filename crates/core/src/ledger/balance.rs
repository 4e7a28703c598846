//! Balance delta arithmetic.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use warehouse_shared::error::{EngineError, EngineResult};
use warehouse_shared::types::{ResourceId, UnitId};

/// Key of one balance row: a (resource, unit) pair.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BalanceKey {
    /// The resource.
    pub resource: ResourceId,
    /// The unit of measurement.
    pub unit: UnitId,
}

impl BalanceKey {
    /// Creates a new balance key.
    #[must_use]
    pub const fn new(resource: ResourceId, unit: UnitId) -> Self {
        Self { resource, unit }
    }
}

impl std::fmt::Display for BalanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "resource {} / unit {}", self.resource, self.unit)
    }
}

/// Applies a delta to the current quantity of one balance row.
///
/// `current` is `None` when no row exists for the pair yet. Returns the new
/// quantity; the caller creates the row on `None` or updates it otherwise.
///
/// # Errors
///
/// Returns `InsufficientStock` when the delta would drive the quantity
/// negative, without any other effect.
pub fn apply_delta(key: BalanceKey, current: Option<Decimal>, delta: Decimal) -> EngineResult<Decimal> {
    match current {
        None => {
            if delta < Decimal::ZERO {
                return Err(EngineError::InsufficientStock(format!(
                    "no balance for {key}, cannot apply delta {delta}"
                )));
            }
            Ok(delta)
        }
        Some(quantity) => {
            let updated = quantity + delta;
            if updated < Decimal::ZERO {
                return Err(EngineError::InsufficientStock(format!(
                    "balance for {key} is {quantity}, cannot apply delta {delta}"
                )));
            }
            Ok(updated)
        }
    }
}

/// Replays a sequence of ledger deltas from empty state.
///
/// Receipt lines contribute positive deltas and signed shipment lines negative
/// ones; replaying all of them must reproduce the stored ledger exactly.
///
/// # Errors
///
/// Returns `InsufficientStock` if the sequence would transiently drive any
/// balance negative.
pub fn replay<I>(deltas: I) -> EngineResult<HashMap<BalanceKey, Decimal>>
where
    I: IntoIterator<Item = (BalanceKey, Decimal)>,
{
    let mut balances: HashMap<BalanceKey, Decimal> = HashMap::new();
    for (key, delta) in deltas {
        let updated = apply_delta(key, balances.get(&key).copied(), delta)?;
        balances.insert(key, updated);
    }
    Ok(balances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn key() -> BalanceKey {
        BalanceKey::new(ResourceId::new(1), UnitId::new(1))
    }

    #[test]
    fn test_missing_row_negative_delta_fails() {
        let err = apply_delta(key(), None, dec!(-1)).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientStock(_)));
    }

    #[test]
    fn test_missing_row_positive_delta_creates() {
        assert_eq!(apply_delta(key(), None, dec!(100)).unwrap(), dec!(100));
        assert_eq!(apply_delta(key(), None, dec!(0)).unwrap(), dec!(0));
    }

    #[test]
    fn test_existing_row_applies_delta() {
        assert_eq!(apply_delta(key(), Some(dec!(100)), dec!(-30)).unwrap(), dec!(70));
        assert_eq!(apply_delta(key(), Some(dec!(70)), dec!(30)).unwrap(), dec!(100));
        assert_eq!(apply_delta(key(), Some(dec!(100)), dec!(-100)).unwrap(), dec!(0));
    }

    #[test]
    fn test_overdraw_fails_without_mutating() {
        let err = apply_delta(key(), Some(dec!(100)), dec!(-150)).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientStock(_)));
    }

    #[test]
    fn test_replay_reproduces_totals() {
        let r1 = BalanceKey::new(ResourceId::new(1), UnitId::new(1));
        let r2 = BalanceKey::new(ResourceId::new(2), UnitId::new(1));
        let balances = replay(vec![
            (r1, dec!(100)),
            (r2, dec!(5)),
            (r1, dec!(-30)),
            (r1, dec!(30)),
        ])
        .unwrap();
        assert_eq!(balances[&r1], dec!(100));
        assert_eq!(balances[&r2], dec!(5));
    }

    #[test]
    fn test_replay_rejects_transient_negative() {
        let err = replay(vec![(key(), dec!(10)), (key(), dec!(-20))]).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientStock(_)));
    }

    /// Strategy for generating deltas, biased toward debits to exercise the
    /// rejection path.
    fn delta_strategy() -> impl Strategy<Value = Decimal> {
        (-150_000i64..100_000i64).prop_map(|n| Decimal::new(n, 3))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// For any sequence of deltas where failed applications are skipped,
        /// the running quantity is never observed negative.
        #[test]
        fn prop_quantity_never_negative(deltas in prop::collection::vec(delta_strategy(), 1..50)) {
            let mut current: Option<Decimal> = None;
            for delta in deltas {
                if let Ok(updated) = apply_delta(key(), current, delta) {
                    current = Some(updated);
                }
                prop_assert!(current.unwrap_or(Decimal::ZERO) >= Decimal::ZERO);
            }
        }

        /// Successful applications are plain addition.
        #[test]
        fn prop_successful_delta_is_addition(
            start in (0i64..1_000_000i64).prop_map(|n| Decimal::new(n, 3)),
            delta in delta_strategy(),
        ) {
            match apply_delta(key(), Some(start), delta) {
                Ok(updated) => prop_assert_eq!(updated, start + delta),
                Err(_) => prop_assert!(start + delta < Decimal::ZERO),
            }
        }

        /// Replaying only positive deltas always succeeds and sums per key.
        #[test]
        fn prop_replay_positive_sums(
            quantities in prop::collection::vec((0i32..5, 1i64..10_000i64), 1..40),
        ) {
            let deltas: Vec<(BalanceKey, Decimal)> = quantities
                .iter()
                .map(|&(r, q)| {
                    (BalanceKey::new(ResourceId::new(r), UnitId::new(1)), Decimal::new(q, 3))
                })
                .collect();

            let balances = replay(deltas.clone()).unwrap();
            for (replayed_key, quantity) in &balances {
                let expected: Decimal = deltas
                    .iter()
                    .filter(|(k, _)| k == replayed_key)
                    .map(|(_, d)| *d)
                    .sum();
                prop_assert_eq!(*quantity, expected);
            }
        }

        /// A debit immediately followed by the matching credit restores the
        /// starting quantity exactly.
        #[test]
        fn prop_debit_credit_round_trip(
            start in (0i64..1_000_000i64).prop_map(|n| Decimal::new(n, 3)),
            amount in (1i64..1_000_000i64).prop_map(|n| Decimal::new(n, 3)),
        ) {
            match apply_delta(key(), Some(start), -amount) {
                Ok(debited) => {
                    let restored = apply_delta(key(), Some(debited), amount).unwrap();
                    prop_assert_eq!(restored, start);
                }
                Err(_) => prop_assert!(start < amount),
            }
        }
    }
}
