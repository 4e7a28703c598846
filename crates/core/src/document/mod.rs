//! Document line items and line-set replacement.
//!
//! Receipt and shipment documents share the same line shape and the same
//! update semantics: an incoming line carrying the id of a stored line edits
//! it in place, a line without a matching id is appended, and stored lines
//! absent from the request are removed. The replacement is planned up front
//! so the engines can validate and roll back ledger effects before touching
//! any row.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use warehouse_shared::error::{EngineError, EngineResult};
use warehouse_shared::types::{ResourceId, UnitId};

use crate::archive;

/// Longest permitted document number.
pub const MAX_NUMBER_LEN: usize = 50;

/// A line item as currently persisted, identified by its raw row key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingLine {
    /// Row key of the stored line.
    pub id: i32,
    /// The resource.
    pub resource: ResourceId,
    /// The unit of measurement.
    pub unit: UnitId,
    /// Stored quantity.
    pub quantity: Decimal,
}

/// An incoming line item.
///
/// `id` is `Some` when the caller edits a stored line in place; unknown or
/// absent ids make the line a fresh insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    /// Row key of the stored line this input edits, if any.
    pub id: Option<i32>,
    /// The resource.
    pub resource: ResourceId,
    /// The unit of measurement.
    pub unit: UnitId,
    /// Requested quantity.
    pub quantity: Decimal,
}

impl LineInput {
    /// Creates a fresh line input without a stored-row reference.
    #[must_use]
    pub const fn new(resource: ResourceId, unit: UnitId, quantity: Decimal) -> Self {
        Self { id: None, resource, unit, quantity }
    }

    /// The (resource, unit) pair this line references.
    #[must_use]
    pub const fn pair(&self) -> (ResourceId, UnitId) {
        (self.resource, self.unit)
    }
}

/// An in-place edit of a stored line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineUpdate {
    /// Row key of the stored line.
    pub id: i32,
    /// New resource.
    pub resource: ResourceId,
    /// New unit of measurement.
    pub unit: UnitId,
    /// New quantity.
    pub quantity: Decimal,
    /// Pair the line carried before the edit, for archive grandfathering.
    pub previous: (ResourceId, UnitId),
}

/// Planned replacement of a document's line set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinePlan {
    /// Stored lines edited in place.
    pub updates: Vec<LineUpdate>,
    /// Fresh lines to append.
    pub inserts: Vec<LineInput>,
    /// Row keys of stored lines to remove.
    pub removals: Vec<i32>,
}

impl LinePlan {
    /// Pairs that need a fresh archive check: every insert, plus every update
    /// that changed its (resource, unit) pair.
    #[must_use]
    pub fn pairs_needing_archive_check(&self) -> Vec<(ResourceId, UnitId)> {
        let mut pairs: Vec<(ResourceId, UnitId)> = self
            .inserts
            .iter()
            .map(LineInput::pair)
            .chain(self.updates.iter().filter_map(|u| {
                let pair = (u.resource, u.unit);
                archive::needs_check(pair, Some(u.previous)).then_some(pair)
            }))
            .collect();
        pairs.sort_unstable();
        pairs.dedup();
        pairs
    }
}

/// Plans the replacement of `existing` lines by `incoming` ones.
#[must_use]
pub fn plan_replacement(existing: &[ExistingLine], incoming: &[LineInput]) -> LinePlan {
    let mut plan = LinePlan::default();

    for line in incoming {
        let matched = line
            .id
            .and_then(|id| existing.iter().find(|e| e.id == id));
        match matched {
            Some(stored) => plan.updates.push(LineUpdate {
                id: stored.id,
                resource: line.resource,
                unit: line.unit,
                quantity: line.quantity,
                previous: (stored.resource, stored.unit),
            }),
            None => plan.inserts.push(line.clone()),
        }
    }

    let kept: Vec<i32> = plan.updates.iter().map(|u| u.id).collect();
    plan.removals = existing
        .iter()
        .filter(|e| !kept.contains(&e.id))
        .map(|e| e.id)
        .collect();

    plan
}

/// Validates a document number: non-empty and at most [`MAX_NUMBER_LEN`]
/// characters.
///
/// # Errors
///
/// Returns `Validation` on an empty or overlong number.
pub fn validate_number(number: &str) -> EngineResult<()> {
    if number.trim().is_empty() {
        return Err(EngineError::Validation(
            "document number must not be empty".to_string(),
        ));
    }
    if number.chars().count() > MAX_NUMBER_LEN {
        return Err(EngineError::Validation(format!(
            "document number must not exceed {MAX_NUMBER_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(id: i32, resource: i32, unit: i32, quantity: Decimal) -> ExistingLine {
        ExistingLine {
            id,
            resource: ResourceId::new(resource),
            unit: UnitId::new(unit),
            quantity,
        }
    }

    fn input(id: Option<i32>, resource: i32, unit: i32, quantity: Decimal) -> LineInput {
        LineInput {
            id,
            resource: ResourceId::new(resource),
            unit: UnitId::new(unit),
            quantity,
        }
    }

    #[test]
    fn test_matching_id_updates_in_place() {
        let existing = [line(10, 1, 1, dec!(5))];
        let incoming = [input(Some(10), 1, 1, dec!(8))];
        let plan = plan_replacement(&existing, &incoming);

        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].id, 10);
        assert_eq!(plan.updates[0].quantity, dec!(8));
        assert!(plan.inserts.is_empty());
        assert!(plan.removals.is_empty());
    }

    #[test]
    fn test_unknown_or_missing_id_inserts() {
        let existing = [line(10, 1, 1, dec!(5))];
        let incoming = [
            input(Some(10), 1, 1, dec!(5)),
            input(None, 2, 1, dec!(3)),
            input(Some(999), 3, 1, dec!(4)),
        ];
        let plan = plan_replacement(&existing, &incoming);

        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.inserts.len(), 2);
        assert!(plan.removals.is_empty());
    }

    #[test]
    fn test_absent_lines_are_removed() {
        let existing = [line(10, 1, 1, dec!(5)), line(11, 2, 1, dec!(7))];
        let incoming = [input(Some(11), 2, 1, dec!(7))];
        let plan = plan_replacement(&existing, &incoming);

        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.removals, vec![10]);
    }

    #[test]
    fn test_empty_incoming_removes_everything() {
        let existing = [line(10, 1, 1, dec!(5)), line(11, 2, 1, dec!(7))];
        let plan = plan_replacement(&existing, &[]);

        assert!(plan.updates.is_empty());
        assert!(plan.inserts.is_empty());
        assert_eq!(plan.removals, vec![10, 11]);
    }

    #[test]
    fn test_archive_checks_skip_unchanged_pairs() {
        let existing = [line(10, 1, 1, dec!(5)), line(11, 2, 1, dec!(7))];
        let incoming = [
            // unchanged pair: grandfathered
            input(Some(10), 1, 1, dec!(9)),
            // changed resource: re-checked
            input(Some(11), 3, 1, dec!(7)),
            // insert: checked
            input(None, 4, 2, dec!(1)),
        ];
        let plan = plan_replacement(&existing, &incoming);

        let pairs = plan.pairs_needing_archive_check();
        assert_eq!(
            pairs,
            vec![
                (ResourceId::new(3), UnitId::new(1)),
                (ResourceId::new(4), UnitId::new(2)),
            ]
        );
    }

    #[test]
    fn test_number_validation() {
        assert!(validate_number("R-001").is_ok());
        assert!(validate_number("").is_err());
        assert!(validate_number("   ").is_err());
        assert!(validate_number(&"x".repeat(50)).is_ok());
        assert!(validate_number(&"x".repeat(51)).is_err());
    }
}
