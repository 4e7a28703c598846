//! Shipment document rules: validation and the sign/revoke state machine.
//!
//! A shipment is created in `Draft` and only touches the ledger when signed.
//! `Draft -> Signed` (sign) debits every line; `Signed -> Draft` (revoke)
//! credits everything back. No other transitions exist, and a signed document
//! rejects every direct mutation until revoked.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use warehouse_shared::error::{EngineError, EngineResult};

use crate::document::LineInput;
use crate::ledger::BalanceKey;

/// Shipment document state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentState {
    /// Not yet signed; the ledger is untouched.
    Draft,
    /// Signed; every line has been debited from the ledger.
    Signed,
}

impl ShipmentState {
    /// Whether the document is signed.
    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::Signed)
    }

    /// Gate for update, delete, and line removal.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` on a signed document.
    pub fn ensure_editable(self) -> EngineResult<()> {
        match self {
            Self::Draft => Ok(()),
            Self::Signed => Err(EngineError::InvalidState(
                "document is signed, revoke it first".to_string(),
            )),
        }
    }

    /// Gate for signing.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when the document is already signed.
    pub fn ensure_can_sign(self) -> EngineResult<()> {
        match self {
            Self::Draft => Ok(()),
            Self::Signed => Err(EngineError::InvalidState(
                "document is already signed".to_string(),
            )),
        }
    }

    /// Gate for revoking.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when the document is not signed.
    pub fn ensure_can_revoke(self) -> EngineResult<()> {
        match self {
            Self::Signed => Ok(()),
            Self::Draft => Err(EngineError::InvalidState(
                "document is not signed".to_string(),
            )),
        }
    }
}

/// Validates shipment lines: at least one line, every quantity strictly
/// positive, and no duplicate (resource, unit) pair within the document.
///
/// # Errors
///
/// Returns `Validation` naming the violated rule.
pub fn validate_lines(lines: &[LineInput]) -> EngineResult<()> {
    if lines.is_empty() {
        return Err(EngineError::Validation(
            "shipment document must have at least one line".to_string(),
        ));
    }

    let mut seen: HashSet<BalanceKey> = HashSet::with_capacity(lines.len());
    for line in lines {
        if line.quantity <= Decimal::ZERO {
            return Err(EngineError::Validation(format!(
                "shipment line for {} has non-positive quantity {}",
                BalanceKey::new(line.resource, line.unit),
                line.quantity
            )));
        }
        if !seen.insert(BalanceKey::new(line.resource, line.unit)) {
            return Err(EngineError::Validation(format!(
                "duplicate shipment line for {}",
                BalanceKey::new(line.resource, line.unit)
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use warehouse_shared::types::{ResourceId, UnitId};

    fn line(resource: i32, unit: i32, quantity: Decimal) -> LineInput {
        LineInput::new(ResourceId::new(resource), UnitId::new(unit), quantity)
    }

    #[test]
    fn test_empty_line_set_rejected() {
        let err = validate_lines(&[]).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        for quantity in [dec!(0), dec!(-3)] {
            let err = validate_lines(&[line(1, 1, quantity)]).unwrap_err();
            assert!(matches!(err, EngineError::Validation(_)));
        }
    }

    #[test]
    fn test_duplicate_pair_rejected() {
        let err = validate_lines(&[line(1, 1, dec!(5)), line(1, 1, dec!(3))]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));

        // same resource in a different unit is a distinct line
        assert!(validate_lines(&[line(1, 1, dec!(5)), line(1, 2, dec!(3))]).is_ok());
    }

    #[test]
    fn test_draft_allows_edit_and_sign() {
        assert!(ShipmentState::Draft.ensure_editable().is_ok());
        assert!(ShipmentState::Draft.ensure_can_sign().is_ok());
        assert!(ShipmentState::Draft.ensure_can_revoke().is_err());
    }

    #[test]
    fn test_signed_only_allows_revoke() {
        assert!(ShipmentState::Signed.ensure_editable().is_err());
        assert!(ShipmentState::Signed.ensure_can_sign().is_err());
        assert!(ShipmentState::Signed.ensure_can_revoke().is_ok());
    }

    #[test]
    fn test_double_sign_reports_state_not_stock() {
        let err = ShipmentState::Signed.ensure_can_sign().unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
        assert!(err.to_string().contains("already signed"));
    }

    fn state_strategy() -> impl Strategy<Value = ShipmentState> {
        prop_oneof![Just(ShipmentState::Draft), Just(ShipmentState::Signed)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Exactly one of sign/revoke is legal in every state, and editing is
        /// legal precisely when signing is.
        #[test]
        fn prop_state_gates_are_exclusive(state in state_strategy()) {
            let can_sign = state.ensure_can_sign().is_ok();
            let can_revoke = state.ensure_can_revoke().is_ok();
            let can_edit = state.ensure_editable().is_ok();

            prop_assert!(can_sign ^ can_revoke);
            prop_assert_eq!(can_edit, can_sign);
            prop_assert_eq!(can_revoke, state.is_signed());
        }
    }
}
