//! Receipt document rules.
//!
//! Receipts have no draft/signed distinction: every successful write posts to
//! the ledger immediately. A receipt may carry zero lines (a document emptied
//! by line removal collapses instead), but every line that is present must
//! have a strictly positive quantity, on create and update alike.

use rust_decimal::Decimal;
use warehouse_shared::error::{EngineError, EngineResult};

use crate::document::LineInput;

/// Validates receipt lines: each quantity must be strictly positive.
///
/// An empty line set is permitted.
///
/// # Errors
///
/// Returns `Validation` naming the offending line.
pub fn validate_lines(lines: &[LineInput]) -> EngineResult<()> {
    for line in lines {
        if line.quantity <= Decimal::ZERO {
            return Err(EngineError::Validation(format!(
                "receipt line for {} has non-positive quantity {}",
                crate::ledger::BalanceKey::new(line.resource, line.unit),
                line.quantity
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use warehouse_shared::types::{ResourceId, UnitId};

    fn line(quantity: Decimal) -> LineInput {
        LineInput::new(ResourceId::new(1), UnitId::new(1), quantity)
    }

    #[test]
    fn test_empty_line_set_is_valid() {
        assert!(validate_lines(&[]).is_ok());
    }

    #[test]
    fn test_positive_quantities_pass() {
        assert!(validate_lines(&[line(dec!(0.001)), line(dec!(100))]).is_ok());
    }

    #[test]
    fn test_zero_and_negative_quantities_rejected() {
        for quantity in [dec!(0), dec!(-1)] {
            let err = validate_lines(&[line(dec!(5)), line(quantity)]).unwrap_err();
            assert!(matches!(err, EngineError::Validation(_)));
        }
    }
}
