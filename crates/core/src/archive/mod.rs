//! Archive gate.
//!
//! Archived resources, units, and clients are soft-disabled: historical data
//! keeps referencing them, but new references are rejected. The gate is
//! consulted before a brand-new line is created; a line that keeps its
//! existing (resource, unit) pair during an edit is grandfathered and not
//! re-checked.

use warehouse_shared::error::{EngineError, EngineResult};
use warehouse_shared::types::{ClientId, ResourceId, UnitId};

/// Archival flags for a (resource, unit) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveStatus {
    /// Whether the resource is archived.
    pub resource_archived: bool,
    /// Whether the unit of measurement is archived.
    pub unit_archived: bool,
}

impl ArchiveStatus {
    /// True only if both the resource and the unit are non-archived.
    #[must_use]
    pub const fn is_usable(self) -> bool {
        !self.resource_archived && !self.unit_archived
    }
}

/// Whether a line needs a fresh archive check.
///
/// `previous` is the (resource, unit) pair the line carried before the edit,
/// or `None` for a brand-new line. Only new lines and pair changes are
/// checked; unchanged pairs keep their grandfathered reference.
#[must_use]
pub fn needs_check(
    pair: (ResourceId, UnitId),
    previous: Option<(ResourceId, UnitId)>,
) -> bool {
    previous != Some(pair)
}

/// Rejects a line referencing an archived resource or unit.
///
/// # Errors
///
/// Returns `ArchivedReference` naming the archived side.
pub fn ensure_usable(
    status: ArchiveStatus,
    resource: ResourceId,
    unit: UnitId,
) -> EngineResult<()> {
    if status.resource_archived {
        return Err(EngineError::ArchivedReference(format!(
            "resource {resource} is archived"
        )));
    }
    if status.unit_archived {
        return Err(EngineError::ArchivedReference(format!(
            "unit {unit} is archived"
        )));
    }
    Ok(())
}

/// Rejects binding an archived client to a shipment document.
///
/// # Errors
///
/// Returns `ArchivedReference` when the client is archived.
pub fn ensure_client_usable(client: ClientId, is_archived: bool) -> EngineResult<()> {
    if is_archived {
        return Err(EngineError::ArchivedReference(format!(
            "client {client} is archived"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTIVE: ArchiveStatus = ArchiveStatus {
        resource_archived: false,
        unit_archived: false,
    };

    #[test]
    fn test_usable_requires_both_active() {
        assert!(ACTIVE.is_usable());
        assert!(
            !ArchiveStatus { resource_archived: true, unit_archived: false }.is_usable()
        );
        assert!(
            !ArchiveStatus { resource_archived: false, unit_archived: true }.is_usable()
        );
        assert!(
            !ArchiveStatus { resource_archived: true, unit_archived: true }.is_usable()
        );
    }

    #[test]
    fn test_ensure_usable_names_archived_side() {
        let status = ArchiveStatus { resource_archived: true, unit_archived: false };
        let err = ensure_usable(status, ResourceId::new(3), UnitId::new(9)).unwrap_err();
        assert!(err.to_string().contains("resource 3"));

        let status = ArchiveStatus { resource_archived: false, unit_archived: true };
        let err = ensure_usable(status, ResourceId::new(3), UnitId::new(9)).unwrap_err();
        assert!(err.to_string().contains("unit 9"));
    }

    #[test]
    fn test_unchanged_pair_is_grandfathered() {
        let pair = (ResourceId::new(1), UnitId::new(2));
        assert!(!needs_check(pair, Some(pair)));
        // brand-new line
        assert!(needs_check(pair, None));
        // resource changed
        assert!(needs_check(pair, Some((ResourceId::new(7), UnitId::new(2)))));
        // unit changed
        assert!(needs_check(pair, Some((ResourceId::new(1), UnitId::new(7)))));
    }

    #[test]
    fn test_archived_client_rejected() {
        assert!(ensure_client_usable(ClientId::new(1), false).is_ok());
        let err = ensure_client_usable(ClientId::new(1), true).unwrap_err();
        assert!(matches!(err, EngineError::ArchivedReference(_)));
    }
}
