//! Repository abstractions for data access.
//!
//! Each repository is the transactional engine for one aggregate. Rule checks
//! live in `warehouse-core`; this layer loads the rows, runs the checks, and
//! commits or rolls back in one database transaction per operation.

pub mod balance;
pub mod client;
pub mod receipt;
pub mod resource;
pub mod shipment;
pub mod unit;

pub use balance::BalanceRepository;
pub use client::ClientRepository;
pub use receipt::ReceiptRepository;
pub use resource::ResourceRepository;
pub use shipment::ShipmentRepository;
pub use unit::UnitRepository;

use sea_orm::{DatabaseTransaction, DbErr, EntityTrait, SqlErr};
use warehouse_core::ArchiveStatus;
use warehouse_shared::error::{EngineError, EngineResult};
use warehouse_shared::types::{ResourceId, UnitId};

use crate::entities::{resources, units_of_measurement};

/// Maps an unrecognized storage failure into the engine taxonomy.
pub(crate) fn db_err(err: DbErr) -> EngineError {
    EngineError::Database(err.to_string())
}

/// Maps a unique-index violation to `Conflict`, anything else to `Database`.
///
/// Uniqueness is checked inside the transaction before inserting, but a
/// concurrent writer can still win the race; the index is the backstop.
pub(crate) fn conflict_on_unique(err: DbErr, message: &str) -> EngineError {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        EngineError::Conflict(message.to_string())
    } else {
        db_err(err)
    }
}

/// Loads the archival flags for a (resource, unit) pair.
///
/// A missing resource or unit is a `NotFound`: line items carry foreign keys,
/// so the referenced rows must exist before a line can be created.
pub(crate) async fn archive_status(
    txn: &DatabaseTransaction,
    resource: ResourceId,
    unit: UnitId,
) -> EngineResult<ArchiveStatus> {
    let resource_row = resources::Entity::find_by_id(resource.into_inner())
        .one(txn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| EngineError::NotFound(format!("resource {resource}")))?;

    let unit_row = units_of_measurement::Entity::find_by_id(unit.into_inner())
        .one(txn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| EngineError::NotFound(format!("unit {unit}")))?;

    Ok(ArchiveStatus {
        resource_archived: resource_row.is_archived,
        unit_archived: unit_row.is_archived,
    })
}
