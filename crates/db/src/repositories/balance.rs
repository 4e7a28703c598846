//! Balance ledger repository.
//!
//! The ledger is the sole source of truth for on-hand quantities. All writes
//! go through [`apply_delta`], which locks the balance row for the duration of
//! the enclosing transaction so concurrent operations on the same
//! (resource, unit) pair serialize instead of losing updates.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IsolationLevel, QueryFilter, QuerySelect, Set, SqlErr, TransactionTrait,
};
use warehouse_core::ledger::{self, BalanceKey};
use warehouse_shared::error::{EngineError, EngineResult};
use warehouse_shared::types::{ResourceId, UnitId};

use crate::entities::{
    balances, receipt_resources, sea_orm_active_enums::ShipmentState, shipment_documents,
    shipment_resources,
};
use crate::repositories::db_err;

/// Applies a delta to one balance row inside the given transaction.
///
/// The only writer of `balances.quantity`. The row is read with
/// `SELECT ... FOR UPDATE`; a missing row is created lazily for a
/// non-negative delta.
///
/// # Errors
///
/// - `InsufficientStock` when the delta would drive the quantity negative;
///   nothing is mutated.
/// - `Conflict` when a concurrent transaction created the row first (unique
///   index on the pair); the caller may resubmit.
pub(crate) async fn apply_delta(
    txn: &DatabaseTransaction,
    resource: ResourceId,
    unit: UnitId,
    delta: Decimal,
) -> EngineResult<()> {
    let key = BalanceKey::new(resource, unit);

    let row = balances::Entity::find()
        .filter(balances::Column::ResourceId.eq(resource.into_inner()))
        .filter(balances::Column::UnitOfMeasurementId.eq(unit.into_inner()))
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(db_err)?;

    match row {
        None => {
            let quantity = ledger::apply_delta(key, None, delta)?;
            let insert = balances::ActiveModel {
                resource_id: Set(resource.into_inner()),
                unit_of_measurement_id: Set(unit.into_inner()),
                quantity: Set(quantity),
                ..Default::default()
            };
            insert.insert(txn).await.map_err(|err| {
                if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                    EngineError::Conflict(format!("concurrent balance update for {key}, retry"))
                } else {
                    db_err(err)
                }
            })?;
        }
        Some(row) => {
            let quantity = ledger::apply_delta(key, Some(row.quantity), delta)?;
            let mut active: balances::ActiveModel = row.into();
            active.quantity = Set(quantity);
            active.update(txn).await.map_err(db_err)?;
        }
    }

    Ok(())
}

/// Balance repository for ledger reads and audits.
#[derive(Debug, Clone)]
pub struct BalanceRepository {
    db: DatabaseConnection,
}

impl BalanceRepository {
    /// Creates a new balance repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the balance row for a (resource, unit) pair, if any.
    ///
    /// An absent row means a zero on-hand quantity.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(
        &self,
        resource: ResourceId,
        unit: UnitId,
    ) -> EngineResult<Option<balances::Model>> {
        balances::Entity::find()
            .filter(balances::Column::ResourceId.eq(resource.into_inner()))
            .filter(balances::Column::UnitOfMeasurementId.eq(unit.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_err)
    }

    /// Lists every balance row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> EngineResult<Vec<balances::Model>> {
        balances::Entity::find().all(&self.db).await.map_err(db_err)
    }

    /// Audits the ledger: replays every receipt line and every signed
    /// shipment line from empty state and compares the result against the
    /// stored rows.
    ///
    /// # Errors
    ///
    /// Returns `Internal` when the stored ledger disagrees with the replay,
    /// naming the first mismatching pair.
    pub async fn verify_ledger(&self) -> EngineResult<()> {
        // Repeatable read: all three reads must come from one snapshot.
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::RepeatableRead), None)
            .await
            .map_err(db_err)?;

        let receipt_lines = receipt_resources::Entity::find()
            .all(&txn)
            .await
            .map_err(db_err)?;
        let signed_shipment_lines = shipment_resources::Entity::find()
            .inner_join(shipment_documents::Entity)
            .filter(shipment_documents::Column::State.eq(ShipmentState::Signed))
            .all(&txn)
            .await
            .map_err(db_err)?;
        let stored = balances::Entity::find().all(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        // Credits first so the replay never transiently dips negative.
        let deltas = receipt_lines
            .iter()
            .map(|line| {
                (
                    BalanceKey::new(
                        ResourceId::new(line.resource_id),
                        UnitId::new(line.unit_of_measurement_id),
                    ),
                    line.quantity,
                )
            })
            .chain(signed_shipment_lines.iter().map(|line| {
                (
                    BalanceKey::new(
                        ResourceId::new(line.resource_id),
                        UnitId::new(line.unit_of_measurement_id),
                    ),
                    -line.quantity,
                )
            }));
        let replayed = ledger::replay(deltas)
            .map_err(|err| EngineError::Internal(format!("ledger replay failed: {err}")))?;

        let stored_map: HashMap<BalanceKey, Decimal> = stored
            .iter()
            .map(|row| {
                (
                    BalanceKey::new(
                        ResourceId::new(row.resource_id),
                        UnitId::new(row.unit_of_measurement_id),
                    ),
                    row.quantity,
                )
            })
            .collect();

        for (key, quantity) in &replayed {
            let recorded = stored_map.get(key).copied().unwrap_or(Decimal::ZERO);
            if recorded != *quantity {
                return Err(EngineError::Internal(format!(
                    "ledger mismatch for {key}: stored {recorded}, replayed {quantity}"
                )));
            }
        }
        for (key, quantity) in &stored_map {
            if *quantity != Decimal::ZERO && !replayed.contains_key(key) {
                return Err(EngineError::Internal(format!(
                    "ledger mismatch for {key}: stored {quantity}, replayed 0"
                )));
            }
        }

        Ok(())
    }
}
