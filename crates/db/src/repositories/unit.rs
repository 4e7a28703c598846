//! Unit-of-measurement repository for reference-data operations.
//!
//! Same archival and deletion semantics as resources: archiving is an
//! unconditional idempotent flag flip, deletion is rejected while referenced.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::info;
use warehouse_shared::error::{EngineError, EngineResult};
use warehouse_shared::types::UnitId;

use crate::entities::{balances, receipt_resources, shipment_resources, units_of_measurement};
use crate::repositories::{conflict_on_unique, db_err};

/// Unit repository for CRUD and archival operations.
#[derive(Debug, Clone)]
pub struct UnitRepository {
    db: DatabaseConnection,
}

impl UnitRepository {
    /// Creates a new unit repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a unit of measurement.
    ///
    /// # Errors
    ///
    /// Returns `Validation` on an empty name, `Conflict` on a duplicate name.
    pub async fn create(&self, name: &str) -> EngineResult<UnitId> {
        validate_name(name)?;
        self.ensure_unique_name(name, None).await?;

        let row = units_of_measurement::ActiveModel {
            name: Set(name.to_string()),
            is_archived: Set(false),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|err| conflict_on_unique(err, &format!("unit named '{name}' already exists")))?;

        info!(unit_id = row.id, name, "unit created");
        Ok(UnitId::new(row.id))
    }

    /// Renames a unit of measurement.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when absent, `Validation` on an empty name,
    /// `Conflict` on a duplicate name.
    pub async fn update(&self, id: UnitId, name: &str) -> EngineResult<()> {
        validate_name(name)?;
        let row = self.find(id).await?;
        self.ensure_unique_name(name, Some(row.id)).await?;

        let mut active: units_of_measurement::ActiveModel = row.into();
        active.name = Set(name.to_string());
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    /// Archives a unit. Always succeeds regardless of usage; idempotent.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when absent.
    pub async fn archive(&self, id: UnitId) -> EngineResult<()> {
        self.set_archived(id, true).await
    }

    /// Unarchives a unit. Idempotent, like [`Self::archive`].
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when absent.
    pub async fn unarchive(&self, id: UnitId) -> EngineResult<()> {
        self.set_archived(id, false).await
    }

    /// Deletes a unit of measurement.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when absent, `InUse` while any balance row, receipt
    /// line, or shipment line references it.
    pub async fn delete(&self, id: UnitId) -> EngineResult<()> {
        let row = self.find(id).await?;

        let in_balances = balances::Entity::find()
            .filter(balances::Column::UnitOfMeasurementId.eq(row.id))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        let in_receipts = receipt_resources::Entity::find()
            .filter(receipt_resources::Column::UnitOfMeasurementId.eq(row.id))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        let in_shipments = shipment_resources::Entity::find()
            .filter(shipment_resources::Column::UnitOfMeasurementId.eq(row.id))
            .count(&self.db)
            .await
            .map_err(db_err)?;

        if in_balances + in_receipts + in_shipments > 0 {
            return Err(EngineError::InUse(format!(
                "unit {id} is referenced by balances or document lines"
            )));
        }

        units_of_measurement::Entity::delete_by_id(row.id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        info!(unit_id = id.into_inner(), "unit deleted");
        Ok(())
    }

    /// Gets a unit by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when absent.
    pub async fn get(&self, id: UnitId) -> EngineResult<units_of_measurement::Model> {
        self.find(id).await
    }

    /// Lists every unit of measurement.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> EngineResult<Vec<units_of_measurement::Model>> {
        units_of_measurement::Entity::find()
            .order_by_asc(units_of_measurement::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    async fn find(&self, id: UnitId) -> EngineResult<units_of_measurement::Model> {
        units_of_measurement::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| EngineError::NotFound(format!("unit {id}")))
    }

    async fn set_archived(&self, id: UnitId, archived: bool) -> EngineResult<()> {
        let row = self.find(id).await?;
        if row.is_archived == archived {
            return Ok(());
        }
        let unit_id = row.id;
        let mut active: units_of_measurement::ActiveModel = row.into();
        active.is_archived = Set(archived);
        active.update(&self.db).await.map_err(db_err)?;
        info!(unit_id, archived, "unit archival changed");
        Ok(())
    }

    async fn ensure_unique_name(&self, name: &str, exclude_id: Option<i32>) -> EngineResult<()> {
        let mut query = units_of_measurement::Entity::find()
            .filter(units_of_measurement::Column::Name.eq(name));
        if let Some(id) = exclude_id {
            query = query.filter(units_of_measurement::Column::Id.ne(id));
        }
        if query.one(&self.db).await.map_err(db_err)?.is_some() {
            return Err(EngineError::Conflict(format!(
                "unit named '{name}' already exists"
            )));
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> EngineResult<()> {
    if name.trim().is_empty() {
        return Err(EngineError::Validation(
            "unit name must not be empty".to_string(),
        ));
    }
    Ok(())
}
