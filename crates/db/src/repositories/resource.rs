//! Resource repository for reference-data operations.
//!
//! Archiving never checks usage (it only flips a flag and is idempotent);
//! deletion is rejected while any balance row or document line still
//! references the resource.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::info;
use warehouse_shared::error::{EngineError, EngineResult};
use warehouse_shared::types::ResourceId;

use crate::entities::{balances, receipt_resources, resources, shipment_resources};
use crate::repositories::{conflict_on_unique, db_err};

/// Resource repository for CRUD and archival operations.
#[derive(Debug, Clone)]
pub struct ResourceRepository {
    db: DatabaseConnection,
}

impl ResourceRepository {
    /// Creates a new resource repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a resource.
    ///
    /// # Errors
    ///
    /// Returns `Validation` on an empty name, `Conflict` on a duplicate name.
    pub async fn create(&self, name: &str) -> EngineResult<ResourceId> {
        validate_name(name)?;
        self.ensure_unique_name(name, None).await?;

        let row = resources::ActiveModel {
            name: Set(name.to_string()),
            is_archived: Set(false),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|err| conflict_on_unique(err, &format!("resource named '{name}' already exists")))?;

        info!(resource_id = row.id, name, "resource created");
        Ok(ResourceId::new(row.id))
    }

    /// Renames a resource.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when absent, `Validation` on an empty name,
    /// `Conflict` on a duplicate name.
    pub async fn update(&self, id: ResourceId, name: &str) -> EngineResult<()> {
        validate_name(name)?;
        let row = self.find(id).await?;
        self.ensure_unique_name(name, Some(row.id)).await?;

        let mut active: resources::ActiveModel = row.into();
        active.name = Set(name.to_string());
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    /// Archives a resource. Always succeeds regardless of usage; archiving an
    /// already-archived resource is a no-op success.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when absent.
    pub async fn archive(&self, id: ResourceId) -> EngineResult<()> {
        self.set_archived(id, true).await
    }

    /// Unarchives a resource. Idempotent, like [`Self::archive`].
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when absent.
    pub async fn unarchive(&self, id: ResourceId) -> EngineResult<()> {
        self.set_archived(id, false).await
    }

    /// Deletes a resource.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when absent, `InUse` while any balance row, receipt
    /// line, or shipment line references it.
    pub async fn delete(&self, id: ResourceId) -> EngineResult<()> {
        let row = self.find(id).await?;

        let in_balances = balances::Entity::find()
            .filter(balances::Column::ResourceId.eq(row.id))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        let in_receipts = receipt_resources::Entity::find()
            .filter(receipt_resources::Column::ResourceId.eq(row.id))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        let in_shipments = shipment_resources::Entity::find()
            .filter(shipment_resources::Column::ResourceId.eq(row.id))
            .count(&self.db)
            .await
            .map_err(db_err)?;

        if in_balances + in_receipts + in_shipments > 0 {
            return Err(EngineError::InUse(format!(
                "resource {id} is referenced by balances or document lines"
            )));
        }

        resources::Entity::delete_by_id(row.id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        info!(resource_id = id.into_inner(), "resource deleted");
        Ok(())
    }

    /// Gets a resource by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when absent.
    pub async fn get(&self, id: ResourceId) -> EngineResult<resources::Model> {
        self.find(id).await
    }

    /// Lists every resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> EngineResult<Vec<resources::Model>> {
        resources::Entity::find()
            .order_by_asc(resources::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    async fn find(&self, id: ResourceId) -> EngineResult<resources::Model> {
        resources::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| EngineError::NotFound(format!("resource {id}")))
    }

    async fn set_archived(&self, id: ResourceId, archived: bool) -> EngineResult<()> {
        let row = self.find(id).await?;
        if row.is_archived == archived {
            return Ok(());
        }
        let resource_id = row.id;
        let mut active: resources::ActiveModel = row.into();
        active.is_archived = Set(archived);
        active.update(&self.db).await.map_err(db_err)?;
        info!(resource_id, archived, "resource archival changed");
        Ok(())
    }

    async fn ensure_unique_name(&self, name: &str, exclude_id: Option<i32>) -> EngineResult<()> {
        let mut query = resources::Entity::find().filter(resources::Column::Name.eq(name));
        if let Some(id) = exclude_id {
            query = query.filter(resources::Column::Id.ne(id));
        }
        if query.one(&self.db).await.map_err(db_err)?.is_some() {
            return Err(EngineError::Conflict(format!(
                "resource named '{name}' already exists"
            )));
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> EngineResult<()> {
    if name.trim().is_empty() {
        return Err(EngineError::Validation(
            "resource name must not be empty".to_string(),
        ));
    }
    Ok(())
}
