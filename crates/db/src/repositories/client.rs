//! Client repository for reference-data operations.
//!
//! Clients are referenced only by shipment documents; deletion is rejected
//! while any shipment document points at the client. Archiving is an
//! unconditional idempotent flag flip.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::info;
use warehouse_shared::error::{EngineError, EngineResult};
use warehouse_shared::types::ClientId;

use crate::entities::{clients, shipment_documents};
use crate::repositories::{conflict_on_unique, db_err};

/// Input for creating or updating a client.
#[derive(Debug, Clone)]
pub struct ClientInput {
    /// Client name, unique.
    pub name: String,
    /// Postal address.
    pub address: String,
}

/// Client repository for CRUD and archival operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    db: DatabaseConnection,
}

impl ClientRepository {
    /// Creates a new client repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns `Validation` on an empty name, `Conflict` on a duplicate name.
    pub async fn create(&self, input: ClientInput) -> EngineResult<ClientId> {
        validate_name(&input.name)?;
        self.ensure_unique_name(&input.name, None).await?;

        let row = clients::ActiveModel {
            name: Set(input.name.clone()),
            address: Set(input.address),
            is_archived: Set(false),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|err| {
            conflict_on_unique(err, &format!("client named '{}' already exists", input.name))
        })?;

        info!(client_id = row.id, name = %input.name, "client created");
        Ok(ClientId::new(row.id))
    }

    /// Updates a client's name and address.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when absent, `Validation` on an empty name,
    /// `Conflict` on a duplicate name.
    pub async fn update(&self, id: ClientId, input: ClientInput) -> EngineResult<()> {
        validate_name(&input.name)?;
        let row = self.find(id).await?;
        self.ensure_unique_name(&input.name, Some(row.id)).await?;

        let mut active: clients::ActiveModel = row.into();
        active.name = Set(input.name);
        active.address = Set(input.address);
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    /// Archives a client. Always succeeds regardless of usage; idempotent.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when absent.
    pub async fn archive(&self, id: ClientId) -> EngineResult<()> {
        self.set_archived(id, true).await
    }

    /// Unarchives a client. Idempotent, like [`Self::archive`].
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when absent.
    pub async fn unarchive(&self, id: ClientId) -> EngineResult<()> {
        self.set_archived(id, false).await
    }

    /// Deletes a client.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when absent, `InUse` while any shipment document
    /// references it.
    pub async fn delete(&self, id: ClientId) -> EngineResult<()> {
        let row = self.find(id).await?;

        let in_shipments = shipment_documents::Entity::find()
            .filter(shipment_documents::Column::ClientId.eq(row.id))
            .count(&self.db)
            .await
            .map_err(db_err)?;

        if in_shipments > 0 {
            return Err(EngineError::InUse(format!(
                "client {id} is referenced by shipment documents"
            )));
        }

        clients::Entity::delete_by_id(row.id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        info!(client_id = id.into_inner(), "client deleted");
        Ok(())
    }

    /// Gets a client by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when absent.
    pub async fn get(&self, id: ClientId) -> EngineResult<clients::Model> {
        self.find(id).await
    }

    /// Lists every client.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> EngineResult<Vec<clients::Model>> {
        clients::Entity::find()
            .order_by_asc(clients::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    async fn find(&self, id: ClientId) -> EngineResult<clients::Model> {
        clients::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| EngineError::NotFound(format!("client {id}")))
    }

    async fn set_archived(&self, id: ClientId, archived: bool) -> EngineResult<()> {
        let row = self.find(id).await?;
        if row.is_archived == archived {
            return Ok(());
        }
        let client_id = row.id;
        let mut active: clients::ActiveModel = row.into();
        active.is_archived = Set(archived);
        active.update(&self.db).await.map_err(db_err)?;
        info!(client_id, archived, "client archival changed");
        Ok(())
    }

    async fn ensure_unique_name(&self, name: &str, exclude_id: Option<i32>) -> EngineResult<()> {
        let mut query = clients::Entity::find().filter(clients::Column::Name.eq(name));
        if let Some(id) = exclude_id {
            query = query.filter(clients::Column::Id.ne(id));
        }
        if query.one(&self.db).await.map_err(db_err)?.is_some() {
            return Err(EngineError::Conflict(format!(
                "client named '{name}' already exists"
            )));
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> EngineResult<()> {
    if name.trim().is_empty() {
        return Err(EngineError::Validation(
            "client name must not be empty".to_string(),
        ));
    }
    Ok(())
}
