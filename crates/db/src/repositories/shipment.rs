//! Shipment engine repository.
//!
//! Shipments are created in Draft and never touch the ledger until signed.
//! Signing runs a two-phase pass inside one transaction: every line's balance
//! row is locked and checked for sufficiency before the first debit, so a
//! failing line leaves the ledger untouched and the document Draft. Revoking
//! credits everything back and returns the document to Draft.

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::info;
use warehouse_core::document::{self, ExistingLine, LineInput};
use warehouse_core::{ShipmentState, archive, shipment};
use warehouse_shared::error::{EngineError, EngineResult};
use warehouse_shared::types::{ClientId, ResourceId, ShipmentDocumentId, UnitId};

use crate::entities::{
    balances, clients, sea_orm_active_enums, shipment_documents, shipment_resources,
};
use crate::repositories::{archive_status, balance, conflict_on_unique, db_err};

/// Input for creating or updating a shipment document.
#[derive(Debug, Clone)]
pub struct ShipmentDocumentInput {
    /// Document number, unique among shipment documents.
    pub number: String,
    /// Receiving client.
    pub client: ClientId,
    /// Document date.
    pub date: NaiveDate,
    /// Line items. At least one is required.
    pub lines: Vec<LineInput>,
}

/// Shipment document with its line items.
#[derive(Debug, Clone)]
pub struct ShipmentDocumentWithLines {
    /// Document header.
    pub document: shipment_documents::Model,
    /// Line items.
    pub lines: Vec<shipment_resources::Model>,
}

/// Shipment repository: the outbound-document engine and its sign/revoke
/// state machine.
#[derive(Debug, Clone)]
pub struct ShipmentRepository {
    db: DatabaseConnection,
}

impl ShipmentRepository {
    /// Creates a new shipment repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a shipment document in Draft state. The ledger is untouched.
    ///
    /// # Errors
    ///
    /// - `Validation` on a bad number, an empty line set, a non-positive
    ///   quantity, or a duplicate (resource, unit) pair
    /// - `Conflict` on a duplicate document number
    /// - `NotFound` when the client or a line's resource or unit is absent
    /// - `ArchivedReference` when the client or a line reference is archived
    pub async fn create(&self, input: ShipmentDocumentInput) -> EngineResult<ShipmentDocumentId> {
        document::validate_number(&input.number)?;
        shipment::validate_lines(&input.lines)?;

        let txn = self.db.begin().await.map_err(db_err)?;

        ensure_unique_number(&txn, &input.number, None).await?;
        ensure_client_usable(&txn, input.client).await?;

        for line in &input.lines {
            let status = archive_status(&txn, line.resource, line.unit).await?;
            archive::ensure_usable(status, line.resource, line.unit)?;
        }

        let document = shipment_documents::ActiveModel {
            number: Set(input.number.clone()),
            client_id: Set(input.client.into_inner()),
            date: Set(input.date),
            state: Set(sea_orm_active_enums::ShipmentState::Draft),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|err| {
            conflict_on_unique(
                err,
                &format!("shipment document number '{}' already exists", input.number),
            )
        })?;

        for line in &input.lines {
            insert_line(&txn, document.id, line).await?;
        }

        txn.commit().await.map_err(db_err)?;
        info!(document_id = document.id, number = %input.number, "shipment created");

        Ok(ShipmentDocumentId::new(document.id))
    }

    /// Updates a Draft shipment document, replacing its line set by
    /// id-matching. No ledger interaction: the document has not been signed.
    /// Existing lines that keep their (resource, unit) pair are not re-checked
    /// against the archive.
    ///
    /// # Errors
    ///
    /// As for [`Self::create`], plus `NotFound` when the document is absent
    /// and `InvalidState` when it is signed.
    pub async fn update(
        &self,
        id: ShipmentDocumentId,
        input: ShipmentDocumentInput,
    ) -> EngineResult<()> {
        document::validate_number(&input.number)?;
        shipment::validate_lines(&input.lines)?;

        let txn = self.db.begin().await.map_err(db_err)?;

        let stored = find_document(&txn, id).await?;
        state_of(&stored).ensure_editable()?;

        ensure_unique_number(&txn, &input.number, Some(stored.id)).await?;
        ensure_client_usable(&txn, input.client).await?;

        let stored_lines = lines_of(&txn, stored.id).await?;
        let existing: Vec<ExistingLine> = stored_lines.iter().map(as_existing_line).collect();
        let plan = document::plan_replacement(&existing, &input.lines);

        let fresh = plan.pairs_needing_archive_check();
        for line in &input.lines {
            let status = archive_status(&txn, line.resource, line.unit).await?;
            if fresh.contains(&line.pair()) {
                archive::ensure_usable(status, line.resource, line.unit)?;
            }
        }

        if !plan.removals.is_empty() {
            shipment_resources::Entity::delete_many()
                .filter(shipment_resources::Column::Id.is_in(plan.removals.clone()))
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }
        for update in &plan.updates {
            let mut active: shipment_resources::ActiveModel = stored_lines
                .iter()
                .find(|stored_line| stored_line.id == update.id)
                .cloned()
                .ok_or_else(|| {
                    EngineError::Internal(format!("planned line {} disappeared", update.id))
                })?
                .into();
            active.resource_id = Set(update.resource.into_inner());
            active.unit_of_measurement_id = Set(update.unit.into_inner());
            active.quantity = Set(update.quantity);
            active.update(&txn).await.map_err(db_err)?;
        }
        for line in &plan.inserts {
            insert_line(&txn, stored.id, line).await?;
        }

        let mut active: shipment_documents::ActiveModel = stored.into();
        active.number = Set(input.number.clone());
        active.client_id = Set(input.client.into_inner());
        active.date = Set(input.date);
        active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(document_id = id.into_inner(), number = %input.number, "shipment updated");

        Ok(())
    }

    /// Deletes a Draft shipment document. No ledger interaction.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the document is absent, `InvalidState` when it
    /// is signed.
    pub async fn delete(&self, id: ShipmentDocumentId) -> EngineResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let stored = find_document(&txn, id).await?;
        state_of(&stored).ensure_editable()?;

        // Cascade removes the lines.
        shipment_documents::Entity::delete_by_id(stored.id)
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(document_id = id.into_inner(), "shipment deleted");

        Ok(())
    }

    /// Signs a Draft document: debits the ledger for every line and sets the
    /// state to Signed.
    ///
    /// Two-phase within one transaction: every line's balance row is locked
    /// and checked first; only when all lines are covered does the debit pass
    /// run. A failing line aborts with `InsufficientStock`, leaving the
    /// ledger untouched and the document Draft.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the document is absent, `InvalidState` when it
    /// is already signed, `Validation` when it has no lines,
    /// `InsufficientStock` when any line lacks coverage.
    pub async fn sign(&self, id: ShipmentDocumentId) -> EngineResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let stored = find_document(&txn, id).await?;
        state_of(&stored).ensure_can_sign()?;

        let stored_lines = lines_of(&txn, stored.id).await?;
        let lines: Vec<LineInput> = stored_lines
            .iter()
            .map(|line| {
                LineInput::new(
                    ResourceId::new(line.resource_id),
                    UnitId::new(line.unit_of_measurement_id),
                    line.quantity,
                )
            })
            .collect();
        shipment::validate_lines(&lines)?;

        // Locks are taken in (resource, unit) order, matching every other
        // ledger writer.
        let mut sorted: Vec<&LineInput> = lines.iter().collect();
        sorted.sort_by_key(|line| line.pair());

        // Pre-check pass: lock every row and verify coverage, no mutation.
        for line in &sorted {
            let row = balances::Entity::find()
                .filter(balances::Column::ResourceId.eq(line.resource.into_inner()))
                .filter(balances::Column::UnitOfMeasurementId.eq(line.unit.into_inner()))
                .lock_exclusive()
                .one(&txn)
                .await
                .map_err(db_err)?;

            let available = row.map(|b| b.quantity).unwrap_or_default();
            if available < line.quantity {
                return Err(EngineError::InsufficientStock(format!(
                    "balance for resource {} / unit {} is {available}, line requires {}",
                    line.resource, line.unit, line.quantity
                )));
            }
        }

        // Debit pass: safe after the pre-check, rows stay locked until commit.
        for line in &sorted {
            balance::apply_delta(&txn, line.resource, line.unit, -line.quantity).await?;
        }

        let mut active: shipment_documents::ActiveModel = stored.into();
        active.state = Set(sea_orm_active_enums::ShipmentState::Signed);
        active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(document_id = id.into_inner(), "shipment signed");

        Ok(())
    }

    /// Revokes a Signed document: credits every line back and returns the
    /// state to Draft. Credits only increase balances, so the ledger
    /// invariant cannot fail here.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the document is absent, `InvalidState` when it
    /// is not signed.
    pub async fn revoke(&self, id: ShipmentDocumentId) -> EngineResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let stored = find_document(&txn, id).await?;
        state_of(&stored).ensure_can_revoke()?;

        let stored_lines = lines_of(&txn, stored.id).await?;
        let mut sorted: Vec<&shipment_resources::Model> = stored_lines.iter().collect();
        sorted.sort_by_key(|line| (line.resource_id, line.unit_of_measurement_id));

        for line in sorted {
            balance::apply_delta(
                &txn,
                ResourceId::new(line.resource_id),
                UnitId::new(line.unit_of_measurement_id),
                line.quantity,
            )
            .await?;
        }

        let mut active: shipment_documents::ActiveModel = stored.into();
        active.state = Set(sea_orm_active_enums::ShipmentState::Draft);
        active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(document_id = id.into_inner(), "shipment revoked");

        Ok(())
    }

    /// Removes the first line matching `resource` from a Draft document. A
    /// document left without lines is deleted entirely. No ledger
    /// interaction: drafts never touched the ledger.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the document or line is absent, `InvalidState`
    /// when the document is signed.
    pub async fn delete_line(
        &self,
        id: ShipmentDocumentId,
        resource: ResourceId,
    ) -> EngineResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let stored = find_document(&txn, id).await?;
        state_of(&stored).ensure_editable()?;

        let stored_lines = lines_of(&txn, stored.id).await?;
        let line = stored_lines
            .iter()
            .find(|line| line.resource_id == resource.into_inner())
            .ok_or_else(|| {
                EngineError::NotFound(format!("no line for resource {resource} in document {id}"))
            })?;

        shipment_resources::Entity::delete_by_id(line.id)
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if stored_lines.len() == 1 {
            shipment_documents::Entity::delete_by_id(stored.id)
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;
        info!(
            document_id = id.into_inner(),
            resource_id = resource.into_inner(),
            "shipment line deleted"
        );

        Ok(())
    }

    /// Gets a shipment document with its lines.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the document is absent.
    pub async fn get(&self, id: ShipmentDocumentId) -> EngineResult<ShipmentDocumentWithLines> {
        let document = shipment_documents::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| EngineError::NotFound(format!("shipment document {id}")))?;

        let lines = shipment_resources::Entity::find()
            .filter(shipment_resources::Column::ShipmentDocumentId.eq(document.id))
            .order_by_asc(shipment_resources::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(ShipmentDocumentWithLines { document, lines })
    }

    /// Lists every shipment document with its lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> EngineResult<Vec<ShipmentDocumentWithLines>> {
        let rows = shipment_documents::Entity::find()
            .find_with_related(shipment_resources::Entity)
            .order_by_asc(shipment_documents::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|(document, lines)| ShipmentDocumentWithLines { document, lines })
            .collect())
    }
}

fn state_of(document: &shipment_documents::Model) -> ShipmentState {
    document.state.clone().into()
}

/// Loads a shipment document locked for the duration of the transaction, so
/// concurrent sign/revoke/edit operations on the same document serialize.
async fn find_document(
    txn: &DatabaseTransaction,
    id: ShipmentDocumentId,
) -> EngineResult<shipment_documents::Model> {
    shipment_documents::Entity::find_by_id(id.into_inner())
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| EngineError::NotFound(format!("shipment document {id}")))
}

async fn lines_of(
    txn: &DatabaseTransaction,
    document_id: i32,
) -> EngineResult<Vec<shipment_resources::Model>> {
    shipment_resources::Entity::find()
        .filter(shipment_resources::Column::ShipmentDocumentId.eq(document_id))
        .order_by_asc(shipment_resources::Column::Id)
        .all(txn)
        .await
        .map_err(db_err)
}

async fn ensure_unique_number(
    txn: &DatabaseTransaction,
    number: &str,
    exclude_id: Option<i32>,
) -> EngineResult<()> {
    let mut query =
        shipment_documents::Entity::find().filter(shipment_documents::Column::Number.eq(number));
    if let Some(id) = exclude_id {
        query = query.filter(shipment_documents::Column::Id.ne(id));
    }
    if query.one(txn).await.map_err(db_err)?.is_some() {
        return Err(EngineError::Conflict(format!(
            "shipment document number '{number}' already exists"
        )));
    }
    Ok(())
}

async fn ensure_client_usable(txn: &DatabaseTransaction, client: ClientId) -> EngineResult<()> {
    let row = clients::Entity::find_by_id(client.into_inner())
        .one(txn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| EngineError::NotFound(format!("client {client}")))?;
    archive::ensure_client_usable(client, row.is_archived)
}

async fn insert_line(
    txn: &DatabaseTransaction,
    document_id: i32,
    line: &LineInput,
) -> EngineResult<()> {
    shipment_resources::ActiveModel {
        shipment_document_id: Set(document_id),
        resource_id: Set(line.resource.into_inner()),
        unit_of_measurement_id: Set(line.unit.into_inner()),
        quantity: Set(line.quantity),
        ..Default::default()
    }
    .insert(txn)
    .await
    .map_err(db_err)?;
    Ok(())
}

fn as_existing_line(line: &shipment_resources::Model) -> ExistingLine {
    ExistingLine {
        id: line.id,
        resource: ResourceId::new(line.resource_id),
        unit: UnitId::new(line.unit_of_measurement_id),
        quantity: line.quantity,
    }
}
