//! Receipt engine repository.
//!
//! Receipts have no draft state: every line posts to the ledger in the same
//! transaction that persists it, and every edit first rolls the old lines
//! back. A rollback that would drive a balance negative (the stock has
//! already been shipped) aborts the whole operation.

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::info;
use warehouse_core::document::{self, ExistingLine, LineInput};
use warehouse_core::{archive, receipt};
use warehouse_shared::error::{EngineError, EngineResult};
use warehouse_shared::types::{ReceiptDocumentId, ResourceId, UnitId};

use crate::entities::{receipt_documents, receipt_resources};
use crate::repositories::{archive_status, balance, conflict_on_unique, db_err};

/// Input for creating or updating a receipt document.
#[derive(Debug, Clone)]
pub struct ReceiptDocumentInput {
    /// Document number, unique among receipt documents.
    pub number: String,
    /// Document date.
    pub date: NaiveDate,
    /// Line items. May be empty.
    pub lines: Vec<LineInput>,
}

/// Receipt document with its line items.
#[derive(Debug, Clone)]
pub struct ReceiptDocumentWithLines {
    /// Document header.
    pub document: receipt_documents::Model,
    /// Line items.
    pub lines: Vec<receipt_resources::Model>,
}

/// Receipt repository: the inbound-document engine.
#[derive(Debug, Clone)]
pub struct ReceiptRepository {
    db: DatabaseConnection,
}

impl ReceiptRepository {
    /// Creates a new receipt repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a receipt document and credits the ledger for every line.
    ///
    /// # Errors
    ///
    /// - `Validation` on a bad number or non-positive line quantity
    /// - `Conflict` on a duplicate document number
    /// - `NotFound` when a line references a missing resource or unit
    /// - `ArchivedReference` when a line references an archived resource or unit
    pub async fn create(&self, input: ReceiptDocumentInput) -> EngineResult<ReceiptDocumentId> {
        document::validate_number(&input.number)?;
        receipt::validate_lines(&input.lines)?;

        let txn = self.db.begin().await.map_err(db_err)?;

        ensure_unique_number(&txn, &input.number, None).await?;

        for line in &input.lines {
            let status = archive_status(&txn, line.resource, line.unit).await?;
            archive::ensure_usable(status, line.resource, line.unit)?;
        }

        let document = receipt_documents::ActiveModel {
            number: Set(input.number.clone()),
            date: Set(input.date),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|err| {
            conflict_on_unique(
                err,
                &format!("receipt document number '{}' already exists", input.number),
            )
        })?;

        for line in sorted_by_pair(&input.lines) {
            balance::apply_delta(&txn, line.resource, line.unit, line.quantity).await?;
            insert_line(&txn, document.id, line).await?;
        }

        txn.commit().await.map_err(db_err)?;
        info!(document_id = document.id, number = %input.number, "receipt created");

        Ok(ReceiptDocumentId::new(document.id))
    }

    /// Updates a receipt document, replacing its line set.
    ///
    /// The old lines' ledger effect is rolled back before the new lines are
    /// applied; if any rollback is infeasible the whole update aborts with
    /// `InsufficientStock` and nothing changes. Lines are matched by id:
    /// matching ids are edited in place, others are appended, absent ones are
    /// removed. Existing lines that keep their (resource, unit) pair are not
    /// re-checked against the archive.
    ///
    /// # Errors
    ///
    /// As for [`Self::create`], plus `NotFound` when the document is absent
    /// and `InsufficientStock` when a rollback would drive a balance negative.
    pub async fn update(
        &self,
        id: ReceiptDocumentId,
        input: ReceiptDocumentInput,
    ) -> EngineResult<()> {
        document::validate_number(&input.number)?;
        receipt::validate_lines(&input.lines)?;

        let txn = self.db.begin().await.map_err(db_err)?;

        let stored = find_document(&txn, id).await?;
        ensure_unique_number(&txn, &input.number, Some(stored.id)).await?;

        let stored_lines = lines_of(&txn, stored.id).await?;
        let existing: Vec<ExistingLine> = stored_lines.iter().map(as_existing_line).collect();
        let plan = document::plan_replacement(&existing, &input.lines);

        // Existence is checked for every incoming line; the archive gate only
        // for fresh references (inserts and changed pairs).
        let fresh = plan.pairs_needing_archive_check();
        for line in &input.lines {
            let status = archive_status(&txn, line.resource, line.unit).await?;
            if fresh.contains(&line.pair()) {
                archive::ensure_usable(status, line.resource, line.unit)?;
            }
        }

        for line in sorted_existing(&existing) {
            balance::apply_delta(&txn, line.resource, line.unit, -line.quantity).await?;
        }
        for line in sorted_by_pair(&input.lines) {
            balance::apply_delta(&txn, line.resource, line.unit, line.quantity).await?;
        }

        if !plan.removals.is_empty() {
            receipt_resources::Entity::delete_many()
                .filter(receipt_resources::Column::Id.is_in(plan.removals.clone()))
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }
        for update in &plan.updates {
            let mut active: receipt_resources::ActiveModel = stored_lines
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

        let mut active: receipt_documents::ActiveModel = stored.into();
        active.number = Set(input.number.clone());
        active.date = Set(input.date);
        active.update(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(document_id = id.into_inner(), number = %input.number, "receipt updated");

        Ok(())
    }

    /// Deletes a receipt document, rolling back every line's ledger effect.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the document is absent, `InsufficientStock`
    /// when any rollback would drive a balance negative (the received stock
    /// was already shipped).
    pub async fn delete(&self, id: ReceiptDocumentId) -> EngineResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let stored = find_document(&txn, id).await?;
        let stored_lines = lines_of(&txn, stored.id).await?;
        let existing: Vec<ExistingLine> = stored_lines.iter().map(as_existing_line).collect();

        for line in sorted_existing(&existing) {
            balance::apply_delta(&txn, line.resource, line.unit, -line.quantity).await?;
        }

        // Cascade removes the lines.
        receipt_documents::Entity::delete_by_id(stored.id)
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        info!(document_id = id.into_inner(), "receipt deleted");

        Ok(())
    }

    /// Removes the first line matching `resource` from a document, rolling
    /// back its ledger contribution. A document left without lines is deleted
    /// entirely.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the document or line is absent,
    /// `InsufficientStock` when the rollback is infeasible.
    pub async fn delete_line(
        &self,
        id: ReceiptDocumentId,
        resource: ResourceId,
    ) -> EngineResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let stored = find_document(&txn, id).await?;
        let stored_lines = lines_of(&txn, stored.id).await?;
        let line = stored_lines
            .iter()
            .find(|line| line.resource_id == resource.into_inner())
            .ok_or_else(|| {
                EngineError::NotFound(format!("no line for resource {resource} in document {id}"))
            })?;

        balance::apply_delta(
            &txn,
            resource,
            UnitId::new(line.unit_of_measurement_id),
            -line.quantity,
        )
        .await?;

        receipt_resources::Entity::delete_by_id(line.id)
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if stored_lines.len() == 1 {
            receipt_documents::Entity::delete_by_id(stored.id)
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;
        info!(
            document_id = id.into_inner(),
            resource_id = resource.into_inner(),
            "receipt line deleted"
        );

        Ok(())
    }

    /// Gets a receipt document with its lines.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the document is absent.
    pub async fn get(&self, id: ReceiptDocumentId) -> EngineResult<ReceiptDocumentWithLines> {
        let document = receipt_documents::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| EngineError::NotFound(format!("receipt document {id}")))?;

        let lines = receipt_resources::Entity::find()
            .filter(receipt_resources::Column::ReceiptDocumentId.eq(document.id))
            .order_by_asc(receipt_resources::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(ReceiptDocumentWithLines { document, lines })
    }

    /// Lists every receipt document with its lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> EngineResult<Vec<ReceiptDocumentWithLines>> {
        let rows = receipt_documents::Entity::find()
            .find_with_related(receipt_resources::Entity)
            .order_by_asc(receipt_documents::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|(document, lines)| ReceiptDocumentWithLines { document, lines })
            .collect())
    }
}

/// Loads a receipt document locked for the duration of the transaction.
async fn find_document(
    txn: &DatabaseTransaction,
    id: ReceiptDocumentId,
) -> EngineResult<receipt_documents::Model> {
    receipt_documents::Entity::find_by_id(id.into_inner())
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| EngineError::NotFound(format!("receipt document {id}")))
}

async fn lines_of(
    txn: &DatabaseTransaction,
    document_id: i32,
) -> EngineResult<Vec<receipt_resources::Model>> {
    receipt_resources::Entity::find()
        .filter(receipt_resources::Column::ReceiptDocumentId.eq(document_id))
        .order_by_asc(receipt_resources::Column::Id)
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
        receipt_documents::Entity::find().filter(receipt_documents::Column::Number.eq(number));
    if let Some(id) = exclude_id {
        query = query.filter(receipt_documents::Column::Id.ne(id));
    }
    if query.one(txn).await.map_err(db_err)?.is_some() {
        return Err(EngineError::Conflict(format!(
            "receipt document number '{number}' already exists"
        )));
    }
    Ok(())
}

async fn insert_line(
    txn: &DatabaseTransaction,
    document_id: i32,
    line: &LineInput,
) -> EngineResult<()> {
    receipt_resources::ActiveModel {
        receipt_document_id: Set(document_id),
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

fn as_existing_line(line: &receipt_resources::Model) -> ExistingLine {
    ExistingLine {
        id: line.id,
        resource: ResourceId::new(line.resource_id),
        unit: UnitId::new(line.unit_of_measurement_id),
        quantity: line.quantity,
    }
}

/// Deltas are applied in (resource, unit) order so concurrent operations lock
/// balance rows in the same sequence.
fn sorted_by_pair(lines: &[LineInput]) -> Vec<&LineInput> {
    let mut sorted: Vec<&LineInput> = lines.iter().collect();
    sorted.sort_by_key(|line| line.pair());
    sorted
}

fn sorted_existing(lines: &[ExistingLine]) -> Vec<&ExistingLine> {
    let mut sorted: Vec<&ExistingLine> = lines.iter().collect();
    sorted.sort_by_key(|line| (line.resource, line.unit));
    sorted
}
