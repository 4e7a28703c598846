//! Initial database migration.
//!
//! Creates the warehouse tables. Check constraints and unique indexes back up
//! the invariants the engine enforces itself: balance quantities never
//! negative, line quantities strictly positive, one balance row per
//! (resource, unit) pair.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: REFERENCE DATA
        // ============================================================
        db.execute_unprepared(RESOURCES_SQL).await?;
        db.execute_unprepared(UNITS_OF_MEASUREMENT_SQL).await?;
        db.execute_unprepared(CLIENTS_SQL).await?;

        // ============================================================
        // PART 3: BALANCE LEDGER
        // ============================================================
        db.execute_unprepared(BALANCES_SQL).await?;

        // ============================================================
        // PART 4: DOCUMENTS & LINE ITEMS
        // ============================================================
        db.execute_unprepared(RECEIPT_DOCUMENTS_SQL).await?;
        db.execute_unprepared(RECEIPT_RESOURCES_SQL).await?;
        db.execute_unprepared(SHIPMENT_DOCUMENTS_SQL).await?;
        db.execute_unprepared(SHIPMENT_RESOURCES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
-- Shipment document lifecycle
CREATE TYPE shipment_state AS ENUM (
    'draft',
    'signed'
);
";

const RESOURCES_SQL: &str = r"
CREATE TABLE resources (
    id SERIAL PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    is_archived BOOLEAN NOT NULL DEFAULT FALSE,

    CONSTRAINT uq_resources_name UNIQUE (name)
);
";

const UNITS_OF_MEASUREMENT_SQL: &str = r"
CREATE TABLE units_of_measurement (
    id SERIAL PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    is_archived BOOLEAN NOT NULL DEFAULT FALSE,

    CONSTRAINT uq_units_of_measurement_name UNIQUE (name)
);
";

const CLIENTS_SQL: &str = r"
CREATE TABLE clients (
    id SERIAL PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    address VARCHAR(200) NOT NULL,
    is_archived BOOLEAN NOT NULL DEFAULT FALSE,

    CONSTRAINT uq_clients_name UNIQUE (name)
);
";

const BALANCES_SQL: &str = r"
CREATE TABLE balances (
    id SERIAL PRIMARY KEY,
    resource_id INTEGER NOT NULL REFERENCES resources(id) ON DELETE RESTRICT,
    unit_of_measurement_id INTEGER NOT NULL REFERENCES units_of_measurement(id) ON DELETE RESTRICT,
    quantity NUMERIC(18, 3) NOT NULL,

    CONSTRAINT uq_balances_resource_unit UNIQUE (resource_id, unit_of_measurement_id),
    CONSTRAINT ck_balances_quantity_non_negative CHECK (quantity >= 0)
);
";

const RECEIPT_DOCUMENTS_SQL: &str = r"
CREATE TABLE receipt_documents (
    id SERIAL PRIMARY KEY,
    number VARCHAR(50) NOT NULL,
    date DATE NOT NULL,

    CONSTRAINT uq_receipt_documents_number UNIQUE (number)
);
";

const RECEIPT_RESOURCES_SQL: &str = r"
CREATE TABLE receipt_resources (
    id SERIAL PRIMARY KEY,
    receipt_document_id INTEGER NOT NULL REFERENCES receipt_documents(id) ON DELETE CASCADE,
    resource_id INTEGER NOT NULL REFERENCES resources(id) ON DELETE RESTRICT,
    unit_of_measurement_id INTEGER NOT NULL REFERENCES units_of_measurement(id) ON DELETE RESTRICT,
    quantity NUMERIC(18, 3) NOT NULL,

    CONSTRAINT ck_receipt_resources_quantity_positive CHECK (quantity > 0)
);

CREATE INDEX ix_receipt_resources_document ON receipt_resources(receipt_document_id);
";

const SHIPMENT_DOCUMENTS_SQL: &str = r"
CREATE TABLE shipment_documents (
    id SERIAL PRIMARY KEY,
    number VARCHAR(50) NOT NULL,
    client_id INTEGER NOT NULL REFERENCES clients(id) ON DELETE RESTRICT,
    date DATE NOT NULL,
    state shipment_state NOT NULL DEFAULT 'draft',

    CONSTRAINT uq_shipment_documents_number UNIQUE (number)
);
";

const SHIPMENT_RESOURCES_SQL: &str = r"
CREATE TABLE shipment_resources (
    id SERIAL PRIMARY KEY,
    shipment_document_id INTEGER NOT NULL REFERENCES shipment_documents(id) ON DELETE CASCADE,
    resource_id INTEGER NOT NULL REFERENCES resources(id) ON DELETE RESTRICT,
    unit_of_measurement_id INTEGER NOT NULL REFERENCES units_of_measurement(id) ON DELETE RESTRICT,
    quantity NUMERIC(18, 3) NOT NULL,

    -- Deferred so an in-place line-set replacement may pass through a
    -- transient collision within its transaction.
    CONSTRAINT uq_shipment_resources_line UNIQUE (shipment_document_id, resource_id, unit_of_measurement_id) DEFERRABLE INITIALLY DEFERRED,
    CONSTRAINT ck_shipment_resources_quantity_positive CHECK (quantity > 0)
);

CREATE INDEX ix_shipment_resources_document ON shipment_resources(shipment_document_id);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS shipment_resources;
DROP TABLE IF EXISTS shipment_documents;
DROP TABLE IF EXISTS receipt_resources;
DROP TABLE IF EXISTS receipt_documents;
DROP TABLE IF EXISTS balances;
DROP TABLE IF EXISTS clients;
DROP TABLE IF EXISTS units_of_measurement;
DROP TABLE IF EXISTS resources;
DROP TYPE IF EXISTS shipment_state;
";
