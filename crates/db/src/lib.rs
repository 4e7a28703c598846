//! Database layer with `SeaORM` entities and the engine repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the warehouse tables
//! - The embedded initial schema migration
//! - One repository per engine: balances, receipts, shipments, and the
//!   reference data (resources, units, clients)
//!
//! Every mutating repository operation runs as a single database transaction;
//! balance rows are locked (`SELECT ... FOR UPDATE`) so concurrent operations
//! on the same (resource, unit) pair serialize instead of losing updates.

pub mod entities;
pub mod migration;
pub mod repositories;

pub use repositories::{
    BalanceRepository, ClientRepository, ReceiptRepository, ResourceRepository,
    ShipmentRepository, UnitRepository,
};

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use warehouse_shared::config::DatabaseConfig;

/// Establishes a pooled connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(&config.url);
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections);
    Database::connect(options).await
}
