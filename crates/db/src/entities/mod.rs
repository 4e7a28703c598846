//! `SeaORM` entity definitions for the warehouse tables.

pub mod balances;
pub mod clients;
pub mod receipt_documents;
pub mod receipt_resources;
pub mod resources;
pub mod sea_orm_active_enums;
pub mod shipment_documents;
pub mod shipment_resources;
pub mod units_of_measurement;
