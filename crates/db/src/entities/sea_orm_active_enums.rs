//! Database enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Shipment document state.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "shipment_state")]
#[serde(rename_all = "snake_case")]
pub enum ShipmentState {
    /// Not yet signed; no ledger effect.
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Signed; the ledger has been debited.
    #[sea_orm(string_value = "signed")]
    Signed,
}

impl From<ShipmentState> for warehouse_core::ShipmentState {
    fn from(state: ShipmentState) -> Self {
        match state {
            ShipmentState::Draft => Self::Draft,
            ShipmentState::Signed => Self::Signed,
        }
    }
}

impl From<warehouse_core::ShipmentState> for ShipmentState {
    fn from(state: warehouse_core::ShipmentState) -> Self {
        match state {
            warehouse_core::ShipmentState::Draft => Self::Draft,
            warehouse_core::ShipmentState::Signed => Self::Signed,
        }
    }
}
