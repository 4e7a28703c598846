//! `SeaORM` Entity for the shipment_documents table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::ShipmentState;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "shipment_documents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub number: String,
    pub client_id: i32,
    pub date: Date,
    pub state: ShipmentState,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::clients::Entity",
        from = "Column::ClientId",
        to = "super::clients::Column::Id"
    )]
    Clients,
    #[sea_orm(has_many = "super::shipment_resources::Entity")]
    ShipmentResources,
}

impl Related<super::clients::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Clients.def()
    }
}

impl Related<super::shipment_resources::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShipmentResources.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
