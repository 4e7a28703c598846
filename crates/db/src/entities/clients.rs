//! `SeaORM` Entity for the clients table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "clients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub address: String,
    pub is_archived: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::shipment_documents::Entity")]
    ShipmentDocuments,
}

impl Related<super::shipment_documents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShipmentDocuments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
