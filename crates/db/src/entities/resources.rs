//! `SeaORM` Entity for the resources table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "resources")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub is_archived: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::balances::Entity")]
    Balances,
    #[sea_orm(has_many = "super::receipt_resources::Entity")]
    ReceiptResources,
    #[sea_orm(has_many = "super::shipment_resources::Entity")]
    ShipmentResources,
}

impl Related<super::balances::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Balances.def()
    }
}

impl Related<super::receipt_resources::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReceiptResources.def()
    }
}

impl Related<super::shipment_resources::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShipmentResources.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
