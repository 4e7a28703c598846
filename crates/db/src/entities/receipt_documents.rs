//! `SeaORM` Entity for the receipt_documents table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "receipt_documents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub number: String,
    pub date: Date,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::receipt_resources::Entity")]
    ReceiptResources,
}

impl Related<super::receipt_resources::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReceiptResources.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
