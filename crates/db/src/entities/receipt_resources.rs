//! `SeaORM` Entity for the receipt_resources table (receipt line items).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "receipt_resources")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub receipt_document_id: i32,
    pub resource_id: i32,
    pub unit_of_measurement_id: i32,
    #[sea_orm(column_type = "Decimal(Some((18, 3)))")]
    pub quantity: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::receipt_documents::Entity",
        from = "Column::ReceiptDocumentId",
        to = "super::receipt_documents::Column::Id"
    )]
    ReceiptDocuments,
    #[sea_orm(
        belongs_to = "super::resources::Entity",
        from = "Column::ResourceId",
        to = "super::resources::Column::Id"
    )]
    Resources,
    #[sea_orm(
        belongs_to = "super::units_of_measurement::Entity",
        from = "Column::UnitOfMeasurementId",
        to = "super::units_of_measurement::Column::Id"
    )]
    UnitsOfMeasurement,
}

impl Related<super::receipt_documents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReceiptDocuments.def()
    }
}

impl Related<super::resources::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Resources.def()
    }
}

impl Related<super::units_of_measurement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UnitsOfMeasurement.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
