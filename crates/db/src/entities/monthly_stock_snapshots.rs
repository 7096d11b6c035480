//! `SeaORM` Entity for monthly_stock_snapshots table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "monthly_stock_snapshots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub sku_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub month: Date,
    pub opening_stock: i64,
    pub total_inward: i64,
    pub total_outward: i64,
    pub closing_stock: i64,
    #[sea_orm(column_type = "JsonBinary")]
    pub inward_breakdown: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub outward_breakdown: Json,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::skus::Entity",
        from = "Column::SkuId",
        to = "super::skus::Column::Id"
    )]
    Skus,
}

impl Related<super::skus::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Skus.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
