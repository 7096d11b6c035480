//! `SeaORM` Entity for skus table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "skus")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub variation_id: Uuid,
    #[sea_orm(unique)]
    pub sku_code: String,
    pub size: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::variations::Entity",
        from = "Column::VariationId",
        to = "super::variations::Column::Id"
    )]
    Variations,
    #[sea_orm(has_many = "super::inventory_transactions::Entity")]
    InventoryTransactions,
    #[sea_orm(has_many = "super::monthly_stock_snapshots::Entity")]
    MonthlyStockSnapshots,
}

impl Related<super::variations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variations.def()
    }
}

impl Related<super::inventory_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryTransactions.def()
    }
}

impl Related<super::monthly_stock_snapshots::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MonthlyStockSnapshots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
