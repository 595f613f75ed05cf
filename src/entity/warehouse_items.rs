use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "warehouse_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: String,
    pub variant_id: String,
    pub sku: String,
    pub product_name: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub location: String,
    pub current_stock: i32,
    pub reserved_stock: i32,
    pub reorder_level: i32,
    pub last_updated: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
