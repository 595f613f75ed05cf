use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    models::{StockStatus, WarehouseItem},
    routes::params::Pagination,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct StockAdjustmentRequest {
    /// Signed: positive restocks, negative consumes or corrects.
    pub adjustment: i32,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct WarehouseQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Matches product name, SKU or location, case-insensitive.
    pub q: Option<String>,
}

impl WarehouseQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseItemDto {
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
    pub available_stock: i32,
    pub reorder_level: i32,
    pub status: StockStatus,
    pub last_updated: DateTime<Utc>,
}

impl From<&WarehouseItem> for WarehouseItemDto {
    fn from(item: &WarehouseItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id.clone(),
            variant_id: item.variant_id.clone(),
            sku: item.sku.clone(),
            product_name: item.product_name.clone(),
            color: item.color.clone(),
            size: item.size.clone(),
            location: item.location.clone(),
            current_stock: item.current_stock(),
            reserved_stock: item.reserved_stock(),
            available_stock: item.available_stock(),
            reorder_level: item.reorder_level(),
            status: item.status(),
            last_updated: item.last_updated,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WarehouseItemList {
    pub items: Vec<WarehouseItemDto>,
}
