use std::sync::Arc;

use uuid::Uuid;

use crate::{
    audit::AuditLog,
    error::{AppError, AppResult},
    models::{NewWarehouseItem, WarehouseItem, WarehouseStats},
    repository::{WarehouseFilter, WarehouseRepository},
};

/// Stock ledger. Each adjustment is its own unit of mutual exclusion on a single item.
#[derive(Clone)]
pub struct WarehouseLedger {
    repo: Arc<dyn WarehouseRepository>,
    audit: AuditLog,
}

impl WarehouseLedger {
    pub fn new(repo: Arc<dyn WarehouseRepository>, audit: AuditLog) -> Self {
        Self { repo, audit }
    }

    pub async fn stock(&self, actor: Option<&str>, item: NewWarehouseItem) -> AppResult<WarehouseItem> {
        let item = self.repo.create(item).await?;
        tracing::info!(item_id = %item.id, sku = %item.sku, stock = item.current_stock(), "warehouse item stocked");

        if let Err(err) = self
            .audit
            .record(
                actor,
                "warehouse_stock",
                Some("warehouse_items"),
                Some(serde_json::json!({ "item_id": item.id, "current_stock": item.current_stock() })),
            )
            .await
        {
            tracing::warn!(error = %err, "audit log failed");
        }

        Ok(item)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<WarehouseItem> {
        self.repo.find_by_id(id).await?.ok_or(AppError::NotFound)
    }

    /// Moves current and available stock of one item by `delta`.
    ///
    /// Not idempotent, so never retried here: a blind retry could apply the delta twice.
    pub async fn adjust(&self, actor: Option<&str>, id: Uuid, delta: i32) -> AppResult<WarehouseItem> {
        let item = match self.repo.adjust(id, delta).await {
            Ok(item) => item,
            Err(err @ AppError::InvalidAdjustment { .. }) => {
                tracing::info!(item_id = %id, delta, error = %err, "stock adjustment rejected");
                return Err(err);
            }
            Err(err) => return Err(err),
        };
        tracing::info!(
            item_id = %id,
            delta,
            current = item.current_stock(),
            available = item.available_stock(),
            "stock adjusted"
        );

        if let Err(err) = self
            .audit
            .record(
                actor,
                "inventory_adjust",
                Some("warehouse_items"),
                Some(serde_json::json!({ "item_id": id, "delta": delta, "current_stock": item.current_stock() })),
            )
            .await
        {
            tracing::warn!(error = %err, "audit log failed");
        }

        Ok(item)
    }

    pub async fn list(
        &self,
        filter: &WarehouseFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<WarehouseItem>, i64)> {
        let (items, total) = self
            .repo
            .list(filter, limit.max(0) as u64, offset.max(0) as u64)
            .await?;
        Ok((items, total as i64))
    }

    pub async fn stats(&self, filter: &WarehouseFilter) -> AppResult<WarehouseStats> {
        self.repo.stats(filter).await
    }
}
