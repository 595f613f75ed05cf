use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set, SqlErr, TransactionTrait,
    sea_query::{Expr, Func, LockType},
};
use uuid::Uuid;

use crate::{
    entity::warehouse_items::{
        ActiveModel as ItemActive, Column as ItemCol, Entity as WarehouseItems, Model as ItemModel,
    },
    error::{AppError, AppResult},
    models::{NewWarehouseItem, WarehouseItem, WarehouseStats},
    repository::{WarehouseFilter, WarehouseRepository},
};

const LOW_STOCK_SQL: &str = "current_stock - reserved_stock <= reorder_level";

#[derive(Clone)]
pub struct SeaOrmWarehouseRepository {
    conn: DatabaseConnection,
}

impl SeaOrmWarehouseRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl WarehouseRepository for SeaOrmWarehouseRepository {
    async fn create(&self, item: NewWarehouseItem) -> AppResult<WarehouseItem> {
        let item = WarehouseItem::new(Uuid::new_v4(), item, Utc::now())?;

        let model = ItemActive {
            id: Set(item.id),
            product_id: Set(item.product_id.clone()),
            variant_id: Set(item.variant_id.clone()),
            sku: Set(item.sku.clone()),
            product_name: Set(item.product_name.clone()),
            color: Set(item.color.clone()),
            size: Set(item.size.clone()),
            location: Set(item.location.clone()),
            current_stock: Set(item.current_stock()),
            reserved_stock: Set(item.reserved_stock()),
            reorder_level: Set(item.reorder_level()),
            last_updated: Set(item.last_updated.into()),
        }
        .insert(&self.conn)
        .await
        .map_err(|err| match err.sql_err() {
            // UNIQUE (product_id, variant_id) also settles two concurrent stockings
            Some(SqlErr::UniqueConstraintViolation(_)) => already_stocked(&item),
            _ => err.into(),
        })?;

        item_from_entity(model)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<WarehouseItem>> {
        WarehouseItems::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(item_from_entity)
            .transpose()
    }

    async fn adjust(&self, id: Uuid, delta: i32) -> AppResult<WarehouseItem> {
        let txn = self.conn.begin().await?;
        let model = WarehouseItems::find_by_id(id)
            .lock(LockType::Update)
            .one(&txn)
            .await?;
        let model = match model {
            Some(m) => m,
            None => return Err(AppError::NotFound),
        };

        let mut item = item_from_entity(model.clone())?;
        item.apply_adjustment(delta)?;

        let mut active: ItemActive = model.into();
        active.current_stock = Set(item.current_stock());
        active.last_updated = Set(item.last_updated.into());
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        item_from_entity(updated)
    }

    async fn list(
        &self,
        filter: &WarehouseFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<(Vec<WarehouseItem>, u64)> {
        let finder = filtered(filter)
            .order_by_asc(ItemCol::ProductName)
            .order_by_asc(ItemCol::Sku);

        let total = finder.clone().count(&self.conn).await?;
        let items = finder
            .limit(limit)
            .offset(offset)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(item_from_entity)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((items, total))
    }

    async fn stats(&self, filter: &WarehouseFilter) -> AppResult<WarehouseStats> {
        let row: Option<(i64, i64, i64)> = filtered(filter)
            .select_only()
            .column_as(Expr::cust("COUNT(*)"), "total_items")
            .column_as(
                Expr::cust(format!("COUNT(*) FILTER (WHERE {LOW_STOCK_SQL})")),
                "low_stock_items",
            )
            .column_as(
                Expr::cust("COALESCE(SUM(current_stock), 0)::BIGINT"),
                "total_stock",
            )
            .into_tuple()
            .one(&self.conn)
            .await?;

        Ok(row
            .map(|(total_items, low_stock_items, total_stock)| WarehouseStats {
                total_items,
                low_stock_items,
                total_stock,
            })
            .unwrap_or_default())
    }
}

fn filtered(filter: &WarehouseFilter) -> Select<WarehouseItems> {
    let mut condition = Condition::all();
    if let Some(q) = filter.search() {
        let pattern = format!("%{}%", q.to_lowercase());
        condition = condition.add(
            Condition::any()
                .add(Expr::expr(Func::lower(Expr::col(ItemCol::ProductName))).like(pattern.as_str()))
                .add(Expr::expr(Func::lower(Expr::col(ItemCol::Sku))).like(pattern.as_str()))
                .add(Expr::expr(Func::lower(Expr::col(ItemCol::Location))).like(pattern.as_str())),
        );
    }
    if filter.low_stock_only {
        condition = condition.add(Expr::cust(LOW_STOCK_SQL));
    }
    WarehouseItems::find().filter(condition)
}

fn already_stocked(item: &WarehouseItem) -> AppError {
    AppError::BadRequest(format!(
        "variant {} of product {} is already stocked",
        item.variant_id, item.product_id
    ))
}

fn item_from_entity(model: ItemModel) -> AppResult<WarehouseItem> {
    let id = model.id;
    let last_updated = model.last_updated.with_timezone(&Utc);
    let item = NewWarehouseItem {
        product_id: model.product_id,
        variant_id: model.variant_id,
        sku: model.sku,
        product_name: model.product_name,
        color: model.color,
        size: model.size,
        location: model.location,
        current_stock: model.current_stock,
        reserved_stock: model.reserved_stock,
        reorder_level: model.reorder_level,
    };
    WarehouseItem::new(id, item, last_updated)
}
