use std::sync::Arc;

use cart_ledger_api::{
    audit::AuditLog,
    error::AppError,
    models::{NewWarehouseItem, StockStatus},
    repository::{InMemoryWarehouseRepository, WarehouseFilter},
    services::WarehouseLedger,
};
use uuid::Uuid;

fn ledger() -> WarehouseLedger {
    WarehouseLedger::new(Arc::new(InMemoryWarehouseRepository::new()), AuditLog::disabled())
}

fn new_item(variant: &str, current: i32, reserved: i32, reorder: i32) -> NewWarehouseItem {
    NewWarehouseItem {
        product_id: "tee".into(),
        variant_id: variant.into(),
        sku: format!("TE-{}", variant.to_uppercase()),
        product_name: "Ferris Tee".into(),
        color: Some("orange".into()),
        size: Some("M".into()),
        location: "B-03-2".into(),
        current_stock: current,
        reserved_stock: reserved,
        reorder_level: reorder,
    }
}

#[tokio::test]
async fn consuming_to_reorder_level_reports_low_stock() -> anyhow::Result<()> {
    let ledger = ledger();
    let item = ledger.stock(None, new_item("m", 5, 0, 3)).await?;
    assert_eq!(item.status(), StockStatus::InStock);

    let item = ledger.adjust(Some("admin"), item.id, -2).await?;
    assert_eq!(item.current_stock(), 3);
    assert_eq!(item.available_stock(), 3);
    assert_eq!(item.status(), StockStatus::LowStock);
    Ok(())
}

#[tokio::test]
async fn overdraw_is_rejected_and_stock_is_unchanged() -> anyhow::Result<()> {
    let ledger = ledger();
    let item = ledger.stock(None, new_item("m", 5, 0, 3)).await?;

    let err = ledger.adjust(None, item.id, -10).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidAdjustment { current: 5, delta: -10, .. }));

    assert_eq!(ledger.get(item.id).await?.current_stock(), 5);
    Ok(())
}

#[tokio::test]
async fn reserved_units_cannot_be_consumed() -> anyhow::Result<()> {
    let ledger = ledger();
    let item = ledger.stock(None, new_item("m", 5, 4, 0)).await?;

    assert!(ledger.adjust(None, item.id, -2).await.is_err());
    let item = ledger.adjust(None, item.id, -1).await?;
    assert_eq!(item.available_stock(), 0);
    assert_eq!(item.status(), StockStatus::OutOfStock);
    Ok(())
}

#[tokio::test]
async fn zero_delta_on_empty_item_is_out_of_stock() -> anyhow::Result<()> {
    let ledger = ledger();
    let item = ledger.stock(None, new_item("s", 0, 0, 5)).await?;

    let item = ledger.adjust(None, item.id, 0).await?;
    assert_eq!(item.current_stock(), 0);
    assert_eq!(item.status(), StockStatus::OutOfStock);
    Ok(())
}

#[tokio::test]
async fn unknown_item_is_not_found() {
    let ledger = ledger();
    let err = ledger.adjust(None, Uuid::new_v4(), 1).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adjustments_settle_on_the_sum() -> anyhow::Result<()> {
    let ledger = ledger();
    let item = ledger.stock(None, new_item("m", 10, 0, 2)).await?;

    let restock = {
        let ledger = ledger.clone();
        tokio::spawn(async move { ledger.adjust(None, item.id, 3).await })
    };
    let consume = {
        let ledger = ledger.clone();
        tokio::spawn(async move { ledger.adjust(None, item.id, -1).await })
    };
    restock.await??;
    consume.await??;

    assert_eq!(ledger.get(item.id).await?.current_stock(), 12);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_concurrent_adjustments_lose_no_update() -> anyhow::Result<()> {
    let ledger = ledger();
    let item = ledger.stock(None, new_item("l", 100, 0, 10)).await?;

    let mut tasks = Vec::new();
    for i in 0..50 {
        let ledger = ledger.clone();
        let delta = if i % 2 == 0 { 2 } else { -1 };
        tasks.push(tokio::spawn(async move { ledger.adjust(None, item.id, delta).await }));
    }
    for task in tasks {
        task.await??;
    }

    // 25 * 2 - 25 * 1
    assert_eq!(ledger.get(item.id).await?.current_stock(), 125);
    Ok(())
}

#[tokio::test]
async fn duplicate_variant_is_rejected() -> anyhow::Result<()> {
    let ledger = ledger();
    ledger.stock(None, new_item("m", 1, 0, 0)).await?;
    let err = ledger.stock(None, new_item("m", 1, 0, 0)).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn listing_filters_and_stats_use_derived_status() -> anyhow::Result<()> {
    let ledger = ledger();
    ledger.stock(None, new_item("s", 0, 0, 5)).await?;
    ledger.stock(None, new_item("m", 120, 20, 15)).await?;
    ledger.stock(None, new_item("l", 6, 1, 10)).await?;

    let all = WarehouseFilter::default();
    let (items, total) = ledger.list(&all, 2, 0).await?;
    assert_eq!(total, 3);
    assert_eq!(items.len(), 2);

    let low = WarehouseFilter {
        q: None,
        low_stock_only: true,
    };
    let (items, total) = ledger.list(&low, 20, 0).await?;
    assert_eq!(total, 2);
    assert!(items.iter().all(|i| i.status() != StockStatus::InStock));

    let search = WarehouseFilter {
        q: Some("te-M".into()),
        low_stock_only: false,
    };
    let (items, _) = ledger.list(&search, 20, 0).await?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].variant_id, "m");

    let stats = ledger.stats(&all).await?;
    assert_eq!(stats.total_items, 3);
    assert_eq!(stats.low_stock_items, 2);
    assert_eq!(stats.total_stock, 126);
    Ok(())
}
