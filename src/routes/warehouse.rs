use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::warehouse::{StockAdjustmentRequest, WarehouseItemDto, WarehouseItemList, WarehouseQuery},
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    models::{NewWarehouseItem, WarehouseStats},
    repository::WarehouseFilter,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(stock_item))
        .route("/low-stock", get(list_low_stock))
        .route("/stats", get(warehouse_stats))
        .route("/{id}", get(get_item))
        .route("/{id}/adjust", patch(adjust_stock))
}

#[utoipa::path(
    get,
    path = "/api/admin/warehouse",
    params(
        ("q" = Option<String>, Query, description = "Search product name, SKU or location"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "Warehouse items with derived stock status", body = ApiResponse<WarehouseItemList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Warehouse"
)]
pub async fn list_items(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<WarehouseQuery>,
) -> AppResult<Json<ApiResponse<WarehouseItemList>>> {
    ensure_admin(&user)?;
    let pagination = query.pagination();
    let filter = WarehouseFilter {
        q: query.q,
        low_stock_only: false,
    };
    list_page(&state, &filter, &pagination, "Warehouse items").await
}

#[utoipa::path(
    get,
    path = "/api/admin/warehouse/low-stock",
    params(
        ("q" = Option<String>, Query, description = "Search product name, SKU or location"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "Items whose available stock is at or below the reorder level", body = ApiResponse<WarehouseItemList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Warehouse"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<WarehouseQuery>,
) -> AppResult<Json<ApiResponse<WarehouseItemList>>> {
    ensure_admin(&user)?;
    let pagination = query.pagination();
    let filter = WarehouseFilter {
        q: query.q,
        low_stock_only: true,
    };
    list_page(&state, &filter, &pagination, "Low stock").await
}

async fn list_page(
    state: &AppState,
    filter: &WarehouseFilter,
    pagination: &Pagination,
    message: &str,
) -> AppResult<Json<ApiResponse<WarehouseItemList>>> {
    let (page, limit, offset) = pagination.normalize();
    let (items, total) = state.warehouse.list(filter, limit, offset).await?;
    let data = WarehouseItemList {
        items: items.iter().map(WarehouseItemDto::from).collect(),
    };
    let meta = Meta::paged(page, limit, total);
    Ok(Json(ApiResponse::success(message, data, Some(meta))))
}

#[utoipa::path(
    get,
    path = "/api/admin/warehouse/stats",
    params(
        ("q" = Option<String>, Query, description = "Restrict the figures to matching items")
    ),
    responses(
        (status = 200, description = "Item count, low-stock count and total stock", body = ApiResponse<WarehouseStats>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Warehouse"
)]
pub async fn warehouse_stats(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<WarehouseQuery>,
) -> AppResult<Json<ApiResponse<WarehouseStats>>> {
    ensure_admin(&user)?;
    let filter = WarehouseFilter {
        q: query.q,
        low_stock_only: false,
    };
    let stats = state.warehouse.stats(&filter).await?;
    Ok(Json(ApiResponse::success("Warehouse stats", stats, Some(Meta::empty()))))
}

#[utoipa::path(
    post,
    path = "/api/admin/warehouse",
    request_body = NewWarehouseItem,
    responses(
        (status = 201, description = "Stock a product variant", body = ApiResponse<WarehouseItemDto>),
        (status = 400, description = "Invalid counts or variant already stocked"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Warehouse"
)]
pub async fn stock_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewWarehouseItem>,
) -> AppResult<(StatusCode, Json<ApiResponse<WarehouseItemDto>>)> {
    ensure_admin(&user)?;
    let actor = user.actor();
    let item = state.warehouse.stock(Some(&actor), payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "Item stocked",
            WarehouseItemDto::from(&item),
            Some(Meta::empty()),
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/warehouse/{id}",
    params(
        ("id" = Uuid, Path, description = "Warehouse item ID")
    ),
    responses(
        (status = 200, description = "Warehouse item", body = ApiResponse<WarehouseItemDto>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Warehouse"
)]
pub async fn get_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<WarehouseItemDto>>> {
    ensure_admin(&user)?;
    let item = state.warehouse.get(id).await?;
    Ok(Json(ApiResponse::success(
        "OK",
        WarehouseItemDto::from(&item),
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    patch,
    path = "/api/admin/warehouse/{id}/adjust",
    params(
        ("id" = Uuid, Path, description = "Warehouse item ID")
    ),
    request_body = StockAdjustmentRequest,
    responses(
        (status = 200, description = "Adjust stock by a signed delta", body = ApiResponse<WarehouseItemDto>),
        (status = 400, description = "Adjustment would make stock negative"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Warehouse"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockAdjustmentRequest>,
) -> AppResult<Json<ApiResponse<WarehouseItemDto>>> {
    ensure_admin(&user)?;
    let actor = user.actor();
    let item = state
        .warehouse
        .adjust(Some(&actor), id, payload.adjustment)
        .await?;
    Ok(Json(ApiResponse::success(
        "Inventory updated",
        WarehouseItemDto::from(&item),
        Some(Meta::empty()),
    )))
}
