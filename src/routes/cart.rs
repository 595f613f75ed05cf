use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::cart::{CartSyncRequest, CartView, lines_from_dto},
    error::AppResult,
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(load_cart).post(replace_cart).delete(clear_cart))
        .route("/merge", post(merge_cart))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart of the signed-in owner, empty when none exists", body = ApiResponse<CartView>),
        (status = 401, description = "Unauthenticated"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn load_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let lines = state.carts.load(&user.owner()?).await?;
    let meta = Meta::total(lines.len());
    Ok(Json(ApiResponse::success("OK", CartView::from(&lines), Some(meta))))
}

#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = CartSyncRequest,
    responses(
        (status = 200, description = "Replace the whole cart", body = ApiResponse<CartView>),
        (status = 400, description = "Malformed or duplicate lines"),
        (status = 401, description = "Unauthenticated"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn replace_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CartSyncRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let owner = user.owner()?;
    let lines = lines_from_dto(payload.items)?;
    let lines = state.carts.replace(&owner, lines).await?;
    let meta = Meta::total(lines.len());
    Ok(Json(ApiResponse::success("Cart saved", CartView::from(&lines), Some(meta))))
}

#[utoipa::path(
    delete,
    path = "/api/cart",
    responses(
        (status = 200, description = "Empty the cart", body = ApiResponse<serde_json::Value>),
        (status = 401, description = "Unauthenticated"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    state.carts.clear(&user.owner()?).await?;
    Ok(Json(ApiResponse::success(
        "Cart cleared",
        serde_json::json!({}),
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/cart/merge",
    request_body = CartSyncRequest,
    responses(
        (status = 200, description = "Merge a guest cart into the stored cart; quantities of shared products are summed", body = ApiResponse<CartView>),
        (status = 400, description = "Malformed or duplicate lines"),
        (status = 401, description = "Unauthenticated"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn merge_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CartSyncRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let owner = user.owner()?;
    let local = lines_from_dto(payload.items)?;
    let merged = state.carts.merge(&owner, local).await?;
    let meta = Meta::total(merged.len());
    Ok(Json(ApiResponse::success("Cart merged", CartView::from(&merged), Some(meta))))
}
