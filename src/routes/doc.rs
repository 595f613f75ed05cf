use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{Credentials, LoginResponse},
        cart::{CartLineDto, CartSyncRequest, CartView},
        warehouse::{StockAdjustmentRequest, WarehouseItemDto, WarehouseItemList, WarehouseQuery},
    },
    models::{NewWarehouseItem, Role, StockStatus, User, WarehouseStats},
    response::{ApiResponse, Meta},
    routes::{auth, cart, health, params, warehouse},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        cart::load_cart,
        cart::replace_cart,
        cart::clear_cart,
        cart::merge_cart,
        warehouse::list_items,
        warehouse::list_low_stock,
        warehouse::warehouse_stats,
        warehouse::stock_item,
        warehouse::get_item,
        warehouse::adjust_stock
    ),
    components(
        schemas(
            User,
            Role,
            Credentials,
            LoginResponse,
            CartLineDto,
            CartSyncRequest,
            CartView,
            NewWarehouseItem,
            StockAdjustmentRequest,
            StockStatus,
            WarehouseItemDto,
            WarehouseItemList,
            WarehouseQuery,
            WarehouseStats,
            params::Pagination,
            Meta,
            ApiResponse<CartView>,
            ApiResponse<WarehouseItemDto>,
            ApiResponse<WarehouseItemList>,
            ApiResponse<WarehouseStats>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Cart", description = "Cart load, replace and guest merge"),
        (name = "Warehouse", description = "Admin stock ledger"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
