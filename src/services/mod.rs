pub mod auth_service;
pub mod cart_merge;
pub mod cart_service;
pub mod warehouse_service;

pub use cart_service::CartService;
pub use warehouse_service::WarehouseLedger;
