pub mod cart_lines;
pub mod carts;
pub mod users;
pub mod warehouse_items;

pub use cart_lines::Entity as CartLines;
pub use carts::Entity as Carts;
pub use users::Entity as Users;
pub use warehouse_items::Entity as WarehouseItems;
