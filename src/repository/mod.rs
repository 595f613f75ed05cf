//! Persistence ports and their adapters.
//!
//! Every adapter must make `replace`, `merge` and `adjust` atomic: a reader sees either the
//! old or the new state, never a mix.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{CartLine, NewWarehouseItem, User, WarehouseItem, WarehouseStats},
};

pub mod memory;
pub mod sea_orm_cart;
pub mod sea_orm_user;
pub mod sea_orm_warehouse;

pub use memory::{InMemoryCartRepository, InMemoryUserRepository, InMemoryWarehouseRepository};
pub use sea_orm_cart::SeaOrmCartRepository;
pub use sea_orm_user::SeaOrmUserRepository;
pub use sea_orm_warehouse::SeaOrmWarehouseRepository;

#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Lines of the owner's cart in stored order. Never creates a cart.
    async fn load(&self, owner_id: &str) -> AppResult<Vec<CartLine>>;

    /// Replaces all lines of the owner's cart, creating the cart first if needed.
    async fn replace(&self, owner_id: &str, lines: &[CartLine]) -> AppResult<()>;

    /// Merges `local` into the stored cart and persists the result in one unit.
    async fn merge(&self, owner_id: &str, local: &[CartLine]) -> AppResult<Vec<CartLine>>;

    async fn exists(&self, owner_id: &str) -> AppResult<bool>;
}

#[derive(Debug, Clone, Default)]
pub struct WarehouseFilter {
    pub q: Option<String>,
    pub low_stock_only: bool,
}

impl WarehouseFilter {
    pub fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    pub fn accepts(&self, item: &WarehouseItem) -> bool {
        if self.low_stock_only && !item.is_low_stock() {
            return false;
        }
        self.search().is_none_or(|q| item.matches(q))
    }
}

#[async_trait]
pub trait WarehouseRepository: Send + Sync {
    async fn create(&self, item: NewWarehouseItem) -> AppResult<WarehouseItem>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<WarehouseItem>>;

    /// Applies `delta` under an exclusive lock on the single item.
    async fn adjust(&self, id: Uuid, delta: i32) -> AppResult<WarehouseItem>;

    /// Page of matching items ordered by product name then SKU, plus the total match count.
    async fn list(
        &self,
        filter: &WarehouseFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<(Vec<WarehouseItem>, u64)>;

    async fn stats(&self, filter: &WarehouseFilter) -> AppResult<WarehouseStats>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Fails with `BadRequest` when the email is taken.
    async fn create(&self, email: &str, password_hash: &str, role: &str) -> AppResult<User>;
}
