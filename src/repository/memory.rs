//! Process-local adapters for the `memory` storage backend and for tests.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{CartLine, NewWarehouseItem, Role, User, WarehouseItem, WarehouseStats},
    repository::{CartRepository, UserRepository, WarehouseFilter, WarehouseRepository},
    services::cart_merge,
};

/// Carts keyed by owner. One lock for all owners, which also serializes each owner.
#[derive(Default)]
pub struct InMemoryCartRepository {
    carts: Mutex<HashMap<String, Vec<CartLine>>>,
}

impl InMemoryCartRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartRepository for InMemoryCartRepository {
    async fn load(&self, owner_id: &str) -> AppResult<Vec<CartLine>> {
        let carts = self.carts.lock().await;
        Ok(carts.get(owner_id).cloned().unwrap_or_default())
    }

    async fn replace(&self, owner_id: &str, lines: &[CartLine]) -> AppResult<()> {
        let mut carts = self.carts.lock().await;
        carts.insert(owner_id.to_string(), lines.to_vec());
        Ok(())
    }

    async fn merge(&self, owner_id: &str, local: &[CartLine]) -> AppResult<Vec<CartLine>> {
        let mut carts = self.carts.lock().await;
        let remote = carts.get(owner_id).map(Vec::as_slice).unwrap_or_default();
        let merged = cart_merge::merge(local, remote)?;
        carts.insert(owner_id.to_string(), merged.clone());
        Ok(merged)
    }

    async fn exists(&self, owner_id: &str) -> AppResult<bool> {
        Ok(self.carts.lock().await.contains_key(owner_id))
    }
}

#[derive(Default)]
struct Shelves {
    items: HashMap<Uuid, Arc<Mutex<WarehouseItem>>>,
    variants: HashSet<(String, String)>,
}

/// Warehouse items, each behind its own lock so adjustments on different items never wait
/// on each other.
#[derive(Default)]
pub struct InMemoryWarehouseRepository {
    shelves: RwLock<Shelves>,
}

impl InMemoryWarehouseRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn snapshot(&self, filter: &WarehouseFilter) -> Vec<WarehouseItem> {
        let handles: Vec<_> = self.shelves.read().await.items.values().cloned().collect();
        let mut items = Vec::with_capacity(handles.len());
        for handle in handles {
            let item = handle.lock().await.clone();
            if filter.accepts(&item) {
                items.push(item);
            }
        }
        items.sort_by(|a, b| {
            a.product_name
                .cmp(&b.product_name)
                .then_with(|| a.sku.cmp(&b.sku))
        });
        items
    }
}

#[async_trait]
impl WarehouseRepository for InMemoryWarehouseRepository {
    async fn create(&self, item: NewWarehouseItem) -> AppResult<WarehouseItem> {
        let item = WarehouseItem::new(Uuid::new_v4(), item, Utc::now())?;
        let mut shelves = self.shelves.write().await;
        let key = (item.product_id.clone(), item.variant_id.clone());
        if !shelves.variants.insert(key) {
            return Err(AppError::BadRequest(format!(
                "variant {} of product {} is already stocked",
                item.variant_id, item.product_id
            )));
        }
        shelves
            .items
            .insert(item.id, Arc::new(Mutex::new(item.clone())));
        Ok(item)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<WarehouseItem>> {
        let handle = self.shelves.read().await.items.get(&id).cloned();
        match handle {
            Some(handle) => Ok(Some(handle.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn adjust(&self, id: Uuid, delta: i32) -> AppResult<WarehouseItem> {
        let handle = self
            .shelves
            .read()
            .await
            .items
            .get(&id)
            .cloned()
            .ok_or(AppError::NotFound)?;

        let mut item = handle.lock().await;
        // work on a copy so a rejected adjustment leaves the stored item untouched
        let mut next = item.clone();
        next.apply_adjustment(delta)?;
        *item = next.clone();
        Ok(next)
    }

    async fn list(
        &self,
        filter: &WarehouseFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<(Vec<WarehouseItem>, u64)> {
        let items = self.snapshot(filter).await;
        let total = items.len() as u64;
        let page = items
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn stats(&self, filter: &WarehouseFilter) -> AppResult<WarehouseStats> {
        let items = self.snapshot(filter).await;
        Ok(WarehouseStats {
            total_items: items.len() as i64,
            low_stock_items: items.iter().filter(|i| i.is_low_stock()).count() as i64,
            total_stock: items.iter().map(|i| i64::from(i.current_stock())).sum(),
        })
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.users.lock().await.get(email).cloned())
    }

    async fn create(&self, email: &str, password_hash: &str, role: &str) -> AppResult<User> {
        let mut users = self.users.lock().await;
        if users.contains_key(email) {
            return Err(AppError::BadRequest("Email is already taken".to_string()));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role: Role::from_tag(role),
            created_at: Utc::now(),
        };
        users.insert(email.to_string(), user.clone());
        Ok(user)
    }
}
