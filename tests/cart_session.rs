use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use cart_ledger_api::{
    audit::AuditLog,
    client::{
        CartSession, FileKeyValueStore, GUEST_CART_KEY, KeyValueStore, LocalCartStore,
        LocalStoreError, MemoryKeyValueStore,
    },
    error::{AppError, AppResult},
    models::{CartLine, OwnerContext, Role},
    repository::{CartRepository, InMemoryCartRepository},
    services::CartService,
};
use rust_decimal::Decimal;

fn line(id: &str, quantity: i32, price: i64) -> CartLine {
    CartLine::new(id, quantity, Decimal::from(price)).unwrap()
}

fn owner(id: &str) -> OwnerContext {
    OwnerContext::new(id, Role::User).unwrap()
}

/// Delegates to an in-memory cart but fails every write while `down` is set.
#[derive(Default)]
struct FlakyCarts {
    inner: InMemoryCartRepository,
    down: AtomicBool,
}

impl FlakyCarts {
    fn check(&self) -> AppResult<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!("cart store unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl CartRepository for FlakyCarts {
    async fn load(&self, owner_id: &str) -> AppResult<Vec<CartLine>> {
        self.inner.load(owner_id).await
    }

    async fn replace(&self, owner_id: &str, lines: &[CartLine]) -> AppResult<()> {
        self.check()?;
        self.inner.replace(owner_id, lines).await
    }

    async fn merge(&self, owner_id: &str, local: &[CartLine]) -> AppResult<Vec<CartLine>> {
        self.check()?;
        self.inner.merge(owner_id, local).await
    }

    async fn exists(&self, owner_id: &str) -> AppResult<bool> {
        self.inner.exists(owner_id).await
    }
}

/// Local storage whose deletes fail while `stuck` is set.
#[derive(Default)]
struct StickyStore {
    inner: MemoryKeyValueStore,
    stuck: AtomicBool,
}

impl KeyValueStore for StickyStore {
    fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), LocalStoreError> {
        if self.stuck.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("storage locked").into());
        }
        self.inner.remove(key)
    }
}

#[tokio::test]
async fn guest_cart_survives_restart_and_merges_on_sign_in() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let repo = Arc::new(InMemoryCartRepository::new());
    let carts = CartService::new(repo, AuditLog::disabled());
    carts
        .replace(&owner("u-1"), vec![line("a", 1, 10)].try_into()?)
        .await?;

    {
        let local = LocalCartStore::open(FileKeyValueStore::open(dir.path())?)?;
        let mut session = CartSession::new(local, carts.clone());
        session.add_item(line("a", 2, 12)).await?;
        session.add_item(line("b", 1, 5)).await?;
    }

    let kv = FileKeyValueStore::open(dir.path())?;
    let local = LocalCartStore::open(kv.clone())?;
    assert_eq!(local.lines().len(), 2);

    let mut session = CartSession::new(local, carts.clone());
    let merged = session.sign_in(owner("u-1")).await?.clone();

    assert_eq!(merged.get("a").unwrap().quantity(), 3);
    assert_eq!(merged.get("a").unwrap().price(), Decimal::from(10));
    assert_eq!(merged.get("b").unwrap().quantity(), 1);
    assert!(session.local().is_empty());
    assert_eq!(kv.get(GUEST_CART_KEY)?, None);
    assert_eq!(carts.load(&owner("u-1")).await?, merged);
    Ok(())
}

#[tokio::test]
async fn signing_in_twice_merges_once() -> anyhow::Result<()> {
    let carts = CartService::new(Arc::new(InMemoryCartRepository::new()), AuditLog::disabled());
    let local = LocalCartStore::open(Arc::new(MemoryKeyValueStore::new()))?;
    let mut session = CartSession::new(local, carts.clone());
    session.add_item(line("a", 2, 10)).await?;

    session.sign_in(owner("u-1")).await?;
    session.sign_in(owner("u-1")).await?;

    assert_eq!(carts.load(&owner("u-1")).await?.get("a").unwrap().quantity(), 2);
    Ok(())
}

#[tokio::test]
async fn failed_merge_keeps_the_guest_cart() -> anyhow::Result<()> {
    let repo = Arc::new(FlakyCarts::default());
    repo.down.store(true, Ordering::SeqCst);
    let carts = CartService::new(repo.clone(), AuditLog::disabled());

    let kv = Arc::new(MemoryKeyValueStore::new());
    let mut session = CartSession::new(LocalCartStore::open(kv.clone())?, carts.clone());
    session.add_item(line("a", 2, 10)).await?;

    assert!(session.sign_in(owner("u-1")).await.is_err());
    assert!(!session.is_signed_in());
    assert_eq!(session.lines().get("a").unwrap().quantity(), 2);
    assert!(kv.get(GUEST_CART_KEY)?.is_some());

    repo.down.store(false, Ordering::SeqCst);
    session.sign_in(owner("u-1")).await?;
    assert_eq!(carts.load(&owner("u-1")).await?.get("a").unwrap().quantity(), 2);
    assert!(session.local().is_empty());
    Ok(())
}

#[tokio::test]
async fn signed_in_mutations_replace_the_remote_cart() -> anyhow::Result<()> {
    let repo = Arc::new(FlakyCarts::default());
    let carts = CartService::new(repo.clone(), AuditLog::disabled());
    let kv = Arc::new(MemoryKeyValueStore::new());
    let mut session = CartSession::new(LocalCartStore::open(kv.clone())?, carts.clone());
    let ctx = owner("u-1");

    session.sign_in(ctx.clone()).await?;
    session.add_item(line("a", 1, 10)).await?;
    session.add_item(line("b", 1, 20)).await?;
    session.update_quantity("a", 5).await?;
    session.remove_item("b").await?;

    let stored = carts.load(&ctx).await?;
    assert_eq!(&stored, session.lines());
    assert_eq!(stored.get("a").unwrap().quantity(), 5);
    assert!(stored.get("b").is_none());
    assert_eq!(kv.get(GUEST_CART_KEY)?, None);

    repo.down.store(true, Ordering::SeqCst);
    assert!(session.add_item(line("c", 1, 1)).await.is_err());
    assert!(session.lines().get("c").is_none());

    repo.down.store(false, Ordering::SeqCst);
    session.clear().await?;
    assert!(carts.load(&ctx).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn sign_out_returns_to_the_guest_cart() -> anyhow::Result<()> {
    let carts = CartService::new(Arc::new(InMemoryCartRepository::new()), AuditLog::disabled());
    let kv = Arc::new(MemoryKeyValueStore::new());
    let mut session = CartSession::new(LocalCartStore::open(kv)?, carts.clone());

    session.sign_in(owner("u-1")).await?;
    session.add_item(line("a", 1, 10)).await?;
    session.sign_out();

    assert!(session.lines().is_empty());
    session.add_item(line("b", 1, 10)).await?;
    assert_eq!(carts.load(&owner("u-1")).await?.len(), 1);

    // a new sign-in merges the fresh guest line exactly once
    session.sign_in(owner("u-1")).await?;
    assert_eq!(session.lines().len(), 2);
    Ok(())
}

#[tokio::test]
async fn merged_guest_lines_left_in_storage_are_never_merged_again() -> anyhow::Result<()> {
    let carts = CartService::new(Arc::new(InMemoryCartRepository::new()), AuditLog::disabled());
    let kv = Arc::new(StickyStore::default());
    let mut session = CartSession::new(LocalCartStore::open(kv.clone())?, carts.clone());
    session.add_item(line("a", 2, 10)).await?;

    kv.stuck.store(true, Ordering::SeqCst);
    session.sign_in(owner("u-1")).await?;
    assert!(session.is_signed_in());
    assert!(session.has_stale_guest_cart());
    assert!(kv.get(GUEST_CART_KEY)?.is_some());

    // signed out with the stale copy still on disk: hidden, and not merged on the next sign-in
    session.sign_out();
    assert!(session.lines().is_empty());
    assert!(session.add_item(line("b", 1, 1)).await.is_err());
    session.sign_in(owner("u-1")).await?;
    assert_eq!(carts.load(&owner("u-1")).await?.get("a").unwrap().quantity(), 2);

    // the next successful mutation also finishes the pending clear
    kv.stuck.store(false, Ordering::SeqCst);
    session.add_item(line("c", 1, 3)).await?;
    assert!(!session.has_stale_guest_cart());
    assert_eq!(kv.get(GUEST_CART_KEY)?, None);

    session.sign_out();
    session.sign_in(owner("u-1")).await?;
    let stored = carts.load(&owner("u-1")).await?;
    assert_eq!(stored.get("a").unwrap().quantity(), 2);
    assert_eq!(stored.get("c").unwrap().quantity(), 1);
    Ok(())
}
