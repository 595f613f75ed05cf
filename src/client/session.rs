use crate::{
    client::{kv::KeyValueStore, local_cart::LocalCartStore},
    error::AppResult,
    models::{CartLine, CartLines, OwnerContext, require_owner},
    services::CartService,
};

/// Client-side cart that follows the user across sign-in.
///
/// As a guest every change lands in the local store. After [`CartSession::sign_in`] the guest
/// cart is merged into the owner's persisted cart once and every later change is a full
/// replace of the remote cart. Taking `&mut self` keeps the merge-then-clear sequence from
/// interleaving with other mutations of the same session.
///
/// Guest lines that were merged but could not be removed from the local store are never
/// merged or shown again; the removal is retried on every later call until it succeeds.
pub struct CartSession<S> {
    local: LocalCartStore<S>,
    carts: CartService,
    owner: Option<OwnerContext>,
    remote: CartLines,
    merged_guest_pending: bool,
}

impl<S: KeyValueStore> CartSession<S> {
    pub fn new(local: LocalCartStore<S>, carts: CartService) -> Self {
        Self {
            local,
            carts,
            owner: None,
            remote: CartLines::new(),
            merged_guest_pending: false,
        }
    }

    pub fn owner(&self) -> Option<&OwnerContext> {
        self.owner.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.owner.is_some()
    }

    /// Lines the user currently sees.
    pub fn lines(&self) -> &CartLines {
        if self.owner.is_some() || self.merged_guest_pending {
            &self.remote
        } else {
            self.local.lines()
        }
    }

    /// Whether already merged guest lines are still waiting to be removed from the local store.
    pub fn has_stale_guest_cart(&self) -> bool {
        self.merged_guest_pending
    }

    pub fn local(&self) -> &LocalCartStore<S> {
        &self.local
    }

    /// Merges the guest cart into the owner's cart.
    ///
    /// Signing in again as the current owner does nothing. On failure the guest cart is kept
    /// as it was and the session stays signed out, so the next attempt merges the same lines.
    pub async fn sign_in(&mut self, ctx: OwnerContext) -> AppResult<&CartLines> {
        if self.owner.as_ref() == Some(&ctx) {
            return Ok(&self.remote);
        }

        let guest = match self.settle_local() {
            Ok(()) => self.local.lines().clone(),
            Err(err) => {
                tracing::warn!(error = %err, "stale guest cart still present, skipping merge");
                CartLines::new()
            }
        };

        let merged = match self.carts.merge(&ctx, guest).await {
            Ok(merged) => merged,
            Err(err) => {
                tracing::warn!(owner = ctx.owner_id(), error = %err, "guest cart merge failed");
                return Err(err);
            }
        };

        self.owner = Some(ctx);
        self.remote = merged;
        // the remote cart now holds the guest lines whether or not they leave the local store
        self.merged_guest_pending = true;
        if let Err(err) = self.settle_local() {
            tracing::error!(error = %err, "could not clear guest cart after merge");
        }
        Ok(&self.remote)
    }

    pub fn sign_out(&mut self) {
        self.owner = None;
        self.remote = CartLines::new();
        if let Err(err) = self.settle_local() {
            tracing::warn!(error = %err, "guest cart clear retry failed");
        }
    }

    pub async fn add_item(&mut self, line: CartLine) -> AppResult<()> {
        if self.owner.is_none() {
            self.settle_local()?;
            return self.local.add_item(line);
        }
        let mut next = self.remote.clone();
        next.add(line)?;
        self.push(next).await
    }

    pub async fn update_quantity(&mut self, product_id: &str, quantity: i32) -> AppResult<()> {
        if self.owner.is_none() {
            self.settle_local()?;
            return self.local.update_quantity(product_id, quantity);
        }
        if self.remote.get(product_id).is_none() {
            return Ok(());
        }
        let mut next = self.remote.clone();
        next.set_quantity(product_id, quantity)?;
        self.push(next).await
    }

    pub async fn remove_item(&mut self, product_id: &str) -> AppResult<()> {
        if self.owner.is_none() {
            self.settle_local()?;
            return self.local.remove_item(product_id);
        }
        let mut next = self.remote.clone();
        if !next.remove(product_id) {
            return Ok(());
        }
        self.push(next).await
    }

    pub async fn clear(&mut self) -> AppResult<()> {
        if self.owner.is_none() {
            self.settle_local()?;
            return self.local.clear();
        }
        self.push(CartLines::new()).await
    }

    async fn push(&mut self, next: CartLines) -> AppResult<()> {
        let ctx = require_owner(self.owner.as_ref())?;
        self.remote = self.carts.replace(ctx, next).await?;
        if let Err(err) = self.settle_local() {
            tracing::warn!(error = %err, "guest cart clear retry failed");
        }
        Ok(())
    }

    /// Removes guest lines that were already merged, if any are left behind.
    fn settle_local(&mut self) -> AppResult<()> {
        if self.merged_guest_pending {
            self.local.clear()?;
            self.merged_guest_pending = false;
        }
        Ok(())
    }
}
