use std::sync::Arc;

use crate::{
    audit::AuditLog,
    error::AppResult,
    models::{CartLines, OwnerContext},
    repository::CartRepository,
};

/// Server side of the cart: read and wholesale replace, scoped to one owner.
///
/// Failures from the repository are returned as they are; nothing here retries.
#[derive(Clone)]
pub struct CartService {
    repo: Arc<dyn CartRepository>,
    audit: AuditLog,
}

impl CartService {
    pub fn new(repo: Arc<dyn CartRepository>, audit: AuditLog) -> Self {
        Self { repo, audit }
    }

    pub async fn load(&self, ctx: &OwnerContext) -> AppResult<CartLines> {
        let lines = self.repo.load(ctx.owner_id()).await?;
        tracing::debug!(owner = ctx.owner_id(), lines = lines.len(), "cart loaded");
        CartLines::try_from(lines)
    }

    pub async fn replace(&self, ctx: &OwnerContext, lines: CartLines) -> AppResult<CartLines> {
        self.repo.replace(ctx.owner_id(), lines.as_slice()).await?;
        tracing::info!(owner = ctx.owner_id(), lines = lines.len(), "cart replaced");

        if let Err(err) = self
            .audit
            .record(
                Some(ctx.owner_id()),
                "cart_replace",
                Some("carts"),
                Some(serde_json::json!({
                    "role": ctx.role().as_str(),
                    "lines": lines.len(),
                    "quantity": lines.total_quantity(),
                })),
            )
            .await
        {
            tracing::warn!(error = %err, "audit log failed");
        }

        Ok(lines)
    }

    pub async fn clear(&self, ctx: &OwnerContext) -> AppResult<()> {
        self.replace(ctx, CartLines::new()).await?;
        Ok(())
    }

    /// Folds a guest cart into the owner's persisted cart and stores the result.
    ///
    /// An empty guest cart is a plain read, so signing in never creates a cart on its own.
    pub async fn merge(&self, ctx: &OwnerContext, local: CartLines) -> AppResult<CartLines> {
        if local.is_empty() {
            return self.load(ctx).await;
        }

        let merged = self.repo.merge(ctx.owner_id(), local.as_slice()).await?;
        let merged = CartLines::try_from(merged)?;
        tracing::info!(
            owner = ctx.owner_id(),
            local_lines = local.len(),
            merged_lines = merged.len(),
            "guest cart merged"
        );

        if let Err(err) = self
            .audit
            .record(
                Some(ctx.owner_id()),
                "cart_merge",
                Some("carts"),
                Some(serde_json::json!({
                    "role": ctx.role().as_str(),
                    "local_lines": local.len(),
                    "merged_lines": merged.len(),
                })),
            )
            .await
        {
            tracing::warn!(error = %err, "audit log failed");
        }

        Ok(merged)
    }

    pub async fn exists(&self, ctx: &OwnerContext) -> AppResult<bool> {
        self.repo.exists(ctx.owner_id()).await
    }
}
