use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, LockType, OnConflict},
};
use uuid::Uuid;

use crate::{
    entity::{
        cart_lines::{ActiveModel as LineActive, Column as LineCol, Entity as CartLines, Model as LineModel},
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
    },
    error::{AppError, AppResult},
    models::CartLine,
    repository::CartRepository,
    services::cart_merge,
};

#[derive(Clone)]
pub struct SeaOrmCartRepository {
    conn: DatabaseConnection,
}

impl SeaOrmCartRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl CartRepository for SeaOrmCartRepository {
    async fn load(&self, owner_id: &str) -> AppResult<Vec<CartLine>> {
        let cart = Carts::find()
            .filter(CartCol::OwnerId.eq(owner_id))
            .one(&self.conn)
            .await?;
        match cart {
            Some(cart) => lines_of(&self.conn, cart.id).await,
            None => Ok(Vec::new()),
        }
    }

    async fn replace(&self, owner_id: &str, lines: &[CartLine]) -> AppResult<()> {
        let txn = self.conn.begin().await?;
        let cart = lock_or_create_cart(&txn, owner_id).await?;
        write_lines(&txn, cart.id, lines).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn merge(&self, owner_id: &str, local: &[CartLine]) -> AppResult<Vec<CartLine>> {
        let txn = self.conn.begin().await?;
        let cart = lock_or_create_cart(&txn, owner_id).await?;
        let remote = lines_of(&txn, cart.id).await?;
        let merged = cart_merge::merge(local, &remote)?;
        write_lines(&txn, cart.id, &merged).await?;
        txn.commit().await?;
        Ok(merged)
    }

    async fn exists(&self, owner_id: &str) -> AppResult<bool> {
        let count = Carts::find()
            .filter(CartCol::OwnerId.eq(owner_id))
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }
}

/// Returns the owner's cart row locked for the rest of the transaction.
///
/// Concurrent first writes for one owner race on the unique `owner_id`; the loser's insert
/// becomes a no-op and it locks the winner's row.
async fn lock_or_create_cart(txn: &DatabaseTransaction, owner_id: &str) -> AppResult<CartModel> {
    let inserted = Carts::insert(CartActive {
        id: Set(Uuid::new_v4()),
        owner_id: Set(owner_id.to_string()),
        created_at: NotSet,
        updated_at: NotSet,
    })
    .on_conflict(OnConflict::column(CartCol::OwnerId).do_nothing().to_owned())
    .exec_without_returning(txn)
    .await?;
    if inserted > 0 {
        tracing::debug!(owner = owner_id, "cart created");
    }

    Carts::find()
        .filter(CartCol::OwnerId.eq(owner_id))
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("cart for {owner_id} missing after upsert")))
}

async fn lines_of<C: ConnectionTrait>(conn: &C, cart_id: Uuid) -> AppResult<Vec<CartLine>> {
    CartLines::find()
        .filter(LineCol::CartId.eq(cart_id))
        .order_by_asc(LineCol::Position)
        .all(conn)
        .await?
        .into_iter()
        .map(line_from_entity)
        .collect()
}

async fn write_lines(txn: &DatabaseTransaction, cart_id: Uuid, lines: &[CartLine]) -> AppResult<()> {
    CartLines::delete_many()
        .filter(LineCol::CartId.eq(cart_id))
        .exec(txn)
        .await?;

    if !lines.is_empty() {
        let rows = lines.iter().enumerate().map(|(position, line)| LineActive {
            id: Set(Uuid::new_v4()),
            cart_id: Set(cart_id),
            product_id: Set(line.product_id().to_string()),
            quantity: Set(line.quantity()),
            price: Set(line.price()),
            position: Set(position as i32),
        });
        CartLines::insert_many(rows).exec_without_returning(txn).await?;
    }

    let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
    Carts::update_many()
        .col_expr(CartCol::UpdatedAt, Expr::value(now))
        .filter(CartCol::Id.eq(cart_id))
        .exec(txn)
        .await?;

    Ok(())
}

fn line_from_entity(model: LineModel) -> AppResult<CartLine> {
    CartLine::new(model.product_id, model.quantity, model.price)
}
