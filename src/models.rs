use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Unknown role tags fall back to the least privileged role.
    pub fn from_tag(tag: &str) -> Self {
        if tag.eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Identity a cart operation runs on behalf of.
///
/// Handed over by the identity provider and passed explicitly into every remote cart call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerContext {
    owner_id: String,
    role: Role,
}

impl OwnerContext {
    pub fn new(owner_id: impl Into<String>, role: Role) -> AppResult<Self> {
        let owner_id = owner_id.into();
        if owner_id.trim().is_empty() {
            return Err(AppError::Unauthenticated);
        }
        Ok(Self { owner_id, role })
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

/// Refuses remote cart work when nobody is signed in.
pub fn require_owner(ctx: Option<&OwnerContext>) -> AppResult<&OwnerContext> {
    ctx.ok_or(AppError::Unauthenticated)
}

/// One product entry in a cart. Only constructible in a valid shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    product_id: String,
    quantity: i32,
    price: Decimal,
}

impl CartLine {
    pub fn new(product_id: impl Into<String>, quantity: i32, price: Decimal) -> AppResult<Self> {
        let product_id = product_id.into().trim().to_string();
        if product_id.is_empty() {
            return Err(AppError::BadRequest("productId must not be empty".into()));
        }
        if quantity <= 0 {
            return Err(AppError::BadRequest(
                "quantity must be greater than 0".to_string(),
            ));
        }
        if price < Decimal::ZERO {
            return Err(AppError::BadRequest("price must not be negative".into()));
        }
        Ok(Self {
            product_id,
            quantity,
            price,
        })
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn quantity(&self) -> i32 {
        self.quantity
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }

    /// Adds `extra` units. A sum past `i32::MAX` is refused and the line is left as it was.
    pub fn add_quantity(&mut self, extra: i32) -> AppResult<()> {
        let sum = self.quantity.checked_add(extra).filter(|sum| *sum > 0);
        let Some(sum) = sum else {
            return Err(AppError::BadRequest(format!(
                "quantity of {} cannot grow by {extra}",
                self.product_id
            )));
        };
        self.quantity = sum;
        Ok(())
    }

    fn set_quantity(&mut self, quantity: i32) -> AppResult<()> {
        if quantity <= 0 {
            return Err(AppError::BadRequest(
                "quantity must be greater than 0".to_string(),
            ));
        }
        self.quantity = quantity;
        Ok(())
    }
}

/// Ordered cart content holding at most one line per product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartLines(Vec<CartLine>);

impl CartLines {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn as_slice(&self) -> &[CartLine] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, product_id: &str) -> Option<&CartLine> {
        self.0.iter().find(|l| l.product_id == product_id)
    }

    /// Adds to the quantity of an existing line for the same product, otherwise appends.
    pub fn add(&mut self, line: CartLine) -> AppResult<()> {
        match self.0.iter_mut().find(|l| l.product_id == line.product_id) {
            Some(existing) => existing.add_quantity(line.quantity)?,
            None => self.0.push(line),
        }
        Ok(())
    }

    pub fn set_quantity(&mut self, product_id: &str, quantity: i32) -> AppResult<()> {
        let line = self
            .0
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or(AppError::NotFound)?;
        line.set_quantity(quantity)
    }

    /// Returns whether a line was removed.
    pub fn remove(&mut self, product_id: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|l| l.product_id != product_id);
        self.0.len() != before
    }

    pub fn total_quantity(&self) -> i64 {
        self.0.iter().map(|l| i64::from(l.quantity)).sum()
    }

    pub fn subtotal(&self) -> Decimal {
        self.0.iter().map(CartLine::line_total).sum()
    }
}

impl TryFrom<Vec<CartLine>> for CartLines {
    type Error = AppError;

    fn try_from(lines: Vec<CartLine>) -> Result<Self, Self::Error> {
        let mut seen = HashSet::with_capacity(lines.len());
        for line in &lines {
            if !seen.insert(line.product_id.as_str()) {
                return Err(AppError::BadRequest(format!(
                    "duplicate productId {} in cart",
                    line.product_id
                )));
            }
        }
        Ok(Self(lines))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    InStock,
}

/// Attributes needed to stock a product variant for the first time.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewWarehouseItem {
    pub product_id: String,
    pub variant_id: String,
    pub sku: String,
    pub product_name: String,
    pub color: Option<String>,
    pub size: Option<String>,
    #[serde(default)]
    pub location: String,
    pub current_stock: i32,
    #[serde(default)]
    pub reserved_stock: i32,
    #[serde(default)]
    pub reorder_level: i32,
}

/// Stock record for one (product, variant). Counts change only through
/// [`WarehouseItem::apply_adjustment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseItem {
    pub id: Uuid,
    pub product_id: String,
    pub variant_id: String,
    pub sku: String,
    pub product_name: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub location: String,
    pub last_updated: DateTime<Utc>,
    current_stock: i32,
    reserved_stock: i32,
    reorder_level: i32,
}

impl WarehouseItem {
    pub fn new(id: Uuid, item: NewWarehouseItem, last_updated: DateTime<Utc>) -> AppResult<Self> {
        let NewWarehouseItem {
            product_id,
            variant_id,
            sku,
            product_name,
            color,
            size,
            location,
            current_stock,
            reserved_stock,
            reorder_level,
        } = item;

        if product_id.trim().is_empty() || variant_id.trim().is_empty() {
            return Err(AppError::BadRequest(
                "productId and variantId must not be empty".into(),
            ));
        }
        if current_stock < 0 || reserved_stock < 0 || reorder_level < 0 {
            return Err(AppError::BadRequest(
                "stock counts and reorder level must not be negative".into(),
            ));
        }
        if reserved_stock > current_stock {
            return Err(AppError::BadRequest(
                "reserved stock cannot exceed current stock".into(),
            ));
        }

        Ok(Self {
            id,
            product_id: product_id.trim().to_string(),
            variant_id: variant_id.trim().to_string(),
            sku,
            product_name,
            color,
            size,
            location,
            last_updated,
            current_stock,
            reserved_stock,
            reorder_level,
        })
    }

    pub fn current_stock(&self) -> i32 {
        self.current_stock
    }

    pub fn reserved_stock(&self) -> i32 {
        self.reserved_stock
    }

    pub fn reorder_level(&self) -> i32 {
        self.reorder_level
    }

    pub fn available_stock(&self) -> i32 {
        self.current_stock - self.reserved_stock
    }

    pub fn status(&self) -> StockStatus {
        let available = self.available_stock();
        if available <= 0 {
            StockStatus::OutOfStock
        } else if available <= self.reorder_level {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn is_low_stock(&self) -> bool {
        self.status() != StockStatus::InStock
    }

    /// Moves current (and with it available) stock by `delta`. Reserved stock is untouched.
    ///
    /// Rejects, without modifying anything, an adjustment that would take current stock
    /// below zero or below the reserved quantity.
    pub fn apply_adjustment(&mut self, delta: i32) -> AppResult<()> {
        let next = self
            .current_stock
            .checked_add(delta)
            .filter(|next| *next >= 0 && *next >= self.reserved_stock)
            .ok_or(AppError::InvalidAdjustment {
                current: self.current_stock,
                reserved: self.reserved_stock,
                delta,
            })?;
        self.current_stock = next;
        self.last_updated = Utc::now();
        Ok(())
    }

    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.product_name.to_lowercase().contains(&query)
            || self.sku.to_lowercase().contains(&query)
            || self.location.to_lowercase().contains(&query)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseStats {
    pub total_items: i64,
    pub low_stock_items: i64,
    pub total_stock: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(current: i32, reserved: i32, reorder: i32) -> WarehouseItem {
        WarehouseItem::new(
            Uuid::new_v4(),
            NewWarehouseItem {
                product_id: "tee".into(),
                variant_id: "tee-red-m".into(),
                sku: "TEE-RED-M".into(),
                product_name: "Basic Tee".into(),
                color: Some("red".into()),
                size: Some("M".into()),
                location: "A-01".into(),
                current_stock: current,
                reserved_stock: reserved,
                reorder_level: reorder,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn cart_line_rejects_malformed_shapes() {
        assert!(CartLine::new("  ", 1, Decimal::ONE).is_err());
        assert!(CartLine::new("p1", 0, Decimal::ONE).is_err());
        assert!(CartLine::new("p1", 1, Decimal::NEGATIVE_ONE).is_err());
        let line = CartLine::new(" p1 ", 2, Decimal::ZERO).unwrap();
        assert_eq!(line.product_id(), "p1");
    }

    #[test]
    fn cart_lines_reject_duplicate_products() {
        let lines = vec![
            CartLine::new("p1", 1, Decimal::ONE).unwrap(),
            CartLine::new("p1", 3, Decimal::ONE).unwrap(),
        ];
        assert!(matches!(
            CartLines::try_from(lines),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn cart_lines_add_sums_quantity_and_keeps_order() {
        let mut lines = CartLines::new();
        lines.add(CartLine::new("p1", 1, Decimal::new(500, 2)).unwrap()).unwrap();
        lines.add(CartLine::new("p2", 1, Decimal::new(250, 2)).unwrap()).unwrap();
        lines.add(CartLine::new("p1", 2, Decimal::new(999, 2)).unwrap()).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines.as_slice()[0].quantity(), 3);
        assert_eq!(lines.as_slice()[0].price(), Decimal::new(500, 2));
        assert_eq!(lines.subtotal(), Decimal::new(1750, 2));
        assert!(lines.set_quantity("p2", 0).is_err());
        assert!(matches!(lines.set_quantity("p9", 1), Err(AppError::NotFound)));
        assert!(lines.remove("p2"));
        assert!(!lines.remove("p2"));
    }

    #[test]
    fn quantity_overflow_is_refused() {
        let mut lines = CartLines::new();
        lines.add(CartLine::new("p1", i32::MAX, Decimal::ONE).unwrap()).unwrap();
        assert!(matches!(
            lines.add(CartLine::new("p1", 1, Decimal::ONE).unwrap()),
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(lines.get("p1").unwrap().quantity(), i32::MAX);

        let mut line = CartLine::new("p2", 3, Decimal::ONE).unwrap();
        assert!(line.add_quantity(-3).is_err());
        assert_eq!(line.quantity(), 3);
    }

    #[test]
    fn owner_context_keeps_its_role() {
        let admin = OwnerContext::new("u-1", Role::Admin).unwrap();
        assert_eq!(admin.role(), Role::Admin);
        assert_eq!(admin.owner_id(), "u-1");
        assert!(matches!(
            OwnerContext::new(" ", Role::User),
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn status_is_derived_from_available_stock() {
        assert_eq!(item(0, 0, 3).status(), StockStatus::OutOfStock);
        assert_eq!(item(5, 5, 3).status(), StockStatus::OutOfStock);
        assert_eq!(item(3, 0, 3).status(), StockStatus::LowStock);
        assert_eq!(item(10, 6, 3).status(), StockStatus::InStock);
    }

    #[test]
    fn adjustment_moves_current_and_available_together() {
        let mut it = item(5, 1, 3);
        it.apply_adjustment(-2).unwrap();
        assert_eq!(it.current_stock(), 3);
        assert_eq!(it.reserved_stock(), 1);
        assert_eq!(it.available_stock(), 2);
        assert_eq!(it.status(), StockStatus::LowStock);
    }

    #[test]
    fn adjustment_below_zero_or_reserved_is_rejected() {
        let mut it = item(5, 0, 3);
        assert!(matches!(
            it.apply_adjustment(-10),
            Err(AppError::InvalidAdjustment { current: 5, delta: -10, .. })
        ));
        assert_eq!(it.current_stock(), 5);

        let mut reserved = item(5, 4, 0);
        assert!(reserved.apply_adjustment(-2).is_err());
        assert_eq!(reserved.current_stock(), 5);

        let mut huge = item(5, 0, 0);
        assert!(huge.apply_adjustment(i32::MAX).is_err());
    }

    #[test]
    fn new_item_validates_counts() {
        let bad = NewWarehouseItem {
            product_id: "tee".into(),
            variant_id: "v".into(),
            sku: "S".into(),
            product_name: "Tee".into(),
            color: None,
            size: None,
            location: String::new(),
            current_stock: 1,
            reserved_stock: 2,
            reorder_level: 0,
        };
        assert!(WarehouseItem::new(Uuid::new_v4(), bad, Utc::now()).is_err());
    }
}
