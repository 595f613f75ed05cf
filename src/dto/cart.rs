use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{CartLine, CartLines},
};

/// Wire shape of one cart line, shared by the HTTP API and the local cart store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CartLineDto {
    pub product_id: String,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub price: Decimal,
}

impl From<&CartLine> for CartLineDto {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id().to_string(),
            quantity: line.quantity(),
            price: line.price(),
        }
    }
}

impl TryFrom<CartLineDto> for CartLine {
    type Error = AppError;

    fn try_from(dto: CartLineDto) -> Result<Self, Self::Error> {
        CartLine::new(dto.product_id, dto.quantity, dto.price)
    }
}

/// Validates a batch of wire lines into a cart: every line well-formed, no product twice.
pub fn lines_from_dto(items: Vec<CartLineDto>) -> AppResult<CartLines> {
    let lines = items
        .into_iter()
        .map(CartLine::try_from)
        .collect::<AppResult<Vec<_>>>()?;
    CartLines::try_from(lines)
}

pub fn lines_to_dto(lines: &CartLines) -> Vec<CartLineDto> {
    lines.as_slice().iter().map(CartLineDto::from).collect()
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CartSyncRequest {
    pub items: Vec<CartLineDto>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartLineDto>,
    pub total_quantity: i64,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub subtotal: Decimal,
}

impl From<&CartLines> for CartView {
    fn from(lines: &CartLines) -> Self {
        Self {
            items: lines_to_dto(lines),
            total_quantity: lines.total_quantity(),
            subtotal: lines.subtotal(),
        }
    }
}
