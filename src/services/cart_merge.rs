//! Additive reconciliation of a guest cart into a persisted cart.

use std::collections::HashMap;

use crate::{error::AppResult, models::CartLine};

/// Folds `local` into `remote`.
///
/// The remote lines come first and keep their price; a local line for a product already
/// present only adds its quantity, any other local line is appended as is. Both inputs must
/// hold at most one line per product.
///
/// Not idempotent: merging the same local lines twice counts them twice, so callers clear
/// the local cart once the result is persisted.
///
/// Fails with `BadRequest` when a summed quantity does not fit in an `i32`.
pub fn merge(local: &[CartLine], remote: &[CartLine]) -> AppResult<Vec<CartLine>> {
    let mut merged: Vec<CartLine> = Vec::with_capacity(local.len() + remote.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(local.len() + remote.len());

    for line in remote.iter().chain(local) {
        match index.get(line.product_id()) {
            Some(&at) => merged[at].add_quantity(line.quantity())?,
            None => {
                index.insert(line.product_id().to_string(), merged.len());
                merged.push(line.clone());
            }
        }
    }

    Ok(merged)
}
