use crate::{
    client::kv::{KeyValueStore, LocalStoreError},
    dto::cart::{CartLineDto, lines_from_dto, lines_to_dto},
    error::AppResult,
    models::{CartLine, CartLines},
};

pub const GUEST_CART_KEY: &str = "guest_cart";

/// Guest cart kept in device-local storage.
///
/// The value is read once when the store is opened and written through on every mutation,
/// so the in-memory copy and the persisted value never diverge after a successful call.
pub struct LocalCartStore<S> {
    store: S,
    key: String,
    lines: CartLines,
}

impl<S: KeyValueStore> LocalCartStore<S> {
    pub fn open(store: S) -> AppResult<Self> {
        Self::open_namespaced(store, GUEST_CART_KEY)
    }

    pub fn open_namespaced(store: S, key: impl Into<String>) -> AppResult<Self> {
        let key = key.into();
        let lines = match store.get(&key)? {
            Some(raw) => match decode(&raw) {
                Some(lines) => lines,
                None => {
                    tracing::warn!(key = %key, "discarding unreadable guest cart");
                    CartLines::new()
                }
            },
            None => CartLines::new(),
        };
        Ok(Self { store, key, lines })
    }

    pub fn lines(&self) -> &CartLines {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn add_item(&mut self, line: CartLine) -> AppResult<()> {
        let mut next = self.lines.clone();
        next.add(line)?;
        self.commit(next)
    }

    /// Sets the quantity of an existing line. A product that is not in the cart is left alone.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i32) -> AppResult<()> {
        if self.lines.get(product_id).is_none() {
            return Ok(());
        }
        let mut next = self.lines.clone();
        next.set_quantity(product_id, quantity)?;
        self.commit(next)
    }

    pub fn remove_item(&mut self, product_id: &str) -> AppResult<()> {
        let mut next = self.lines.clone();
        if !next.remove(product_id) {
            return Ok(());
        }
        self.commit(next)
    }

    pub fn replace_all(&mut self, lines: CartLines) -> AppResult<()> {
        self.commit(lines)
    }

    /// Empties the cart and removes the persisted key altogether.
    pub fn clear(&mut self) -> AppResult<()> {
        self.store.remove(&self.key)?;
        self.lines = CartLines::new();
        Ok(())
    }

    fn commit(&mut self, next: CartLines) -> AppResult<()> {
        let raw = serde_json::to_string(&lines_to_dto(&next)).map_err(LocalStoreError::from)?;
        self.store.set(&self.key, &raw)?;
        self.lines = next;
        Ok(())
    }
}

fn decode(raw: &str) -> Option<CartLines> {
    let items: Vec<CartLineDto> = serde_json::from_str(raw).ok()?;
    lines_from_dto(items).ok()
}
