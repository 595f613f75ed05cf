//! Device-side half of the cart: guest storage and the sign-in handover.

pub mod kv;
pub mod local_cart;
pub mod session;

pub use kv::{FileKeyValueStore, KeyValueStore, LocalStoreError, MemoryKeyValueStore};
pub use local_cart::{GUEST_CART_KEY, LocalCartStore};
pub use session::CartSession;
