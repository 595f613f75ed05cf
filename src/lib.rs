//! Cart reconciliation and warehouse ledger service.
//!
//! Guest carts live client-side in a [`client::LocalCartStore`] and are merged into the
//! signed-in owner's persisted cart exactly once per sign-in. The warehouse ledger applies
//! signed stock adjustments under a per-item lock and derives stock status at read time.

pub mod audit;
pub mod client;
pub mod config;
pub mod db;
pub mod dto;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
