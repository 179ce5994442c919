//! # anifeed-store
//!
//! Durable subscription registry (SQLite-backed) and the profile cache policy
//! layered on top of it.

pub mod profile;
pub mod store;

pub use store::{Store, Subscription};
