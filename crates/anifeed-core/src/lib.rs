//! # anifeed-core
//!
//! Core types, collaborator traits, configuration, and error handling for anifeed.

pub mod activity;
pub mod config;
pub mod error;
pub mod message;
pub mod traits;

pub use config::shellexpand;
