//! # anifeed-channels
//!
//! Messaging platform integrations: command intake and notification delivery.

pub mod telegram;
