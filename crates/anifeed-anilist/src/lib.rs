//! # anifeed-anilist
//!
//! AniList GraphQL implementation of the `ActivitySource` trait.
//! Docs: <https://docs.anilist.co/>

mod client;
mod queries;
mod types;


pub use client::AniListClient;
