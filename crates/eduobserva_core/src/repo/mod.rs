//! Persistence layer: key-value blob storage and the observation record store.
//!
//! # Responsibility
//! - Define the key-value contract standing in for browser local storage.
//! - Keep SQL and serialization details out of workflow/scoring code.
//!
//! # Invariants
//! - A blob is always written whole with one statement.
//! - The record store's in-memory list equals its persisted list after every
//!   successful load or append.

pub mod kv_store;
pub mod record_store;
