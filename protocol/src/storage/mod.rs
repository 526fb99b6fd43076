//! # Storage Module
//!
//! A plain key-value abstraction that the basket engine writes through.
//! The engine never talks to a database directly; it is handed something
//! that implements [`KvStore`] and lives with whatever ordering and
//! durability that backend offers.
//!
//! ## Architecture
//!
//! ```text
//! kv.rs     — KvRead / KvStore traits, typed bincode helpers, MemStore
//! cache.rs  — CacheStore: buffered writes over any store, commit or drop
//! db.rs     — SledStore: persistent sled tree with atomic batch commits
//! ```
//!
//! ## Transactions
//!
//! ```text
//! engine op ──► CacheStore (buffer) ──commit──► MemStore / SledStore
//!                    │
//!                    └── dropped on error: nothing reaches the backend
//! ```
//!
//! ## Design Decisions
//!
//! 1. **Keys are ordered bytes.** `scan_prefix` always yields entries in
//!    lexicographic key order, so a well-chosen key encoding doubles as an
//!    index.
//!
//! 2. **Bincode for values.** Compact and deterministic. JSON is for
//!    configuration and debugging, not for stored records.

pub mod cache;
pub mod db;
pub mod kv;

pub use cache::CacheStore;
pub use kv::{KvRead, KvStore, MemStore, StoreError, StoreResult, TypedKv, WriteOp};
pub use db::SledStore;
