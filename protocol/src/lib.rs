// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ecobasket Protocol — Credit Primitives
//!
//! The foundation the basket engine stands on. Nothing in here knows what a
//! basket is; it only knows about credit batches, where bytes are stored,
//! and how value moves between holders.
//!
//! ## Architecture
//!
//! - **config** — Protocol constants: exponents, limits, basis points.
//! - **credit** — Batch metadata, denom formats, decimal scaling.
//! - **storage** — Key-value abstraction with memory, overlay, and sled backends.
//! - **bank** — Interfaces to the external credit and token ledgers, plus an
//!   in-memory reference bank.
//! - **logging** — `tracing` subscriber bootstrap for embedders and tests.
//!
//! ## Design Philosophy
//!
//! 1. All amounts are `u64` integers in smallest units. No floats, ever.
//! 2. Every conversion between precisions is checked. Overflow is an error.
//! 3. Storage is injected. The engine never assumes a particular database.

pub mod bank;
pub mod config;
pub mod credit;
pub mod logging;
pub mod storage;
