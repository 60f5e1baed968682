//! Core types and trait definitions for the patrol scheduling engine.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the domain model (incidents, staff, patrol groups), the two pure decision
//! procedures every backend must route its writes through
//! ([`conflict::ConflictDetector`] and [`sync`]), and the
//! [`store::PatrolStore`] abstraction.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod conflict;
pub mod error;
pub mod incident;
pub mod patrol;
pub mod staff;
pub mod store;
pub mod sync;
pub mod window;

pub use error::{Error, Result};
