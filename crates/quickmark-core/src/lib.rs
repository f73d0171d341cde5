//! Core types and trait definitions for the QuickMark attendance backend.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! attendance engine talks to its collaborators only through the traits in
//! [`store`] and [`clock`]; storage backends and the HTTP layer depend on this
//! crate, never the other way around.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod calendar;
pub mod clock;
pub mod directory;
pub mod engine;
pub mod error;
pub mod record;
pub mod session;
pub mod store;

pub use engine::AttendanceEngine;
pub use error::{Error, Result};
