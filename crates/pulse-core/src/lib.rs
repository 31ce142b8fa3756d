//! Core types and pure algorithms for the Pulse student-tracking service.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! attendance tallies, quiz grading and analytics live here as plain functions
//! over already-fetched records; storage backends implement
//! [`store::RecordStore`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod analytics;
pub mod attendance;
pub mod error;
pub mod grading;
pub mod health;
pub mod quiz;
pub mod store;
pub mod user;

pub use error::{Error, Result};
