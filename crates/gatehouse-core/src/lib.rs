//! Core types and trait definitions for the Gatehouse package validation
//! pipeline.
//!
//! This crate models the client-facing side of asynchronous package
//! validation: starting validation, deciding whether a run is overdue, and
//! reconstructing the issues a failed package should surface to its owner.
//! It is deliberately free of database dependencies; storage backends (e.g.
//! `gatehouse-store-sqlite`) implement the traits in [`store`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod config;
pub mod error;
pub mod issue;
pub mod package;
pub mod reader;
pub mod store;
pub mod telemetry;
pub mod validation;

pub use error::{Error, Result};
pub use reader::{ValidationStatusReader, ValidationStatusReaderBuilder};
