//! Goal Bracket: rank personal goals through a single-elimination tournament.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod engine;
pub mod identity;
pub mod storage;
pub mod api;
