//! FPL Duel: head-to-head matchup and betting backend.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod sources;
pub mod storage;
pub mod engine;
pub mod api;
