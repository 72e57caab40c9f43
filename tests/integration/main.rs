//! Integration tests: the generation pipeline and ledgers against an
//! in-memory SQLite database with deterministic in-process collaborators.

mod generation;
mod ledger;
mod mock_sources;
