//! Core engine: pairing, the generation pipeline and reference refresh.

pub mod generator;
pub mod pairing;
pub mod refresher;

pub use generator::{GeneratorConfig, MatchupGenerator};
pub use pairing::pair_entities;
pub use refresher::ReferenceRefresher;
