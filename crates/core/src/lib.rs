//! `tidemark-core` -- pure domain logic for the achievement checklist and
//! the ship upgrade calculator.
//!
//! Nothing in this crate performs I/O. The sync engine, REST client and
//! persistence live in `tidemark-client`.

pub mod achievement;
pub mod calculator;
pub mod error;
pub mod pending;
pub mod resources;
pub mod ships;
pub mod types;
pub mod validation;
