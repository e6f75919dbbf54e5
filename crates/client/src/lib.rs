//! `tidemark-client` -- the I/O half of Tidemark.
//!
//! Talks to the checklist backend over HTTP ([`api`]), keeps small string
//! values in a durable key-value store ([`store`]), buffers and flushes
//! achievement progress ([`sync`]), manages the signed-in identity
//! ([`session`]) and persists the ship calculator state ([`planner`]).

pub mod api;
pub mod config;
pub mod error;
pub mod planner;
pub mod session;
pub mod store;
pub mod sync;

pub use error::{ClientError, RejectCode};
pub use sync::{Identity, SyncEngine};
