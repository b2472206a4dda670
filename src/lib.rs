//! Cubicle – a virtual office where task-driven agents live between jobs
//!
//! This crate simulates a small office floor:
//! - A fixed roster of agents that idle (desk, chat, coffee, lounge, ping-pong,
//!   corridor strolls) and react to external task events
//! - Corridor-and-door routing with local repulsion steering
//! - Exclusive spot reservations for amenities, game tables and meeting seats
//! - A token-validated invitation handshake and a periodic meeting scheduler
//! - An ingestion adapter that normalizes loosely-shaped task payloads
//!
//! The simulation is deterministic for a given seed and tick sequence.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Office simulation modules
pub mod office;

// Re-export key types for convenience
pub use office::{Office, OfficeConfig};

/// Current version of the Cubicle simulation
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
