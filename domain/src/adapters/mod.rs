//! In-process adapters that live inside the domain crate for convenience.
//!
//! These back unit tests and local demos. The durable key space (SQLite) and
//! the HTTP remote live in separate adapter crates.

pub mod memory_storage;
pub mod static_remote;
