//! Reflexion Memory - episodic and causal memory for autonomous agents
//!
//! A file-backed store that remembers what happened across working
//! sessions and learns from recurring cause-effect relationships.
//!
//! # Architecture
//!
//! - **Schema Validator**: structural checks before anything is persisted
//! - **Episode Store**: one JSON file per session
//! - **Causal Graph**: shared nodes and weighted edges, with path search
//! - **Pattern Library**: trigger -> action rules with tracked success rates
//!
//! Every mutating call is a full read-modify-write of a single file with
//! no locking, so only one writer process should be active at a time.

pub mod errors;
pub mod config;
pub mod schema;
pub mod memory;
pub mod cli;

// Re-export commonly used types
pub use config::MemoryConfig;
pub use errors::{ErrorKind, MemoryError, Result};
pub use memory::ReflexionMemory;
