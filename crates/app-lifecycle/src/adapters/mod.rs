//! # Adapters Layer
//!
//! Concrete implementations of the outbound ports.

pub mod credentials;
pub mod in_memory;

pub use credentials::StaticCredentials;
pub use in_memory::{InMemoryAlgod, LogFn, NetworkStats, GENESIS_ID};
