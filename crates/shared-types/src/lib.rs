//! # Shared Types Crate
//!
//! Network primitives used by every crate in the workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: addresses, digests and identifiers are
//!   defined once, with one binary and one text form each.
//! - **Domain Separation**: every hash is taken over a prefixed message
//!   (`TX`, `TG`, `appID`, ...), see [`hashing`].

pub mod entities;
pub mod errors;
pub mod hashing;

pub use entities::*;
pub use errors::*;
pub use hashing::{hash_with_prefix, sha512_256, Digest};
