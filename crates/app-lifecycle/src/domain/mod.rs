//! # Domain Layer
//!
//! Pure lifecycle logic: envelopes, their canonical bytes, validation and
//! signing. No I/O.

pub mod builder;
pub mod encoding;
pub mod entities;
pub mod signer;
pub mod value_objects;

pub use builder::{build, build_payment, limits, AppOperation, CallParams};
pub use entities::*;
pub use signer::{sign, verify, Account};
pub use value_objects::*;
