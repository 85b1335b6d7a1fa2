//! # App ABI - Typed Method Calls
//!
//! The ABI type system used to call into applications: type grammar, value
//! model, canonical binary codec, method selectors and contract interfaces.
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Types | `types.rs` | `AbiType` grammar, static/dynamic sizing |
//! | Values | `value.rs` | `AbiValue` and structural type checks |
//! | Codec | `codec.rs` | Canonical encode / decode |
//! | Methods | `method.rs` | Signatures, selectors, argument kinds |
//! | Contracts | `contract.rs` | ARC-4 / ARC-32 documents, method resolution |
//!
//! Everything here is pure: no I/O, no async.
//!
//! ## Usage Example
//!
//! ```
//! use app_abi::prelude::*;
//!
//! let method = Method::from_signature("hello(string)string").unwrap();
//! let ty = method.returns.clone().unwrap();
//! let bytes = encode(&ty, &AbiValue::from("world")).unwrap();
//! assert_eq!(decode(&ty, &bytes).unwrap(), AbiValue::from("world"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod contract;
pub mod errors;
pub mod method;
pub mod types;
pub mod value;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::codec::{decode, encode};
    pub use crate::contract::{AppSpec, ContractInterface, SpecSources, StateCounts};
    pub use crate::errors::AbiError;
    pub use crate::method::{
        ArgKind, Method, MethodArg, ReferenceType, TransactionType, SELECTOR_LEN, VOID,
    };
    pub use crate::types::AbiType;
    pub use crate::value::AbiValue;
    pub use primitive_types::U512;
}

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
