//! # ABI Method Call Composer
//!
//! Method calls go through three phases:
//!
//! 1. **Resolution**: find the method in a contract interface and check the
//!    arguments against its declaration ([`resolve`]).
//! 2. **Encoding**: selector, encoded arguments and reference indices
//!    ([`encode_call`]).
//! 3. **Execution**: an [`AtomicGroup`] builds, signs, broadcasts and confirms
//!    the calls, then decodes each return value from the call's logs.
//!
//! Resolution and encoding are pure, so a bad call never reaches the network.

pub mod group;
pub mod request;

pub use group::{decode_return, AtomicGroup, ComposerStatus, GroupExecution, MethodResult};
pub use request::{
    check_arguments, encode_call, resolve, EncodedCall, MethodArgValue, MethodCallRequest,
    MAX_ABI_APP_ARGS,
};

/// Prefix of the log record that carries a method's return value.
pub const RETURN_LOG_PREFIX: [u8; 4] = [0x15, 0x1f, 0x7c, 0x75];
