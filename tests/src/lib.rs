//! # App Lifecycle Test Suite
//!
//! Cross-crate flows run against the in-memory network.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs       # Contracts, programs, service setup
//!     ├── lifecycle.rs      # create → opt-in → call → update → close-out → delete
//!     ├── method_calls.rs   # ABI calls and atomic groups
//!     └── failures.rs       # Rejections, timeouts, cancellation, bad input
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p app-tests
//! cargo test -p app-tests integration::method_calls::
//! ```

pub mod integration;
