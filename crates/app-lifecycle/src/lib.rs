//! # App Lifecycle - Application Transactions & Method Calls
//!
//! Turns intents ("create this application", "call method X with these
//! arguments") into correctly shaped transactions, submits them and waits,
//! round by round, for the network to confirm them.
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Builder | `domain/builder.rs` | Unsigned envelopes, admission limits |
//! | Encoding | `domain/encoding.rs` | Canonical msgpack, ids, group ids |
//! | Signer | `domain/signer.rs` | Ed25519 over `"TX" \|\| bytes` |
//! | Compiler | `compiler.rs` | Program source to bytecode via the node |
//! | Confirmation | `confirmation.rs` | Broadcast, round-budgeted waiting |
//! | Composer | `composer/` | ABI method calls in atomic groups |
//! | Service | `service.rs` | Lifecycle operations end to end |
//!
//! ## Ports
//!
//! | Trait | Direction | Adapter |
//! |-------|-----------|---------|
//! | `ApplicationLifecycleApi` | inbound | `ApplicationLifecycleService` |
//! | `AlgodApi` | outbound | `InMemoryAlgod` |
//! | `CredentialSource` | outbound | `StaticCredentials` |
//!
//! ## Failure Semantics
//!
//! - Validation, compile, credential and signer errors happen before
//!   anything is broadcast.
//! - A broadcast error is terminal; the same envelope is never resent.
//! - A confirmation timeout is ambiguous: the transaction may still land.
//!   [`errors::LifecycleError::is_ambiguous`] tells callers to re-query.
//!
//! ## Usage Example
//!
//! ```ignore
//! use app_lifecycle::prelude::*;
//!
//! let service = ApplicationLifecycleService::new(network, LifecycleConfig::from_env());
//! let app = service.create_app(&account, CreateAppRequest::new(approval, clear)).await?;
//! service.opt_in(&account, app.app_id).await?;
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod compiler;
pub mod composer;
pub mod config;
pub mod confirmation;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod ports;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain
    pub use crate::domain::builder::{build, build_payment, limits, AppOperation, CallParams};
    pub use crate::domain::entities::{
        ApplicationInfo, ConfirmationResult, LocalState, SignedEnvelope, StateEntry, StateValue,
        TransactionEnvelope,
    };
    pub use crate::domain::signer::{sign, verify, Account};
    pub use crate::domain::value_objects::{
        BoxReference, CompiledProgram, NetworkParams, OnComplete, OperationKind, ProgramRole,
        StateSchema,
    };

    // Components
    pub use crate::compiler::{compile, compile_pair};
    pub use crate::composer::{
        AtomicGroup, ComposerStatus, GroupExecution, MethodArgValue, MethodCallRequest,
        MethodResult, RETURN_LOG_PREFIX,
    };
    pub use crate::config::{ConfirmationConfig, LifecycleConfig};
    pub use crate::confirmation::ConfirmationEngine;
    pub use crate::service::{ApplicationLifecycleService, ServiceStats};

    // Ports and adapters
    pub use crate::adapters::{InMemoryAlgod, StaticCredentials};
    pub use crate::ports::inbound::{ApplicationLifecycleApi, CreateAppRequest, CreatedApp};
    pub use crate::ports::outbound::{AlgodApi, CredentialSource};

    // Errors
    pub use crate::errors::{
        BroadcastError, CompileError, ComposerError, ConfirmationError, CredentialError,
        LifecycleError, NetworkError, ReturnDecodeError, SignerError, StageError,
        ValidationError,
    };

    pub use shared_types::{Address, ApplicationId, AssetId, TransactionId};
}

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
