//! # Error Types
//!
//! One enum per stage of the lifecycle. `LifecycleError` and `ComposerError`
//! aggregate them for the orchestration layers. Nothing here is retried by
//! the core; every failure is surfaced to the caller.

use crate::domain::value_objects::{OperationKind, ProgramRole};
use app_abi::errors::AbiError;
use shared_types::{Address, ApplicationId, Round, TransactionId};
use thiserror::Error;

// =============================================================================
// VALIDATION (pure, before any I/O)
// =============================================================================

/// A transaction envelope could not be built from the given inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Non-create operations need a real application id.
    #[error("{kind} requires an application id")]
    MissingApplicationId { kind: OperationKind },

    /// A program was placed in the other program's slot.
    #[error("{found} program supplied where {expected} program is required")]
    ProgramRoleMismatch {
        expected: ProgramRole,
        found: ProgramRole,
    },

    /// Approval plus clear program exceed the page allowance.
    #[error("programs total {size} bytes, limit is {max} with {extra_pages} extra pages")]
    ProgramTooLarge {
        size: usize,
        max: usize,
        extra_pages: u32,
    },

    /// More extra pages than the network allows.
    #[error("extra pages {requested} > {max}")]
    TooManyExtraPages { requested: u32, max: u32 },

    /// A state schema exceeds its scope's entry limit.
    #[error("{scope} schema has {entries} entries, limit is {max}")]
    SchemaTooLarge {
        scope: &'static str,
        entries: u64,
        max: u64,
    },

    /// Too many application arguments.
    #[error("{count} application arguments, limit is {max}")]
    TooManyAppArgs { count: usize, max: usize },

    /// Application arguments exceed the total byte limit.
    #[error("application arguments total {size} bytes, limit is {max}")]
    AppArgsTooLarge { size: usize, max: usize },

    /// Too many account references.
    #[error("{count} account references, limit is {max}")]
    TooManyAccounts { count: usize, max: usize },

    /// Accounts, apps, assets and boxes together exceed the reference limit.
    #[error("{count} total references, limit is {max}")]
    TooManyReferences { count: usize, max: usize },

    /// A box reference names an application that is not available to the call.
    #[error("box reference to application {0} which is not in foreign apps")]
    UnknownBoxApplication(ApplicationId),

    /// Note field too large.
    #[error("note is {size} bytes, limit is {max}")]
    NoteTooLarge { size: usize, max: usize },

    /// `last_valid` precedes `first_valid`.
    #[error("invalid validity range: first {first_valid}, last {last_valid}")]
    InvalidValidityRange { first_valid: Round, last_valid: Round },

    /// The validity window is wider than the network accepts.
    #[error("validity window {window} rounds exceeds {max}")]
    ValidityWindowTooLarge { window: u64, max: u64 },
}

// =============================================================================
// COMPILE
// =============================================================================

/// Program compilation failed. Fatal for the operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The compiler endpoint rejected the source.
    #[error("{role} program rejected by compiler: {reason}")]
    Rejected { role: ProgramRole, reason: String },

    /// The compiler answered with a result that is not valid base64.
    #[error("{role} program: undecodable compiler output: {reason}")]
    InvalidOutput { role: ProgramRole, reason: String },

    /// The embedded source could not be read.
    #[error("{role} program source unavailable: {reason}")]
    InvalidSource { role: ProgramRole, reason: String },
}

// =============================================================================
// CREDENTIALS & SIGNING
// =============================================================================

/// Loading the signing account failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// Key material is malformed.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// The derived address differs from the configured one.
    #[error("credential address mismatch: expected {expected}, derived {derived}")]
    AddressMismatch { expected: Address, derived: Address },
}

/// Signing or signature verification failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// The signing account is not the envelope sender.
    #[error("key mismatch: envelope sender {expected}, signing account {actual}")]
    KeyMismatch { expected: Address, actual: Address },

    /// The signature does not verify against the sender key.
    #[error("invalid signature for transaction {0}")]
    InvalidSignature(TransactionId),
}

// =============================================================================
// NETWORK
// =============================================================================

/// Transport-level failures reported by a network handle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The node could not be reached.
    #[error("network unavailable: {0}")]
    Unavailable(String),

    /// The node refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The requested object does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

/// The network refused a signed transaction or group. Terminal, never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("broadcast of {tx_id} failed: {reason}")]
pub struct BroadcastError {
    /// First transaction of the submission.
    pub tx_id: TransactionId,
    /// Network-reported reason.
    pub reason: String,
}

/// Waiting for inclusion did not produce a confirmed result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfirmationError {
    /// Round budget exhausted. The transaction may still confirm later.
    #[error("transaction {tx_id} not confirmed after {rounds} rounds")]
    Timeout { tx_id: TransactionId, rounds: u64 },

    /// The pool evicted the transaction.
    #[error("transaction {tx_id} rejected by pool: {reason}")]
    Rejected { tx_id: TransactionId, reason: String },

    /// A status or pending query failed.
    #[error("network error while awaiting {tx_id}: {source}")]
    Network {
        tx_id: TransactionId,
        #[source]
        source: NetworkError,
    },

    /// The caller cancelled the wait.
    #[error("wait for transaction {0} cancelled")]
    Cancelled(TransactionId),
}

impl ConfirmationError {
    /// Transaction the wait was for.
    #[must_use]
    pub fn tx_id(&self) -> TransactionId {
        match self {
            Self::Timeout { tx_id, .. }
            | Self::Rejected { tx_id, .. }
            | Self::Network { tx_id, .. }
            | Self::Cancelled(tx_id) => *tx_id,
        }
    }
}

/// Bytes that do not form a well-formed (signed) transaction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("malformed transaction encoding: {0}")]
pub struct DecodeError(pub String);

// =============================================================================
// ABI RETURNS
// =============================================================================

/// A confirmed method call produced no decodable return value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("return value of {method} in {tx_id}: {reason}")]
pub struct ReturnDecodeError {
    /// Method name.
    pub method: String,
    /// Call transaction.
    pub tx_id: TransactionId,
    /// What was wrong with the logs.
    pub reason: String,
}

// =============================================================================
// AGGREGATES
// =============================================================================

/// Failure of a single lifecycle operation, tagged with the operation kind.
#[derive(Debug, Error)]
#[error("{kind} failed: {source}")]
pub struct LifecycleError {
    /// Operation that failed.
    pub kind: OperationKind,
    /// Stage failure.
    #[source]
    pub source: StageError,
}

/// The stage at which a lifecycle operation stopped.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
    #[error(transparent)]
    Confirmation(#[from] ConfirmationError),
    #[error(transparent)]
    Composer(#[from] ComposerError),
    /// The confirmed create reported no application id.
    #[error("confirmed create in {0} reported no application id")]
    MissingCreatedId(TransactionId),
}

impl LifecycleError {
    /// Wraps a stage failure with the operation it belongs to.
    pub fn new(kind: OperationKind, source: impl Into<StageError>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    /// Transaction the failure refers to, once one exists.
    #[must_use]
    pub fn tx_id(&self) -> Option<TransactionId> {
        match &self.source {
            StageError::Broadcast(e) => Some(e.tx_id),
            StageError::Confirmation(e) => Some(e.tx_id()),
            StageError::MissingCreatedId(tx_id) => Some(*tx_id),
            StageError::Composer(e) => e.tx_id(),
            _ => None,
        }
    }

    /// True when the transaction may still have been applied on-chain.
    ///
    /// Callers must not assume failure: query the transaction id later.
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        match &self.source {
            StageError::Confirmation(e) => is_ambiguous_wait(e),
            StageError::Composer(e) => e.is_ambiguous(),
            _ => false,
        }
    }
}

/// Failure of an atomic group of method calls.
#[derive(Debug, Error)]
pub enum ComposerError {
    /// Method lookup or argument checks failed.
    #[error(transparent)]
    Abi(#[from] AbiError),

    /// A supplied transaction argument has the wrong type.
    #[error("{method} argument {position}: expected {expected} transaction, got {actual}")]
    TransactionArgument {
        method: String,
        position: usize,
        expected: &'static str,
        actual: &'static str,
    },

    /// The group would exceed the network's size limit.
    #[error("group of {size} transactions exceeds {max}")]
    GroupTooLarge { size: usize, max: usize },

    /// The group has nothing to submit.
    #[error("group is empty")]
    EmptyGroup,

    /// The group is not in the state the action needs.
    #[error("cannot {action} a group that is {status}")]
    InvalidState {
        action: &'static str,
        status: &'static str,
    },

    /// Clear-state calls cannot carry method calls.
    #[error("method calls cannot use the clear-state action")]
    ClearStateCall,

    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
    #[error(transparent)]
    Confirmation(#[from] ConfirmationError),
}

impl ComposerError {
    /// Transaction the failure refers to, once one exists.
    #[must_use]
    pub fn tx_id(&self) -> Option<TransactionId> {
        match self {
            Self::Broadcast(e) => Some(e.tx_id),
            Self::Confirmation(e) => Some(e.tx_id()),
            _ => None,
        }
    }

    /// True when the group may still have been applied on-chain.
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Confirmation(e) if is_ambiguous_wait(e))
    }
}

fn is_ambiguous_wait(e: &ConfirmationError) -> bool {
    matches!(
        e,
        ConfirmationError::Timeout { .. }
            | ConfirmationError::Cancelled(_)
            | ConfirmationError::Network { .. }
    )
}
