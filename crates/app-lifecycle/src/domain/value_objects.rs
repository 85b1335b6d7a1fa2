//! # Value Objects
//!
//! Immutable domain primitives for application transactions.

use serde::{Deserialize, Serialize};
use shared_types::{hash_with_prefix, Address, ApplicationId, Digest, Round};
use shared_types::hashing::PROGRAM_PREFIX;
use std::fmt;

// =============================================================================
// OPERATION KIND
// =============================================================================

/// The lifecycle operations, used to tag errors and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Create,
    OptIn,
    Call,
    Update,
    CloseOut,
    ClearState,
    Delete,
    /// One or more ABI method calls in an atomic group.
    MethodCall,
}

impl OperationKind {
    /// Stable lowercase name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::OptIn => "opt-in",
            Self::Call => "call",
            Self::Update => "update",
            Self::CloseOut => "close-out",
            Self::ClearState => "clear-state",
            Self::Delete => "delete",
            Self::MethodCall => "method-call",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// ON COMPLETE
// =============================================================================

/// Action applied to the caller's relationship with the application after
/// the approval program runs. Wire values are fixed by the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum OnComplete {
    #[default]
    NoOp = 0,
    OptIn = 1,
    CloseOut = 2,
    ClearState = 3,
    UpdateApplication = 4,
    DeleteApplication = 5,
}

impl OnComplete {
    /// Wire value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self as u64
    }

    /// Parses a wire value.
    #[must_use]
    pub const fn from_u64(value: u64) -> Option<Self> {
        Some(match value {
            0 => Self::NoOp,
            1 => Self::OptIn,
            2 => Self::CloseOut,
            3 => Self::ClearState,
            4 => Self::UpdateApplication,
            5 => Self::DeleteApplication,
            _ => return None,
        })
    }
}

// =============================================================================
// STATE SCHEMA
// =============================================================================

/// Storage allocation for one state scope. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StateSchema {
    /// Number of integer slots.
    pub num_uints: u64,
    /// Number of byte-slice slots.
    pub num_byte_slices: u64,
}

impl StateSchema {
    /// No storage.
    pub const EMPTY: Self = Self::new(0, 0);

    #[must_use]
    pub const fn new(num_uints: u64, num_byte_slices: u64) -> Self {
        Self {
            num_uints,
            num_byte_slices,
        }
    }

    /// Total number of slots.
    #[must_use]
    pub const fn entries(&self) -> u64 {
        self.num_uints.saturating_add(self.num_byte_slices)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.num_uints == 0 && self.num_byte_slices == 0
    }
}

// =============================================================================
// PROGRAMS
// =============================================================================

/// Which slot a program belongs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgramRole {
    /// Runs on every call except clear-state.
    Approval,
    /// Runs on clear-state; cannot block the caller from leaving.
    Clear,
}

impl fmt::Display for ProgramRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Approval => "approval",
            Self::Clear => "clear",
        })
    }
}

/// Bytecode produced by the compiler.
///
/// Only the compiler (and the transaction decoder) construct these, so a
/// `CompiledProgram` in hand always came from a successful compilation or
/// from a well-formed envelope.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CompiledProgram {
    role: ProgramRole,
    bytes: Vec<u8>,
    hash: Address,
}

impl CompiledProgram {
    pub(crate) fn new(role: ProgramRole, bytes: Vec<u8>, hash: Address) -> Self {
        Self { role, bytes, hash }
    }

    /// Builds a program from raw bytecode, deriving its hash locally.
    pub(crate) fn from_bytecode(role: ProgramRole, bytes: Vec<u8>) -> Self {
        let hash = program_hash(&bytes);
        Self::new(role, bytes, hash)
    }

    #[must_use]
    pub fn role(&self) -> ProgramRole {
        self.role
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hash reported by the compiler (the program's escrow address).
    #[must_use]
    pub fn hash(&self) -> Address {
        self.hash
    }
}

impl fmt::Debug for CompiledProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledProgram")
            .field("role", &self.role)
            .field("len", &self.bytes.len())
            .field("hash", &self.hash)
            .finish()
    }
}

/// `SHA-512/256("Program" || bytecode)` as an address.
#[must_use]
pub fn program_hash(bytecode: &[u8]) -> Address {
    Address(hash_with_prefix(PROGRAM_PREFIX, bytecode).0)
}

// =============================================================================
// BOX REFERENCE
// =============================================================================

/// A box the call may touch. `app_id` 0 means the called application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BoxReference {
    pub app_id: ApplicationId,
    pub name: Vec<u8>,
}

impl BoxReference {
    /// Box of the called application.
    #[must_use]
    pub fn own(name: impl Into<Vec<u8>>) -> Self {
        Self {
            app_id: ApplicationId::NONE,
            name: name.into(),
        }
    }
}

// =============================================================================
// NETWORK PARAMETERS
// =============================================================================

/// Suggested parameters fetched from the network before building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParams {
    /// Flat fee in microunits, stamped as-is.
    pub fee: u64,
    pub first_valid: Round,
    pub last_valid: Round,
    pub genesis_id: String,
    pub genesis_hash: Digest,
    /// Network minimum fee, informational.
    pub min_fee: u64,
}

impl NetworkParams {
    /// Number of rounds in the validity window.
    #[must_use]
    pub fn window(&self) -> u64 {
        self.last_valid.saturating_sub(self.first_valid)
    }
}
