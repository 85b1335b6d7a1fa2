//! # Domain Entities
//!
//! Transactions as built and signed locally, and the records the network
//! reports back about them.

use crate::domain::encoding;
use crate::domain::value_objects::{BoxReference, CompiledProgram, OnComplete, StateSchema};
use shared_types::{Address, ApplicationId, AssetId, Digest, Round, TransactionId};

/// Lease length in bytes.
pub const LEASE_LEN: usize = 32;

/// Ed25519 signature length in bytes.
pub const SIGNATURE_LEN: usize = 64;

// =============================================================================
// TRANSACTION ENVELOPE
// =============================================================================

/// Fields common to every transaction type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionHeader {
    pub sender: Address,
    pub fee: u64,
    pub first_valid: Round,
    pub last_valid: Round,
    pub genesis_id: String,
    pub genesis_hash: Digest,
    pub note: Vec<u8>,
    pub lease: Option<[u8; LEASE_LEN]>,
    pub rekey_to: Option<Address>,
    /// Group id, set only for multi-transaction groups.
    pub group: Option<Digest>,
}

/// Application call body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppCallFields {
    /// Zero for create.
    pub app_id: ApplicationId,
    pub on_complete: OnComplete,
    pub approval_program: Option<CompiledProgram>,
    pub clear_program: Option<CompiledProgram>,
    pub global_schema: StateSchema,
    pub local_schema: StateSchema,
    pub extra_pages: u32,
    pub app_args: Vec<Vec<u8>>,
    pub accounts: Vec<Address>,
    pub foreign_apps: Vec<ApplicationId>,
    pub foreign_assets: Vec<AssetId>,
    pub boxes: Vec<BoxReference>,
}

impl AppCallFields {
    /// True for the create form (`app_id == 0`).
    #[must_use]
    pub fn is_create(&self) -> bool {
        self.app_id.is_none()
    }
}

/// Payment body, used for ABI `pay` / `txn` arguments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaymentFields {
    pub receiver: Address,
    pub amount: u64,
    pub close_remainder_to: Option<Address>,
}

/// Type-specific part of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionBody {
    ApplicationCall(AppCallFields),
    Payment(PaymentFields),
}

impl TransactionBody {
    /// Wire `type` tag.
    #[must_use]
    pub const fn type_tag(&self) -> &'static str {
        match self {
            Self::ApplicationCall(_) => "appl",
            Self::Payment(_) => "pay",
        }
    }
}

/// An unsigned transaction: header plus exactly one body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEnvelope {
    pub header: TransactionHeader,
    pub body: TransactionBody,
}

impl TransactionEnvelope {
    /// Content-derived id over the canonical encoding.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        encoding::transaction_id(self)
    }

    /// Canonical msgpack bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        encoding::encode_transaction(self)
    }

    #[must_use]
    pub fn sender(&self) -> Address {
        self.header.sender
    }

    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        self.body.type_tag()
    }

    /// The application call body, if this is one.
    #[must_use]
    pub fn app_call(&self) -> Option<&AppCallFields> {
        match &self.body {
            TransactionBody::ApplicationCall(fields) => Some(fields),
            TransactionBody::Payment(_) => None,
        }
    }
}

/// A signed envelope. `id` equals `envelope.id()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    pub envelope: TransactionEnvelope,
    pub signature: [u8; SIGNATURE_LEN],
    pub id: TransactionId,
}

impl SignedEnvelope {
    /// Wire form: `{"sig": .., "txn": ..}`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        encoding::encode_signed(self)
    }
}

// =============================================================================
// NETWORK RECORDS
// =============================================================================

/// Node status snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeStatus {
    pub last_round: Round,
}

/// Compiler endpoint response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileResponse {
    /// Program hash as an address string.
    pub hash: String,
    /// Base64 bytecode.
    pub result: String,
}

/// A state value: integer or byte slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateValue {
    Bytes(Vec<u8>),
    Uint(u64),
}

/// One key of global or local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEntry {
    pub key: Vec<u8>,
    pub value: StateValue,
}

fn lookup<'a>(entries: &'a [StateEntry], key: &[u8]) -> Option<&'a StateValue> {
    entries.iter().find(|e| e.key == key).map(|e| &e.value)
}

/// What the pool reports about a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PendingTransaction {
    /// Set once included in a block.
    pub confirmed_round: Option<Round>,
    /// Non-empty when the pool evicted the transaction.
    pub pool_error: String,
    pub logs: Vec<Vec<u8>>,
    /// Id assigned by a confirmed create.
    pub application_index: Option<ApplicationId>,
    pub asset_index: Option<AssetId>,
    pub global_state_delta: Vec<StateEntry>,
}

/// Successful inclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationResult {
    pub tx_id: TransactionId,
    pub confirmed_round: Round,
    pub logs: Vec<Vec<u8>>,
    pub application_id: Option<ApplicationId>,
    pub asset_id: Option<AssetId>,
    pub global_state_delta_present: bool,
}

impl ConfirmationResult {
    pub(crate) fn from_pending(tx_id: TransactionId, round: Round, p: PendingTransaction) -> Self {
        Self {
            tx_id,
            confirmed_round: round,
            global_state_delta_present: !p.global_state_delta.is_empty(),
            logs: p.logs,
            application_id: p.application_index,
            asset_id: p.asset_index,
        }
    }
}

/// Deployed application as reported by the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationInfo {
    pub id: ApplicationId,
    pub creator: Address,
    pub approval_program: Vec<u8>,
    pub clear_program: Vec<u8>,
    pub global_schema: StateSchema,
    pub local_schema: StateSchema,
    pub extra_pages: u32,
    pub global_state: Vec<StateEntry>,
}

impl ApplicationInfo {
    /// Global state value under `key`.
    #[must_use]
    pub fn global(&self, key: &[u8]) -> Option<&StateValue> {
        lookup(&self.global_state, key)
    }
}

/// An account's local state for one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalState {
    pub app_id: ApplicationId,
    pub schema: StateSchema,
    pub key_values: Vec<StateEntry>,
}

impl LocalState {
    /// Local state value under `key`.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<&StateValue> {
        lookup(&self.key_values, key)
    }
}
