//! # Driven Ports (SPI - Outbound)
//!
//! What the lifecycle core needs from the outside world: a node to talk to
//! and a place to load the signing account from. Both are passed in
//! explicitly; nothing in the core reaches for ambient state.

use crate::domain::entities::{
    ApplicationInfo, CompileResponse, LocalState, NodeStatus, PendingTransaction,
};
use crate::domain::signer::Account;
use crate::domain::value_objects::NetworkParams;
use crate::errors::{CredentialError, NetworkError};
use async_trait::async_trait;
use shared_types::{Address, ApplicationId, Round, TransactionId};

// =============================================================================
// NETWORK HANDLE
// =============================================================================

/// A node's algod-style interface.
///
/// Implementations must tolerate concurrent read-only queries.
#[async_trait]
pub trait AlgodApi: Send + Sync {
    /// Fee, validity range and genesis of the next transaction.
    async fn suggested_params(&self) -> Result<NetworkParams, NetworkError>;

    /// Current node status.
    async fn status(&self) -> Result<NodeStatus, NetworkError>;

    /// Resolves once a block after `round` exists.
    async fn wait_for_block(&self, round: Round) -> Result<NodeStatus, NetworkError>;

    /// Compiles program source.
    async fn compile(&self, source: &str) -> Result<CompileResponse, NetworkError>;

    /// Submits one signed transaction or a concatenated group.
    ///
    /// Returns the id of the first transaction.
    async fn broadcast(&self, signed: &[u8]) -> Result<TransactionId, NetworkError>;

    /// Pool / ledger view of a submitted transaction. `None` if unknown.
    async fn pending_transaction(
        &self,
        id: &TransactionId,
    ) -> Result<Option<PendingTransaction>, NetworkError>;

    /// A deployed application and its global state.
    async fn application(&self, id: ApplicationId) -> Result<ApplicationInfo, NetworkError>;

    /// An account's local state for one application.
    async fn account_application(
        &self,
        address: &Address,
        id: ApplicationId,
    ) -> Result<LocalState, NetworkError>;
}

// =============================================================================
// CREDENTIALS
// =============================================================================

/// Source of the signing account.
pub trait CredentialSource: Send + Sync {
    /// Loads the account, checking it against any expected address.
    fn load(&self) -> Result<Account, CredentialError>;
}
