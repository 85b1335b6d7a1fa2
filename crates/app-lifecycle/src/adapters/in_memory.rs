//! # In-Memory Network
//!
//! A single-node ledger kept in memory, implementing [`AlgodApi`]. It checks
//! what a real node checks at admission (signatures, validity window,
//! genesis, group ids, application existence) and applies application
//! effects, so the whole lifecycle can run without a network.
//!
//! Rounds only advance when someone waits for a block (or calls
//! [`InMemoryAlgod::advance_rounds`]); a transaction admitted at round `r`
//! confirms at `r + 1 + delay`.
//!
//! Failure modes are switched on per instance for tests: rejected
//! broadcasts, rejected compiles, pool eviction, transactions that never
//! confirm, stale suggested parameters and an unreachable node.

use crate::composer::RETURN_LOG_PREFIX;
use crate::domain::builder::limits::MAX_GROUP_SIZE;
use crate::domain::encoding::{decode_signed_group, group_id};
use crate::domain::entities::{
    AppCallFields, ApplicationInfo, CompileResponse, LocalState, NodeStatus, PendingTransaction,
    SignedEnvelope, StateEntry, StateValue, TransactionBody,
};
use crate::domain::signer::verify;
use crate::domain::value_objects::{program_hash, CompiledProgram, NetworkParams, OnComplete};
use crate::errors::NetworkError;
use crate::ports::outbound::AlgodApi;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use parking_lot::RwLock;
use shared_types::{sha512_256, Address, ApplicationId, Digest, Round, TransactionId};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Produces the logs an application call emits.
pub type LogFn = Arc<dyn Fn(&AppCallFields) -> Vec<Vec<u8>> + Send + Sync>;

/// Genesis id of a fresh in-memory network.
pub const GENESIS_ID: &str = "sandnet-v1";

const START_ROUND: Round = 1000;
const FIRST_APP_ID: u64 = 1001;
const DEFAULT_FEE: u64 = 1000;
const DEFAULT_WINDOW: u64 = 1000;

/// Request counters, for asserting which calls were made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkStats {
    pub broadcasts: u64,
    pub compiles: u64,
    pub status_queries: u64,
    pub pending_queries: u64,
    pub block_waits: u64,
    pub params_queries: u64,
}

#[derive(Default)]
struct Counters {
    broadcasts: AtomicU64,
    compiles: AtomicU64,
    status_queries: AtomicU64,
    pending_queries: AtomicU64,
    block_waits: AtomicU64,
    params_queries: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

#[derive(Default)]
struct Behaviour {
    offline: Option<String>,
    reject_broadcast: Option<String>,
    reject_compile: Option<String>,
    evict: Option<String>,
    hold: bool,
    confirmation_delay: u64,
    stale_params: bool,
    logger: Option<LogFn>,
}

struct PoolEntry {
    /// `None` while held back.
    confirm_round: Option<Round>,
    record: PendingTransaction,
}

struct Ledger {
    round: Round,
    genesis_hash: Digest,
    next_app_id: u64,
    apps: BTreeMap<ApplicationId, ApplicationInfo>,
    local: HashMap<(Address, ApplicationId), LocalState>,
    pool: HashMap<TransactionId, PoolEntry>,
    behaviour: Behaviour,
}

impl Ledger {
    fn status(&self) -> NodeStatus {
        NodeStatus {
            last_round: self.round,
        }
    }

    fn check_online(&self) -> Result<(), NetworkError> {
        match &self.behaviour.offline {
            Some(reason) => Err(NetworkError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

/// In-memory [`AlgodApi`] implementation.
pub struct InMemoryAlgod {
    ledger: RwLock<Ledger>,
    counters: Counters,
}

impl Default for InMemoryAlgod {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAlgod {
    /// Fresh network at round 1000 with no applications.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ledger: RwLock::new(Ledger {
                round: START_ROUND,
                genesis_hash: sha512_256(GENESIS_ID.as_bytes()),
                next_app_id: FIRST_APP_ID,
                apps: BTreeMap::new(),
                local: HashMap::new(),
                pool: HashMap::new(),
                behaviour: Behaviour::default(),
            }),
            counters: Counters::default(),
        }
    }

    // -------------------------------------------------------------------------
    // Behaviour switches
    // -------------------------------------------------------------------------

    /// Every request fails as if the node were unreachable.
    pub fn go_offline(&self, reason: &str) {
        self.ledger.write().behaviour.offline = Some(reason.to_string());
    }

    pub fn go_online(&self) {
        self.ledger.write().behaviour.offline = None;
    }

    /// Every broadcast is refused with `reason`.
    pub fn reject_broadcasts(&self, reason: &str) {
        self.ledger.write().behaviour.reject_broadcast = Some(reason.to_string());
    }

    /// Every compile is refused with `reason`.
    pub fn reject_compile(&self, reason: &str) {
        self.ledger.write().behaviour.reject_compile = Some(reason.to_string());
    }

    /// Admitted transactions are evicted from the pool with `reason`.
    pub fn evict_transactions(&self, reason: &str) {
        self.ledger.write().behaviour.evict = Some(reason.to_string());
    }

    /// Admitted transactions never confirm.
    pub fn hold_transactions(&self) {
        self.ledger.write().behaviour.hold = true;
    }

    /// Extra rounds before an admitted transaction confirms.
    pub fn set_confirmation_delay(&self, rounds: u64) {
        self.ledger.write().behaviour.confirmation_delay = rounds;
    }

    /// Suggested parameters whose validity window has already passed.
    pub fn serve_stale_params(&self) {
        self.ledger.write().behaviour.stale_params = true;
    }

    /// Installs the function that produces application-call logs.
    pub fn set_logger(&self, logger: LogFn) {
        self.ledger.write().behaviour.logger = Some(logger);
    }

    /// Calls whose first argument is a selector return their second argument.
    ///
    /// Models an application whose methods echo their first ABI argument.
    pub fn echo_first_argument(&self) {
        self.set_logger(Arc::new(|fields: &AppCallFields| {
            fields
                .app_args
                .get(1)
                .map(|arg| {
                    let mut log = RETURN_LOG_PREFIX.to_vec();
                    log.extend_from_slice(arg);
                    vec![log]
                })
                .unwrap_or_default()
        }));
    }

    // -------------------------------------------------------------------------
    // Ledger access
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn round(&self) -> Round {
        self.ledger.read().round
    }

    pub fn advance_rounds(&self, rounds: u64) {
        self.ledger.write().round += rounds;
    }

    #[must_use]
    pub fn genesis_hash(&self) -> Digest {
        self.ledger.read().genesis_hash
    }

    #[must_use]
    pub fn stats(&self) -> NetworkStats {
        let c = &self.counters;
        NetworkStats {
            broadcasts: c.broadcasts.load(Ordering::Relaxed),
            compiles: c.compiles.load(Ordering::Relaxed),
            status_queries: c.status_queries.load(Ordering::Relaxed),
            pending_queries: c.pending_queries.load(Ordering::Relaxed),
            block_waits: c.block_waits.load(Ordering::Relaxed),
            params_queries: c.params_queries.load(Ordering::Relaxed),
        }
    }

    /// Writes a global state value of an existing application.
    pub fn set_global_state(&self, app_id: ApplicationId, key: &[u8], value: StateValue) {
        if let Some(app) = self.ledger.write().apps.get_mut(&app_id) {
            upsert(&mut app.global_state, key, value);
        }
    }

    /// Writes a local state value of an opted-in account.
    pub fn set_local_state(
        &self,
        address: Address,
        app_id: ApplicationId,
        key: &[u8],
        value: StateValue,
    ) {
        if let Some(state) = self.ledger.write().local.get_mut(&(address, app_id)) {
            upsert(&mut state.key_values, key, value);
        }
    }

    /// True if `address` has local state for `app_id`.
    #[must_use]
    pub fn is_opted_in(&self, address: Address, app_id: ApplicationId) -> bool {
        self.ledger.read().local.contains_key(&(address, app_id))
    }
}

fn upsert(entries: &mut Vec<StateEntry>, key: &[u8], value: StateValue) {
    match entries.iter_mut().find(|e| e.key == key) {
        Some(entry) => entry.value = value,
        None => entries.push(StateEntry {
            key: key.to_vec(),
            value,
        }),
    }
}

// =============================================================================
// ADMISSION
// =============================================================================

fn rejected(reason: impl Into<String>) -> NetworkError {
    NetworkError::Rejected(reason.into())
}

fn check_signed(ledger: &Ledger, stx: &SignedEnvelope) -> Result<(), NetworkError> {
    verify(stx).map_err(|e| rejected(e.to_string()))?;

    let header = &stx.envelope.header;
    if header.genesis_hash != ledger.genesis_hash {
        return Err(rejected("genesis hash mismatch"));
    }
    let next = ledger.round + 1;
    if next < header.first_valid || next > header.last_valid {
        return Err(rejected(format!(
            "txn dead: round {next} outside of {}--{}",
            header.first_valid, header.last_valid
        )));
    }
    if ledger.pool.contains_key(&stx.id) {
        return Err(rejected(format!("transaction already in ledger: {}", stx.id)));
    }
    Ok(())
}

fn check_group(group: &[SignedEnvelope]) -> Result<(), NetworkError> {
    if group.len() > MAX_GROUP_SIZE {
        return Err(rejected(format!("group of {} transactions", group.len())));
    }
    if group.len() == 1 {
        return match group[0].envelope.header.group {
            Some(_) => Err(rejected("incomplete group")),
            None => Ok(()),
        };
    }
    let ids: Vec<_> = group
        .iter()
        .map(|stx| {
            let mut tx = stx.envelope.clone();
            tx.header.group = None;
            tx.id()
        })
        .collect();
    let expected = group_id(&ids);
    if group
        .iter()
        .any(|stx| stx.envelope.header.group != Some(expected))
    {
        return Err(rejected("incomplete group"));
    }
    Ok(())
}

/// Applies one application call to scratch copies of the state tables.
fn apply_app_call(
    sender: Address,
    fields: &AppCallFields,
    apps: &mut BTreeMap<ApplicationId, ApplicationInfo>,
    local: &mut HashMap<(Address, ApplicationId), LocalState>,
    next_app_id: &mut u64,
    record: &mut PendingTransaction,
) -> Result<(), NetworkError> {
    let program = |p: &Option<CompiledProgram>| {
        p.as_ref().map(|p| p.bytes().to_vec()).unwrap_or_default()
    };

    let app_id = if fields.is_create() {
        let id = ApplicationId(*next_app_id);
        *next_app_id += 1;
        apps.insert(
            id,
            ApplicationInfo {
                id,
                creator: sender,
                approval_program: program(&fields.approval_program),
                clear_program: program(&fields.clear_program),
                global_schema: fields.global_schema,
                local_schema: fields.local_schema,
                extra_pages: fields.extra_pages,
                global_state: Vec::new(),
            },
        );
        record.application_index = Some(id);
        id
    } else if apps.contains_key(&fields.app_id) {
        fields.app_id
    } else {
        return Err(rejected(format!("application {} does not exist", fields.app_id)));
    };

    let key = (sender, app_id);
    match fields.on_complete {
        OnComplete::NoOp => {}
        OnComplete::OptIn => {
            if local.contains_key(&key) {
                return Err(rejected(format!("{sender} has already opted in to {app_id}")));
            }
            let schema = apps.get(&app_id).map(|a| a.local_schema).unwrap_or_default();
            local.insert(
                key,
                LocalState {
                    app_id,
                    schema,
                    key_values: Vec::new(),
                },
            );
        }
        OnComplete::CloseOut | OnComplete::ClearState => {
            if local.remove(&key).is_none() {
                return Err(rejected(format!("{sender} is not opted in to {app_id}")));
            }
        }
        OnComplete::UpdateApplication => {
            if let Some(app) = apps.get_mut(&app_id) {
                app.approval_program = program(&fields.approval_program);
                app.clear_program = program(&fields.clear_program);
            }
        }
        OnComplete::DeleteApplication => {
            apps.remove(&app_id);
        }
    }
    Ok(())
}

// =============================================================================
// PORT IMPLEMENTATION
// =============================================================================

#[async_trait]
impl AlgodApi for InMemoryAlgod {
    async fn suggested_params(&self) -> Result<NetworkParams, NetworkError> {
        bump(&self.counters.params_queries);
        let ledger = self.ledger.read();
        ledger.check_online()?;
        let first_valid = if ledger.behaviour.stale_params {
            ledger.round.saturating_sub(2 * DEFAULT_WINDOW)
        } else {
            ledger.round + 1
        };
        Ok(NetworkParams {
            fee: DEFAULT_FEE,
            first_valid,
            last_valid: first_valid + DEFAULT_WINDOW,
            genesis_id: GENESIS_ID.to_string(),
            genesis_hash: ledger.genesis_hash,
            min_fee: DEFAULT_FEE,
        })
    }

    async fn status(&self) -> Result<NodeStatus, NetworkError> {
        bump(&self.counters.status_queries);
        let ledger = self.ledger.read();
        ledger.check_online()?;
        Ok(ledger.status())
    }

    async fn wait_for_block(&self, round: Round) -> Result<NodeStatus, NetworkError> {
        bump(&self.counters.block_waits);
        tokio::task::yield_now().await;
        let mut ledger = self.ledger.write();
        ledger.check_online()?;
        ledger.round = ledger.round.max(round + 1);
        Ok(ledger.status())
    }

    async fn compile(&self, source: &str) -> Result<CompileResponse, NetworkError> {
        bump(&self.counters.compiles);
        let ledger = self.ledger.read();
        ledger.check_online()?;
        if let Some(reason) = &ledger.behaviour.reject_compile {
            return Err(rejected(reason.clone()));
        }
        if source.trim().is_empty() {
            return Err(rejected("empty program"));
        }
        let mut bytecode = vec![0x08];
        bytecode.extend_from_slice(sha512_256(source.as_bytes()).as_bytes());
        Ok(CompileResponse {
            hash: program_hash(&bytecode).to_string(),
            result: B64.encode(&bytecode),
        })
    }

    async fn broadcast(&self, signed: &[u8]) -> Result<TransactionId, NetworkError> {
        bump(&self.counters.broadcasts);
        let group = decode_signed_group(signed).map_err(|e| rejected(e.to_string()))?;

        let mut ledger = self.ledger.write();
        ledger.check_online()?;
        if let Some(reason) = &ledger.behaviour.reject_broadcast {
            warn!(reason = %reason, "Broadcast refused");
            return Err(rejected(reason.clone()));
        }
        check_group(&group)?;
        for stx in &group {
            check_signed(&ledger, stx)?;
        }

        let mut apps = ledger.apps.clone();
        let mut local = ledger.local.clone();
        let mut next_app_id = ledger.next_app_id;
        let evict = ledger.behaviour.evict.clone();
        let mut records = Vec::with_capacity(group.len());
        for stx in &group {
            let mut record = PendingTransaction::default();
            if evict.is_none() {
                if let TransactionBody::ApplicationCall(fields) = &stx.envelope.body {
                    apply_app_call(
                        stx.envelope.sender(),
                        fields,
                        &mut apps,
                        &mut local,
                        &mut next_app_id,
                        &mut record,
                    )?;
                    if let Some(logger) = &ledger.behaviour.logger {
                        record.logs = logger(fields);
                    }
                }
            }
            record.pool_error = evict.clone().unwrap_or_default();
            records.push((stx.id, record));
        }

        let confirm_round = (!ledger.behaviour.hold)
            .then(|| ledger.round + 1 + ledger.behaviour.confirmation_delay);
        ledger.apps = apps;
        ledger.local = local;
        ledger.next_app_id = next_app_id;
        for (id, record) in records {
            ledger.pool.insert(
                id,
                PoolEntry {
                    confirm_round,
                    record,
                },
            );
        }

        debug!(txns = group.len(), first = %group[0].id, "Group admitted");
        Ok(group[0].id)
    }

    async fn pending_transaction(
        &self,
        id: &TransactionId,
    ) -> Result<Option<PendingTransaction>, NetworkError> {
        bump(&self.counters.pending_queries);
        let ledger = self.ledger.read();
        ledger.check_online()?;
        Ok(ledger.pool.get(id).map(|entry| {
            let mut record = entry.record.clone();
            record.confirmed_round = entry
                .confirm_round
                .filter(|r| record.pool_error.is_empty() && ledger.round >= *r);
            record
        }))
    }

    async fn application(&self, id: ApplicationId) -> Result<ApplicationInfo, NetworkError> {
        let ledger = self.ledger.read();
        ledger.check_online()?;
        ledger
            .apps
            .get(&id)
            .cloned()
            .ok_or_else(|| NetworkError::NotFound(format!("application {id}")))
    }

    async fn account_application(
        &self,
        address: &Address,
        id: ApplicationId,
    ) -> Result<LocalState, NetworkError> {
        let ledger = self.ledger.read();
        ledger.check_online()?;
        ledger
            .local
            .get(&(*address, id))
            .cloned()
            .ok_or_else(|| NetworkError::NotFound(format!("{address} is not opted in to {id}")))
    }
}
