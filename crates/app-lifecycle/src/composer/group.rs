//! # Atomic Groups
//!
//! Collects method calls, lowers them into one atomic group and drives the
//! group through signing, broadcast and confirmation.
//!
//! ```text
//! Building ─build_group─▶ Built ─sign─▶ Signed ─submit─▶ Submitted ─confirm─▶ Committed
//! ```

use super::request::{call_target, check_arguments, encode_call, MethodCallRequest};
use super::RETURN_LOG_PREFIX;
use crate::confirmation::ConfirmationEngine;
use crate::domain::builder::{build, build_payment, limits, CallParams};
use crate::domain::encoding::assign_group;
use crate::domain::entities::{ConfirmationResult, SignedEnvelope, TransactionEnvelope};
use crate::domain::signer::{sign, Account};
use crate::domain::value_objects::NetworkParams;
use crate::errors::{ComposerError, ReturnDecodeError};
use crate::ports::outbound::AlgodApi;
use app_abi::codec::decode;
use app_abi::method::Method;
use app_abi::value::AbiValue;
use shared_types::{Digest, Round, TransactionId};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Where a group is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComposerStatus {
    /// Accepting method calls.
    #[default]
    Building,
    /// Envelopes built and grouped.
    Built,
    /// Every envelope signed.
    Signed,
    /// Broadcast accepted by the network.
    Submitted,
    /// Confirmed on-chain.
    Committed,
}

impl ComposerStatus {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Building => "building",
            Self::Built => "built",
            Self::Signed => "signed",
            Self::Submitted => "submitted",
            Self::Committed => "committed",
        }
    }
}

impl fmt::Display for ComposerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one method call in a confirmed group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodResult {
    pub method: Method,
    pub tx_id: TransactionId,
    pub confirmation: ConfirmationResult,
    /// `Ok(None)` for `void` methods.
    pub return_value: Result<Option<AbiValue>, ReturnDecodeError>,
}

/// Outcome of a confirmed group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupExecution {
    /// `None` for a single transaction.
    pub group_id: Option<Digest>,
    /// Every transaction in group order, payments included.
    pub tx_ids: Vec<TransactionId>,
    pub confirmed_round: Round,
    /// One entry per method call, in the order the calls were added.
    pub method_results: Vec<MethodResult>,
}

/// An atomic group of ABI method calls.
#[derive(Debug, Default)]
pub struct AtomicGroup {
    status: ComposerStatus,
    requests: Vec<MethodCallRequest>,
    envelopes: Vec<TransactionEnvelope>,
    signers: Vec<Arc<Account>>,
    /// Group position of each request's call transaction.
    call_positions: Vec<usize>,
    signed: Vec<SignedEnvelope>,
    group_id: Option<Digest>,
}

impl AtomicGroup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn status(&self) -> ComposerStatus {
        self.status
    }

    /// Transactions the group holds or will hold, payments included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.iter().map(transactions_for).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Built envelopes in group order. Empty until [`Self::build_group`].
    #[must_use]
    pub fn transactions(&self) -> &[TransactionEnvelope] {
        &self.envelopes
    }

    fn require(&self, status: ComposerStatus, action: &'static str) -> Result<(), ComposerError> {
        if self.status == status {
            Ok(())
        } else {
            Err(ComposerError::InvalidState {
                action,
                status: self.status.name(),
            })
        }
    }

    /// Queues a method call.
    pub fn add_method_call(&mut self, request: MethodCallRequest) -> Result<(), ComposerError> {
        self.require(ComposerStatus::Building, "add a call to")?;
        call_target(&request.operation)?;
        check_arguments(&request.method, &request.args)?;

        let size = self.len() + transactions_for(&request);
        if size > limits::MAX_GROUP_SIZE {
            return Err(ComposerError::GroupTooLarge {
                size,
                max: limits::MAX_GROUP_SIZE,
            });
        }
        debug!(method = %request.method.name, size, "Method call added to group");
        self.requests.push(request);
        Ok(())
    }

    /// Lowers every queued call into envelopes and assigns the group id.
    ///
    /// Payment arguments precede the call that takes them.
    pub fn build_group(&mut self, net: &NetworkParams) -> Result<Option<Digest>, ComposerError> {
        self.require(ComposerStatus::Building, "build")?;
        if self.requests.is_empty() {
            return Err(ComposerError::EmptyGroup);
        }

        let mut envelopes = Vec::with_capacity(self.len());
        let mut signers = Vec::with_capacity(self.len());
        let mut call_positions = Vec::with_capacity(self.requests.len());

        for request in &self.requests {
            let app_id = call_target(&request.operation)?;
            let encoded = encode_call(&request.method, &request.args, app_id, &request.params)?;

            let payer = CallParams::new(request.signer.address());
            for (receiver, amount) in &encoded.payments {
                envelopes.push(build_payment(&payer, *receiver, *amount, net)?);
                signers.push(Arc::clone(&request.signer));
            }
            call_positions.push(envelopes.len());
            envelopes.push(build(&request.operation, &encoded.params, net)?);
            signers.push(Arc::clone(&request.signer));
        }

        self.group_id = assign_group(&mut envelopes);
        self.envelopes = envelopes;
        self.signers = signers;
        self.call_positions = call_positions;
        self.status = ComposerStatus::Built;
        Ok(self.group_id)
    }

    /// Signs each envelope with its request's account.
    pub fn sign(&mut self) -> Result<&[SignedEnvelope], ComposerError> {
        self.require(ComposerStatus::Built, "sign")?;
        let signed = self
            .envelopes
            .iter()
            .zip(&self.signers)
            .map(|(envelope, signer)| sign(envelope, signer).map(|(_, stx)| stx))
            .collect::<Result<Vec<_>, _>>()?;
        self.signed = signed;
        self.status = ComposerStatus::Signed;
        Ok(&self.signed)
    }

    /// Builds, signs, broadcasts and confirms the group, then decodes returns.
    ///
    /// Uses the engine's default budget when `round_budget` is `None`. A
    /// group the network refuses is an error and no call is reported.
    #[instrument(skip(self, network, engine), fields(calls = self.requests.len()))]
    pub async fn execute<N: AlgodApi + ?Sized>(
        &mut self,
        network: &N,
        engine: &ConfirmationEngine,
        round_budget: Option<u64>,
    ) -> Result<GroupExecution, ComposerError> {
        if self.status == ComposerStatus::Building {
            if self.requests.is_empty() {
                return Err(ComposerError::EmptyGroup);
            }
            let params = network.suggested_params().await?;
            self.build_group(&params)?;
        }
        if self.status == ComposerStatus::Built {
            self.sign()?;
        }
        self.require(ComposerStatus::Signed, "submit")?;

        engine.submit(network, &self.signed).await?;
        self.status = ComposerStatus::Submitted;

        let budget = round_budget.unwrap_or_else(|| engine.default_budget());
        let mut method_results = Vec::with_capacity(self.requests.len());
        for (request, position) in self.requests.iter().zip(&self.call_positions) {
            let tx_id = self.signed[*position].id;
            let confirmation = engine.await_confirmation(network, tx_id, budget).await?;
            let return_value = decode_return(&request.method, tx_id, &confirmation.logs);
            if let Err(e) = &return_value {
                warn!(method = %request.method.name, error = %e, "Return value unavailable");
            }
            method_results.push(MethodResult {
                method: request.method.clone(),
                tx_id,
                confirmation,
                return_value,
            });
        }

        self.status = ComposerStatus::Committed;
        let confirmed_round = method_results
            .first()
            .map(|r| r.confirmation.confirmed_round)
            .unwrap_or_default();
        info!(
            txns = self.signed.len(),
            round = confirmed_round,
            "Atomic group committed"
        );

        Ok(GroupExecution {
            group_id: self.group_id,
            tx_ids: self.signed.iter().map(|stx| stx.id).collect(),
            confirmed_round,
            method_results,
        })
    }
}

fn transactions_for(request: &MethodCallRequest) -> usize {
    1 + request.method.transaction_arg_count()
}

/// Decodes a method's return value from the final log record, which must
/// carry [`RETURN_LOG_PREFIX`].
pub fn decode_return(
    method: &Method,
    tx_id: TransactionId,
    logs: &[Vec<u8>],
) -> Result<Option<AbiValue>, ReturnDecodeError> {
    let Some(returns) = &method.returns else {
        return Ok(None);
    };
    let failure = |reason: String| ReturnDecodeError {
        method: method.name.clone(),
        tx_id,
        reason,
    };
    let log = logs.last().ok_or_else(|| failure("no return log".into()))?;
    if !log.starts_with(&RETURN_LOG_PREFIX) {
        return Err(failure("last log is not a return log".into()));
    }
    decode(returns, &log[RETURN_LOG_PREFIX.len()..])
        .map(Some)
        .map_err(|e| failure(e.to_string()))
}
