//! # Submission & Confirmation Engine
//!
//! Broadcasts signed transactions and waits, round by round, for them to be
//! included. Waiting is paced by the network's block production rather
//! than by timers: each iteration suspends on "next block after round r".
//!
//! A broadcast error is terminal and never retried. A timeout is not a
//! failure verdict: the transaction may still confirm afterwards.

use crate::config::ConfirmationConfig;
use crate::domain::encoding::encode_signed_group;
use crate::domain::entities::{ConfirmationResult, SignedEnvelope};
use crate::errors::{BroadcastError, ConfirmationError, NetworkError};
use crate::ports::outbound::AlgodApi;
use shared_types::TransactionId;
use std::future::Future;
use tracing::{debug, info, instrument, warn};

/// Submits transactions and awaits their confirmation.
#[derive(Debug, Clone, Default)]
pub struct ConfirmationEngine {
    config: ConfirmationConfig,
}

impl ConfirmationEngine {
    #[must_use]
    pub fn new(config: ConfirmationConfig) -> Self {
        Self { config }
    }

    /// Round budget used when the caller does not pass one.
    #[must_use]
    pub fn default_budget(&self) -> u64 {
        self.config.max_rounds_to_wait
    }

    /// Broadcasts one transaction or a whole group in a single submission.
    ///
    /// Returns the id of the first transaction.
    #[instrument(skip(self, network, group), fields(txns = group.len()))]
    pub async fn submit<N: AlgodApi + ?Sized>(
        &self,
        network: &N,
        group: &[SignedEnvelope],
    ) -> Result<TransactionId, BroadcastError> {
        let Some(first) = group.first() else {
            return Err(BroadcastError {
                tx_id: TransactionId::default(),
                reason: "nothing to submit".into(),
            });
        };

        match network.broadcast(&encode_signed_group(group)).await {
            Ok(tx_id) => {
                info!(tx_id = %tx_id, "Transaction submitted");
                Ok(tx_id)
            }
            Err(e) => {
                warn!(tx_id = %first.id, error = %e, "Broadcast rejected");
                Err(BroadcastError {
                    tx_id: first.id,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Waits up to `round_budget` rounds for `tx_id` to be confirmed.
    ///
    /// A budget of zero reports a timeout without touching the network.
    #[instrument(skip(self, network), fields(tx_id = %tx_id))]
    pub async fn await_confirmation<N: AlgodApi + ?Sized>(
        &self,
        network: &N,
        tx_id: TransactionId,
        round_budget: u64,
    ) -> Result<ConfirmationResult, ConfirmationError> {
        if round_budget == 0 {
            return Err(ConfirmationError::Timeout { tx_id, rounds: 0 });
        }
        let network_error = |source: NetworkError| ConfirmationError::Network { tx_id, source };

        let start = network.status().await.map_err(network_error)?.last_round + 1;
        let end = start.saturating_add(round_budget);
        let mut current = start;

        while current < end {
            match network
                .pending_transaction(&tx_id)
                .await
                .map_err(network_error)?
            {
                Some(pending) => {
                    if let Some(round) = pending.confirmed_round.filter(|r| *r > 0) {
                        info!(round, "Transaction confirmed");
                        return Ok(ConfirmationResult::from_pending(tx_id, round, pending));
                    }
                    if !pending.pool_error.is_empty() {
                        warn!(reason = %pending.pool_error, "Transaction evicted from pool");
                        return Err(ConfirmationError::Rejected {
                            tx_id,
                            reason: pending.pool_error,
                        });
                    }
                }
                None => debug!(round = current, "Transaction not yet known"),
            }
            network
                .wait_for_block(current)
                .await
                .map_err(network_error)?;
            current += 1;
        }

        warn!(rounds = round_budget, "Transaction not confirmed within budget");
        Err(ConfirmationError::Timeout {
            tx_id,
            rounds: round_budget,
        })
    }

    /// [`Self::await_confirmation`] with the configured budget.
    pub async fn await_default<N: AlgodApi + ?Sized>(
        &self,
        network: &N,
        tx_id: TransactionId,
    ) -> Result<ConfirmationResult, ConfirmationError> {
        self.await_confirmation(network, tx_id, self.default_budget())
            .await
    }

    /// Like [`Self::await_confirmation`], abandoned as soon as `cancel` resolves.
    pub async fn await_confirmation_or_cancel<N, C>(
        &self,
        network: &N,
        tx_id: TransactionId,
        round_budget: u64,
        cancel: C,
    ) -> Result<ConfirmationResult, ConfirmationError>
    where
        N: AlgodApi + ?Sized,
        C: Future<Output = ()> + Send,
    {
        tokio::select! {
            result = self.await_confirmation(network, tx_id, round_budget) => result,
            () = cancel => {
                info!(tx_id = %tx_id, "Confirmation wait cancelled");
                Err(ConfirmationError::Cancelled(tx_id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryAlgod;
    use crate::domain::builder::{build, AppOperation, CallParams};
    use crate::domain::signer::{sign, Account};
    use crate::domain::value_objects::{CompiledProgram, ProgramRole, StateSchema};

    async fn signed_create(network: &InMemoryAlgod, account: &Account) -> SignedEnvelope {
        let op = AppOperation::Create {
            approval: CompiledProgram::from_bytecode(ProgramRole::Approval, vec![0x08, 1]),
            clear: CompiledProgram::from_bytecode(ProgramRole::Clear, vec![0x08, 1]),
            global_schema: StateSchema::EMPTY,
            local_schema: StateSchema::EMPTY,
            extra_pages: 0,
            opt_in: false,
        };
        let params = network.suggested_params().await.unwrap();
        let tx = build(&op, &CallParams::new(account.address()), &params).unwrap();
        sign(&tx, account).unwrap().1
    }

    #[tokio::test]
    async fn test_submit_and_confirm() {
        let network = InMemoryAlgod::new();
        let engine = ConfirmationEngine::default();
        let stx = signed_create(&network, &Account::generate()).await;

        let tx_id = engine.submit(&network, &[stx.clone()]).await.unwrap();
        assert_eq!(tx_id, stx.id);

        let result = engine.await_default(&network, tx_id).await.unwrap();
        assert_eq!(result.tx_id, tx_id);
        assert!(result.confirmed_round > 1000);
        assert!(result.application_id.is_some());
    }

    #[tokio::test]
    async fn test_zero_budget_times_out_without_polling() {
        let network = InMemoryAlgod::new();
        let engine = ConfirmationEngine::default();
        let stx = signed_create(&network, &Account::generate()).await;
        let tx_id = engine.submit(&network, &[stx]).await.unwrap();

        let before = network.stats();
        let err = engine
            .await_confirmation(&network, tx_id, 0)
            .await
            .unwrap_err();
        assert_eq!(err, ConfirmationError::Timeout { tx_id, rounds: 0 });

        let after = network.stats();
        assert_eq!(after.status_queries, before.status_queries);
        assert_eq!(after.pending_queries, before.pending_queries);
        assert_eq!(after.block_waits, before.block_waits);
    }

    #[tokio::test]
    async fn test_held_transaction_times_out_after_budget() {
        let network = InMemoryAlgod::new();
        network.hold_transactions();
        let engine = ConfirmationEngine::default();
        let stx = signed_create(&network, &Account::generate()).await;
        let tx_id = engine.submit(&network, &[stx]).await.unwrap();

        let err = engine
            .await_confirmation(&network, tx_id, 3)
            .await
            .unwrap_err();
        assert_eq!(err, ConfirmationError::Timeout { tx_id, rounds: 3 });
        assert_eq!(network.stats().block_waits, 3);
    }

    #[tokio::test]
    async fn test_delayed_confirmation_within_budget() {
        let network = InMemoryAlgod::new();
        network.set_confirmation_delay(2);
        let engine = ConfirmationEngine::default();
        let stx = signed_create(&network, &Account::generate()).await;
        let tx_id = engine.submit(&network, &[stx]).await.unwrap();

        let result = engine.await_confirmation(&network, tx_id, 4).await.unwrap();
        assert_eq!(result.confirmed_round, 1003);
    }

    #[tokio::test]
    async fn test_eviction_is_rejected() {
        let network = InMemoryAlgod::new();
        network.evict_transactions("overspend");
        let engine = ConfirmationEngine::default();
        let stx = signed_create(&network, &Account::generate()).await;
        let tx_id = engine.submit(&network, &[stx]).await.unwrap();

        let err = engine.await_default(&network, tx_id).await.unwrap_err();
        assert_eq!(
            err,
            ConfirmationError::Rejected {
                tx_id,
                reason: "overspend".into()
            }
        );
    }

    #[tokio::test]
    async fn test_broadcast_error_is_terminal() {
        let network = InMemoryAlgod::new();
        network.serve_stale_params();
        let engine = ConfirmationEngine::default();
        let stx = signed_create(&network, &Account::generate()).await;

        let err = engine.submit(&network, &[stx.clone()]).await.unwrap_err();
        assert_eq!(err.tx_id, stx.id);
        assert!(err.reason.contains("txn dead"));
        assert_eq!(network.stats().broadcasts, 1);
    }

    #[tokio::test]
    async fn test_network_failure_while_waiting() {
        let network = InMemoryAlgod::new();
        let engine = ConfirmationEngine::default();
        let stx = signed_create(&network, &Account::generate()).await;
        let tx_id = engine.submit(&network, &[stx]).await.unwrap();

        network.go_offline("connection reset");
        let err = engine.await_default(&network, tx_id).await.unwrap_err();
        assert!(matches!(err, ConfirmationError::Network { .. }));
    }

    #[tokio::test]
    async fn test_cancellation() {
        let network = InMemoryAlgod::new();
        network.hold_transactions();
        let engine = ConfirmationEngine::default();
        let stx = signed_create(&network, &Account::generate()).await;
        let tx_id = engine.submit(&network, &[stx]).await.unwrap();

        let err = engine
            .await_confirmation_or_cancel(&network, tx_id, 1_000, std::future::ready(()))
            .await
            .unwrap_err();
        assert_eq!(err, ConfirmationError::Cancelled(tx_id));
    }
}
