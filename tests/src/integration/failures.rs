//! # Failure Flows
//!
//! How each failure class surfaces: before broadcast, at broadcast, and
//! while waiting for confirmation.

#[cfg(test)]
mod tests {
    use super::super::fixtures::{account, counter_contract, Harness, APPROVAL, CLEAR};
    use app_lifecycle::adapters::StaticCredentials;
    use app_lifecycle::composer::{AtomicGroup, MethodArgValue, MethodCallRequest};
    use app_lifecycle::confirmation::ConfirmationEngine;
    use app_lifecycle::domain::builder::{build, limits, AppOperation, CallParams};
    use app_lifecycle::domain::signer::sign;
    use app_lifecycle::errors::{
        ComposerError, ConfirmationError, CredentialError, SignerError, StageError,
        ValidationError,
    };
    use app_lifecycle::ports::inbound::{ApplicationLifecycleApi, CreateAppRequest};
    use app_lifecycle::ports::outbound::{AlgodApi, CredentialSource};
    use shared_types::ApplicationId;
    use std::sync::Arc;

    async fn deploy(harness: &Harness) -> anyhow::Result<ApplicationId> {
        let app = harness
            .service
            .create_app(&account(40), CreateAppRequest::new(APPROVAL, CLEAR))
            .await?;
        Ok(app.app_id)
    }

    #[tokio::test]
    async fn test_stale_params_fail_at_broadcast() {
        let harness = Harness::new();
        harness.network.serve_stale_params();

        let err = harness
            .service
            .create_app(&account(41), CreateAppRequest::new(APPROVAL, CLEAR))
            .await
            .unwrap_err();

        let StageError::Broadcast(broadcast) = &err.source else {
            panic!("expected broadcast error, got {err}");
        };
        assert!(broadcast.reason.contains("txn dead"));
        assert!(!err.is_ambiguous());
        assert_eq!(err.tx_id(), Some(broadcast.tx_id));

        let stats = harness.service.stats().await;
        assert_eq!((stats.submitted, stats.failed), (0, 1));
        assert_eq!(harness.network.stats().broadcasts, 1);
    }

    #[tokio::test]
    async fn test_unknown_application_rejected() {
        let harness = Harness::new();
        let err = harness
            .service
            .opt_in(&account(42), ApplicationId(424_242))
            .await
            .unwrap_err();
        assert!(matches!(&err.source, StageError::Broadcast(b) if b.reason.contains("does not exist")));
    }

    #[tokio::test]
    async fn test_pool_eviction_is_rejection() -> anyhow::Result<()> {
        let harness = Harness::new();
        let app_id = deploy(&harness).await?;
        harness.network.evict_transactions("fee too low");

        let err = harness
            .service
            .call(&account(43), app_id, CallParams::default())
            .await
            .unwrap_err();
        assert!(matches!(
            &err.source,
            StageError::Confirmation(ConfirmationError::Rejected { reason, .. }) if reason == "fee too low"
        ));
        assert!(!err.is_ambiguous());
        Ok(())
    }

    #[tokio::test]
    async fn test_timeout_is_ambiguous() -> anyhow::Result<()> {
        let harness = Harness::with_budget(3);
        let app_id = deploy(&harness).await?;
        harness.network.hold_transactions();
        let waits_before = harness.network.stats().block_waits;

        let err = harness
            .service
            .call(&account(44), app_id, CallParams::default())
            .await
            .unwrap_err();

        assert!(err.is_ambiguous());
        let tx_id = err.tx_id().expect("timeout names its transaction");
        assert_eq!(harness.network.stats().block_waits - waits_before, 3);

        // The network still knows the transaction; it is simply unconfirmed.
        let pending = harness.network.pending_transaction(&tx_id).await?;
        assert_eq!(pending.map(|p| p.confirmed_round), Some(None));
        Ok(())
    }

    #[tokio::test]
    async fn test_node_unreachable_before_submission() {
        let harness = Harness::new();
        harness.network.go_offline("connection refused");
        let err = harness
            .service
            .create_app(&account(45), CreateAppRequest::new(APPROVAL, CLEAR))
            .await
            .unwrap_err();
        assert!(matches!(err.source, StageError::Compile(_)));

        harness.network.go_online();
        let app = harness
            .service
            .create_app(&account(45), CreateAppRequest::new(APPROVAL, CLEAR))
            .await;
        assert!(app.is_ok());
    }

    #[tokio::test]
    async fn test_validation_before_any_network_call() {
        let harness = Harness::new();
        let args = vec![vec![0u8]; limits::MAX_APP_ARGS + 1];
        let err = harness
            .service
            .call(
                &account(46),
                ApplicationId(7),
                CallParams::default().with_args(args),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err.source,
            StageError::Validation(ValidationError::TooManyAppArgs { count: 17, max: 16 })
        ));
        assert_eq!(harness.network.stats().broadcasts, 0);
    }

    #[tokio::test]
    async fn test_group_signer_must_match_sender() -> anyhow::Result<()> {
        let harness = Harness::new();
        let app_id = deploy(&harness).await?;
        let signer = Arc::new(account(47));
        let impostor = account(48);

        let mut request = MethodCallRequest::new(
            counter_contract().method_by_name("reset")?.clone(),
            AppOperation::Call { app_id },
            signer,
        );
        request.params.sender = impostor.address();
        let mut group = AtomicGroup::new();
        group.add_method_call(request)?;

        let broadcasts_before = harness.network.stats().broadcasts;
        let err = harness.service.execute_group(&mut group).await.unwrap_err();
        assert!(matches!(
            err,
            ComposerError::Signer(SignerError::KeyMismatch { expected, .. }) if expected == impostor.address()
        ));
        assert_eq!(harness.network.stats().broadcasts, broadcasts_before);
        Ok(())
    }

    #[tokio::test]
    async fn test_wrong_argument_type_never_broadcasts() -> anyhow::Result<()> {
        let harness = Harness::new();
        let app_id = deploy(&harness).await?;
        let broadcasts_before = harness.network.stats().broadcasts;

        let err = harness
            .service
            .call_method(
                Arc::new(account(49)),
                app_id,
                &counter_contract(),
                "hello",
                vec![MethodArgValue::value(42u64)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err.source, StageError::Composer(ComposerError::Abi(_))));
        assert_eq!(harness.network.stats().broadcasts, broadcasts_before);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_wait() -> anyhow::Result<()> {
        let harness = Harness::new();
        let app_id = deploy(&harness).await?;
        harness.network.hold_transactions();

        let caller = account(50);
        let params = harness.network.suggested_params().await?;
        let tx = build(
            &AppOperation::Call { app_id },
            &CallParams::new(caller.address()),
            &params,
        )?;
        let (tx_id, signed) = sign(&tx, &caller)?;
        let engine = ConfirmationEngine::default();
        engine.submit(harness.network.as_ref(), &[signed]).await?;

        let deadline = harness.network.round() + 10;
        let network = Arc::clone(&harness.network);
        let cancel = async move {
            while network.round() < deadline {
                tokio::task::yield_now().await;
            }
        };
        let err = engine
            .await_confirmation_or_cancel(harness.network.as_ref(), tx_id, 1_000, cancel)
            .await
            .unwrap_err();
        assert_eq!(err, ConfirmationError::Cancelled(tx_id));
        Ok(())
    }

    #[test]
    fn test_credentials_check_expected_address() {
        let seed_hex = "07".repeat(32);
        let address = account(7).address().to_string();

        let loaded = StaticCredentials::from_hex(&seed_hex, Some(&address))
            .and_then(|c| c.load())
            .unwrap();
        assert_eq!(loaded.address().to_string(), address);

        let other = account(8).address().to_string();
        assert!(matches!(
            StaticCredentials::from_hex(&seed_hex, Some(&other)).and_then(|c| c.load()),
            Err(CredentialError::AddressMismatch { .. })
        ));
        assert!(matches!(
            StaticCredentials::from_hex("abcd", None),
            Err(CredentialError::InvalidKey(_))
        ));
    }
}
