//! # Method Call Flows
//!
//! ABI method calls resolved from a contract description, composed into
//! atomic groups and decoded from the confirmed call's logs.

#[cfg(test)]
mod tests {
    use super::super::fixtures::{account, counter_contract, Harness, APPROVAL, CLEAR};
    use app_abi::errors::AbiError;
    use app_abi::value::AbiValue;
    use app_lifecycle::composer::{
        AtomicGroup, ComposerStatus, MethodArgValue, MethodCallRequest, RETURN_LOG_PREFIX,
    };
    use app_lifecycle::domain::builder::AppOperation;
    use app_lifecycle::domain::entities::AppCallFields;
    use app_lifecycle::errors::{ComposerError, StageError};
    use app_lifecycle::ports::inbound::{ApplicationLifecycleApi, CreateAppRequest};
    use shared_types::ApplicationId;
    use std::sync::Arc;

    async fn deploy(harness: &Harness) -> anyhow::Result<ApplicationId> {
        let app = harness
            .service
            .create_app(&account(20), CreateAppRequest::new(APPROVAL, CLEAR))
            .await?;
        Ok(app.app_id)
    }

    fn returned(bytes: &[u8]) -> Vec<u8> {
        let mut log = RETURN_LOG_PREFIX.to_vec();
        log.extend_from_slice(bytes);
        log
    }

    /// Application whose `add(uint64,uint64)` logs the sum.
    fn summing_logger(fields: &AppCallFields) -> Vec<Vec<u8>> {
        let word = |i: usize| {
            fields
                .app_args
                .get(i)
                .and_then(|a| <[u8; 8]>::try_from(a.as_slice()).ok())
                .map(u64::from_be_bytes)
        };
        match (word(1), word(2)) {
            (Some(a), Some(b)) => vec![returned(&(a + b).to_be_bytes())],
            _ => Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_hello_world() -> anyhow::Result<()> {
        let harness = Harness::new();
        let app_id = deploy(&harness).await?;
        harness.network.echo_first_argument();

        let result = harness
            .service
            .call_method(
                Arc::new(account(21)),
                app_id,
                &counter_contract(),
                "hello",
                vec![MethodArgValue::value("world")],
            )
            .await?;

        assert_eq!(result.method.signature(), "hello(string)string");
        assert_eq!(result.return_value?, Some(AbiValue::from("world")));
        Ok(())
    }

    #[tokio::test]
    async fn test_overloads_resolve_by_signature() -> anyhow::Result<()> {
        let harness = Harness::new();
        let app_id = deploy(&harness).await?;
        harness.network.set_logger(Arc::new(summing_logger));
        let caller = Arc::new(account(22));
        let args = vec![MethodArgValue::value(2u64), MethodArgValue::value(3u64)];

        let err = harness
            .service
            .call_method(
                Arc::clone(&caller),
                app_id,
                &counter_contract(),
                "add",
                args.clone(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err.source,
            StageError::Composer(ComposerError::Abi(AbiError::MethodNotFound { .. }))
        ));

        let result = harness
            .service
            .call_method(
                caller,
                app_id,
                &counter_contract(),
                "add(uint64,uint64)uint64",
                args,
            )
            .await?;
        assert_eq!(result.return_value?, Some(AbiValue::from(5u64)));
        Ok(())
    }

    #[tokio::test]
    async fn test_group_with_payment_argument() -> anyhow::Result<()> {
        let harness = Harness::new();
        let app_id = deploy(&harness).await?;
        harness.network.echo_first_argument();
        let contract = counter_contract();
        let alice = Arc::new(account(23));
        let bob = Arc::new(account(24));

        let mut group = AtomicGroup::new();
        group.add_method_call(
            MethodCallRequest::new(
                contract.method_by_name("hello")?.clone(),
                AppOperation::Call { app_id },
                Arc::clone(&alice),
            )
            .with_args(vec![MethodArgValue::value("alice")]),
        )?;
        group.add_method_call(
            MethodCallRequest::new(
                contract.method_by_name("deposit")?.clone(),
                AppOperation::Call { app_id },
                Arc::clone(&bob),
            )
            .with_args(vec![
                MethodArgValue::Payment {
                    receiver: app_id.address(),
                    amount: 250_000,
                },
                MethodArgValue::value("rent"),
            ]),
        )?;

        let execution = harness.service.execute_group(&mut group).await?;

        assert_eq!(group.status(), ComposerStatus::Committed);
        let group_id = execution.group_id.expect("three transactions are grouped");
        assert!(group
            .transactions()
            .iter()
            .all(|tx| tx.header.group == Some(group_id)));
        assert_eq!(execution.tx_ids.len(), 3);
        assert_eq!(group.transactions()[1].type_tag(), "pay");

        let returns = execution
            .method_results
            .into_iter()
            .map(|r| r.return_value)
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(
            returns,
            vec![Some(AbiValue::from("alice")), Some(AbiValue::from("rent"))]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_account_reference_becomes_index() -> anyhow::Result<()> {
        let harness = Harness::new();
        let app_id = deploy(&harness).await?;
        harness.network.echo_first_argument();
        let caller = Arc::new(account(25));
        let other = account(26);

        let own = harness
            .service
            .call_method(
                Arc::clone(&caller),
                app_id,
                &counter_contract(),
                "slot_of",
                vec![MethodArgValue::value(caller.address())],
            )
            .await?;
        let foreign = harness
            .service
            .call_method(
                caller,
                app_id,
                &counter_contract(),
                "slot_of",
                vec![MethodArgValue::value(other.address())],
            )
            .await?;

        assert_eq!(own.return_value?, Some(AbiValue::from(0u64)));
        assert_eq!(foreign.return_value?, Some(AbiValue::from(1u64)));
        Ok(())
    }

    #[tokio::test]
    async fn test_void_method_and_missing_log() -> anyhow::Result<()> {
        let harness = Harness::new();
        let app_id = deploy(&harness).await?;
        let caller = Arc::new(account(27));

        let reset = harness
            .service
            .call_method(
                Arc::clone(&caller),
                app_id,
                &counter_contract(),
                "reset",
                Vec::new(),
            )
            .await?;
        assert_eq!(reset.return_value, Ok(None));

        // No logger installed: the call confirms but carries no return log.
        let hello = harness
            .service
            .call_method(
                caller,
                app_id,
                &counter_contract(),
                "hello",
                vec![MethodArgValue::value("anyone")],
            )
            .await?;
        assert!(hello.confirmation.confirmed_round > 0);
        let err = hello.return_value.unwrap_err();
        assert_eq!(err.tx_id, hello.tx_id);
        Ok(())
    }

    #[tokio::test]
    async fn test_last_return_log_wins() -> anyhow::Result<()> {
        let harness = Harness::new();
        let app_id = deploy(&harness).await?;
        harness.network.set_logger(Arc::new(|_: &AppCallFields| {
            vec![
                returned(&[0, 1, b'a']),
                b"trace: step 2".to_vec(),
                returned(&[0, 1, b'b']),
            ]
        }));

        let result = harness
            .service
            .call_method(
                Arc::new(account(28)),
                app_id,
                &counter_contract(),
                "hello",
                vec![MethodArgValue::value("ignored")],
            )
            .await?;
        assert_eq!(result.return_value?, Some(AbiValue::from("b")));
        assert_eq!(result.confirmation.logs.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_trailing_trace_log_hides_return() -> anyhow::Result<()> {
        let harness = Harness::new();
        let app_id = deploy(&harness).await?;
        harness.network.set_logger(Arc::new(|_: &AppCallFields| {
            vec![returned(&[0, 1, b'a']), b"trace: done".to_vec()]
        }));

        let result = harness
            .service
            .call_method(
                Arc::new(account(29)),
                app_id,
                &counter_contract(),
                "hello",
                vec![MethodArgValue::value("ignored")],
            )
            .await?;
        let err = result.return_value.unwrap_err();
        assert_eq!(err.tx_id, result.tx_id);
        assert_eq!(result.confirmation.logs.len(), 2);
        Ok(())
    }
}
