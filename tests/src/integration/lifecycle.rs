//! # Lifecycle Flows
//!
//! An application from deployment to deletion, through the service API.

#[cfg(test)]
mod tests {
    use super::super::fixtures::{account, counter_spec, Harness, APPROVAL, CLEAR};
    use app_lifecycle::domain::builder::CallParams;
    use app_lifecycle::domain::entities::StateValue;
    use app_lifecycle::domain::value_objects::StateSchema;
    use app_lifecycle::errors::NetworkError;
    use app_lifecycle::ports::inbound::{ApplicationLifecycleApi, CreateAppRequest};
    use app_lifecycle::service::ServiceStats;

    #[tokio::test]
    async fn test_counter_from_app_spec() -> anyhow::Result<()> {
        let harness = Harness::new();
        let creator = account(1);
        let user = account(2);

        let app = harness
            .service
            .create_from_spec(&creator, &counter_spec(), false)
            .await?;
        let info = harness.service.application(app.app_id).await?;
        assert_eq!(info.creator, creator.address());
        assert_eq!(info.global_schema, StateSchema::new(1, 0));
        assert_eq!(info.local_schema, StateSchema::new(1, 1));

        harness.service.opt_in(&user, app.app_id).await?;
        harness
            .network
            .set_local_state(user.address(), app.app_id, b"calls", StateValue::Uint(0));
        harness
            .service
            .call(
                &user,
                app.app_id,
                CallParams::default().with_args(vec![b"increment".to_vec()]),
            )
            .await?;
        harness
            .network
            .set_global_state(app.app_id, b"total", StateValue::Uint(1));

        let info = harness.service.application(app.app_id).await?;
        assert_eq!(info.global(b"total"), Some(&StateValue::Uint(1)));
        let local = harness.service.local_state(&user.address(), app.app_id).await?;
        assert_eq!(local.get(b"calls"), Some(&StateValue::Uint(0)));

        harness.service.close_out(&user, app.app_id).await?;
        assert!(matches!(
            harness.service.local_state(&user.address(), app.app_id).await,
            Err(NetworkError::NotFound(_))
        ));

        harness.service.delete(&creator, app.app_id).await?;
        assert!(harness.service.application(app.app_id).await.is_err());

        assert_eq!(
            harness.service.stats().await,
            ServiceStats {
                submitted: 5,
                confirmed: 5,
                failed: 0
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_update_replaces_programs_only() -> anyhow::Result<()> {
        let harness = Harness::new();
        let creator = account(3);
        let request = CreateAppRequest::new(APPROVAL, CLEAR)
            .with_schemas(StateSchema::new(4, 2), StateSchema::EMPTY)
            .with_extra_pages(1);
        let app = harness.service.create_app(&creator, request).await?;
        let before = harness.service.application(app.app_id).await?;

        harness
            .service
            .update(&creator, app.app_id, "#pragma version 9\nint 1", CLEAR)
            .await?;
        let after = harness.service.application(app.app_id).await?;

        assert_ne!(before.approval_program, after.approval_program);
        assert_eq!(before.clear_program, after.clear_program);
        assert_eq!(after.global_schema, StateSchema::new(4, 2));
        assert_eq!(after.extra_pages, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_sequential_creates_get_distinct_ids() -> anyhow::Result<()> {
        let harness = Harness::new();
        let creator = account(4);
        let first = harness
            .service
            .create_app(&creator, CreateAppRequest::new(APPROVAL, CLEAR))
            .await?;
        let second = harness
            .service
            .create_app(&creator, CreateAppRequest::new(APPROVAL, CLEAR))
            .await?;

        assert_ne!(first.app_id, second.app_id);
        assert_ne!(first.address, second.address);
        assert!(second.confirmation.confirmed_round > first.confirmation.confirmed_round);
        Ok(())
    }

    #[tokio::test]
    async fn test_independent_accounts_opt_in_concurrently() -> anyhow::Result<()> {
        let harness = Harness::new();
        let app = harness
            .service
            .create_app(&account(5), CreateAppRequest::new(APPROVAL, CLEAR))
            .await?;

        let (alice, bob) = (account(6), account(7));
        let (a, b) = tokio::join!(
            harness.service.opt_in(&alice, app.app_id),
            harness.service.opt_in(&bob, app.app_id),
        );
        a?;
        b?;

        assert!(harness.network.is_opted_in(alice.address(), app.app_id));
        assert!(harness.network.is_opted_in(bob.address(), app.app_id));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_with_creator_opt_in_then_clear_state() -> anyhow::Result<()> {
        let harness = Harness::new();
        let creator = account(8);
        let app = harness
            .service
            .create_app(&creator, CreateAppRequest::new(APPROVAL, CLEAR).with_opt_in())
            .await?;
        assert!(harness.network.is_opted_in(creator.address(), app.app_id));

        harness.service.clear_state(&creator, app.app_id).await?;
        assert!(!harness.network.is_opted_in(creator.address(), app.app_id));
        Ok(())
    }
}
