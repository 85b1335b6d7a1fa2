//! # Application Lifecycle Service
//!
//! Orchestrates the lifecycle operations over a network handle: compile,
//! build, sign, submit, confirm. Operations run one at a time from the
//! caller's point of view; each returns only after its confirmation wait.
//!
//! ## Statistics
//!
//! `submitted` counts broadcasts the network accepted, `confirmed` counts
//! operations that completed, `failed` counts operations that returned an
//! error at any stage.

use crate::compiler::compile_pair;
use crate::composer::{
    resolve, AtomicGroup, ComposerStatus, GroupExecution, MethodArgValue, MethodCallRequest,
    MethodResult,
};
use crate::config::LifecycleConfig;
use crate::confirmation::ConfirmationEngine;
use crate::domain::builder::{build, AppOperation, CallParams};
use crate::domain::entities::{ApplicationInfo, ConfirmationResult, LocalState};
use crate::domain::signer::{sign, Account};
use crate::domain::value_objects::{CompiledProgram, OperationKind, ProgramRole, StateSchema};
use crate::errors::{CompileError, ComposerError, LifecycleError, NetworkError, StageError};
use crate::ports::inbound::{ApplicationLifecycleApi, CreateAppRequest, CreatedApp};
use crate::ports::outbound::AlgodApi;

use app_abi::contract::{AppSpec, ContractInterface, StateCounts};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use shared_types::{Address, ApplicationId};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

/// Statistics for the lifecycle service.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStats {
    /// Broadcasts accepted by the network.
    pub submitted: u64,
    /// Operations confirmed on-chain.
    pub confirmed: u64,
    /// Operations that returned an error.
    pub failed: u64,
}

/// The lifecycle service.
pub struct ApplicationLifecycleService<N: AlgodApi> {
    network: Arc<N>,
    config: LifecycleConfig,
    engine: ConfirmationEngine,
    stats: Arc<RwLock<ServiceStats>>,
}

impl<N: AlgodApi> ApplicationLifecycleService<N> {
    /// Create a new service over `network`.
    pub fn new(network: Arc<N>, config: LifecycleConfig) -> Self {
        let engine = ConfirmationEngine::new(config.confirmation.clone());
        Self {
            network,
            config,
            engine,
            stats: Arc::new(RwLock::new(ServiceStats::default())),
        }
    }

    #[must_use]
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    #[must_use]
    pub fn network(&self) -> &Arc<N> {
        &self.network
    }

    #[must_use]
    pub fn engine(&self) -> &ConfirmationEngine {
        &self.engine
    }

    /// Get current service statistics.
    pub async fn stats(&self) -> ServiceStats {
        *self.stats.read().await
    }

    /// Deploys the application described by an ARC-32 spec.
    ///
    /// Sources and schemas come from the spec.
    pub async fn create_from_spec(
        &self,
        account: &Account,
        spec: &AppSpec,
        opt_in: bool,
    ) -> Result<CreatedApp, LifecycleError> {
        let (approval_source, clear_source) = match spec_sources(spec) {
            Ok(sources) => sources,
            Err(e) => {
                self.record_failure().await;
                return Err(LifecycleError::new(OperationKind::Create, e));
            }
        };

        let schema = |c: StateCounts| StateSchema::new(c.num_uints, c.num_byte_slices);
        let request = CreateAppRequest {
            approval_source,
            clear_source,
            global_schema: schema(spec.global_state),
            local_schema: schema(spec.local_state),
            extra_pages: 0,
            opt_in,
            params: CallParams::default(),
        };
        self.create_app(account, request).await
    }

    async fn record_failure(&self) {
        self.stats.write().await.failed += 1;
    }

    /// Builds, signs, submits and confirms one operation, keeping the counters.
    #[instrument(
        skip(self, account, operation, params),
        fields(
            kind = %operation.kind(),
            app_id = %operation.app_id(),
            network = %self.config.network
        )
    )]
    async fn run(
        &self,
        account: &Account,
        operation: AppOperation,
        params: CallParams,
        round_budget: Option<u64>,
    ) -> Result<ConfirmationResult, LifecycleError> {
        let result = self
            .run_inner(account, &operation, params, round_budget)
            .await;

        let mut stats = self.stats.write().await;
        match &result {
            Ok(confirmation) => {
                stats.confirmed += 1;
                info!(
                    tx_id = %confirmation.tx_id,
                    round = confirmation.confirmed_round,
                    "Operation confirmed"
                );
            }
            Err(e) => {
                stats.failed += 1;
                warn!(error = %e, ambiguous = e.is_ambiguous(), "Operation failed");
            }
        }
        result
    }

    async fn run_inner(
        &self,
        account: &Account,
        operation: &AppOperation,
        params: CallParams,
        round_budget: Option<u64>,
    ) -> Result<ConfirmationResult, LifecycleError> {
        let kind = operation.kind();
        let params = CallParams {
            sender: account.address(),
            ..params
        };

        let net = self
            .network
            .suggested_params()
            .await
            .map_err(|e| LifecycleError::new(kind, e))?;
        let envelope =
            build(operation, &params, &net).map_err(|e| LifecycleError::new(kind, e))?;
        let (tx_id, signed) =
            sign(&envelope, account).map_err(|e| LifecycleError::new(kind, e))?;

        self.engine
            .submit(self.network.as_ref(), &[signed])
            .await
            .map_err(|e| LifecycleError::new(kind, e))?;
        self.stats.write().await.submitted += 1;

        let budget = round_budget.unwrap_or_else(|| self.engine.default_budget());
        self.engine
            .await_confirmation(self.network.as_ref(), tx_id, budget)
            .await
            .map_err(|e| LifecycleError::new(kind, e))
    }

    async fn run_programs(
        &self,
        account: &Account,
        kind: OperationKind,
        approval_source: &str,
        clear_source: &str,
        operation: impl FnOnce(CompiledProgram, CompiledProgram) -> AppOperation,
        params: CallParams,
    ) -> Result<ConfirmationResult, LifecycleError> {
        let (approval, clear) =
            match compile_pair(self.network.as_ref(), approval_source, clear_source).await {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(%kind, error = %e, "Program compilation failed");
                    self.record_failure().await;
                    return Err(LifecycleError::new(kind, e));
                }
            };
        self.run(account, operation(approval, clear), params, None)
            .await
    }
}

/// Decodes the base64 program sources embedded in an app spec.
fn spec_sources(spec: &AppSpec) -> Result<(String, String), CompileError> {
    let sources = spec.sources.as_ref().ok_or(CompileError::InvalidSource {
        role: ProgramRole::Approval,
        reason: "app spec has no source".into(),
    })?;
    let decode = |role: ProgramRole, b64: &str| -> Result<String, CompileError> {
        let invalid = |reason: String| CompileError::InvalidSource { role, reason };
        let bytes = B64.decode(b64).map_err(|e| invalid(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| invalid(e.to_string()))
    };
    Ok((
        decode(ProgramRole::Approval, &sources.approval_b64)?,
        decode(ProgramRole::Clear, &sources.clear_b64)?,
    ))
}

#[async_trait]
impl<N: AlgodApi> ApplicationLifecycleApi for ApplicationLifecycleService<N> {
    async fn create_app(
        &self,
        account: &Account,
        request: CreateAppRequest,
    ) -> Result<CreatedApp, LifecycleError> {
        let CreateAppRequest {
            approval_source,
            clear_source,
            global_schema,
            local_schema,
            extra_pages,
            opt_in,
            params,
        } = request;

        let confirmation = self
            .run_programs(
                account,
                OperationKind::Create,
                &approval_source,
                &clear_source,
                |approval, clear| AppOperation::Create {
                    approval,
                    clear,
                    global_schema,
                    local_schema,
                    extra_pages,
                    opt_in,
                },
                params,
            )
            .await?;

        let Some(app_id) = confirmation.application_id.filter(|id| !id.is_none()) else {
            return Err(LifecycleError::new(
                OperationKind::Create,
                StageError::MissingCreatedId(confirmation.tx_id),
            ));
        };
        info!(%app_id, creator = %account.address(), "Application created");
        Ok(CreatedApp {
            app_id,
            address: app_id.address(),
            confirmation,
        })
    }

    async fn opt_in(
        &self,
        account: &Account,
        app_id: ApplicationId,
    ) -> Result<ConfirmationResult, LifecycleError> {
        self.run(account, AppOperation::OptIn { app_id }, CallParams::default(), None)
            .await
    }

    async fn call(
        &self,
        account: &Account,
        app_id: ApplicationId,
        params: CallParams,
    ) -> Result<ConfirmationResult, LifecycleError> {
        self.run(account, AppOperation::Call { app_id }, params, None)
            .await
    }

    async fn update(
        &self,
        account: &Account,
        app_id: ApplicationId,
        approval_source: &str,
        clear_source: &str,
    ) -> Result<ConfirmationResult, LifecycleError> {
        self.run_programs(
            account,
            OperationKind::Update,
            approval_source,
            clear_source,
            |approval, clear| AppOperation::Update {
                app_id,
                approval,
                clear,
            },
            CallParams::default(),
        )
        .await
    }

    async fn close_out(
        &self,
        account: &Account,
        app_id: ApplicationId,
    ) -> Result<ConfirmationResult, LifecycleError> {
        self.run(account, AppOperation::CloseOut { app_id }, CallParams::default(), None)
            .await
    }

    async fn clear_state(
        &self,
        account: &Account,
        app_id: ApplicationId,
    ) -> Result<ConfirmationResult, LifecycleError> {
        self.run(account, AppOperation::ClearState { app_id }, CallParams::default(), None)
            .await
    }

    async fn delete(
        &self,
        account: &Account,
        app_id: ApplicationId,
    ) -> Result<ConfirmationResult, LifecycleError> {
        self.run(account, AppOperation::Delete { app_id }, CallParams::default(), None)
            .await
    }

    async fn submit(
        &self,
        account: &Account,
        operation: AppOperation,
        params: CallParams,
        round_budget: Option<u64>,
    ) -> Result<ConfirmationResult, LifecycleError> {
        self.run(account, operation, params, round_budget).await
    }

    #[instrument(
        skip(self, signer, contract, args),
        fields(app_id = %app_id, contract = %contract.name)
    )]
    async fn call_method(
        &self,
        signer: Arc<Account>,
        app_id: ApplicationId,
        contract: &ContractInterface,
        method: &str,
        args: Vec<MethodArgValue>,
    ) -> Result<MethodResult, LifecycleError> {
        let kind = OperationKind::MethodCall;
        let method = match resolve(contract, method, &args) {
            Ok(method) => method,
            Err(e) => {
                warn!(error = %e, "Method resolution failed");
                self.record_failure().await;
                return Err(LifecycleError::new(kind, e));
            }
        };

        let mut group = AtomicGroup::new();
        let request = MethodCallRequest::new(method, AppOperation::Call { app_id }, signer)
            .with_args(args);
        let added = group.add_method_call(request);
        let execution = match added {
            Ok(()) => self.execute_group(&mut group).await,
            Err(e) => {
                self.record_failure().await;
                Err(e)
            }
        };

        execution
            .and_then(|execution| {
                execution
                    .method_results
                    .into_iter()
                    .next()
                    .ok_or(ComposerError::EmptyGroup)
            })
            .map_err(|e| LifecycleError::new(kind, e))
    }

    #[instrument(skip(self, group), fields(txns = group.len(), network = %self.config.network))]
    async fn execute_group(
        &self,
        group: &mut AtomicGroup,
    ) -> Result<GroupExecution, ComposerError> {
        let result = group
            .execute(self.network.as_ref(), &self.engine, None)
            .await;

        let mut stats = self.stats.write().await;
        if matches!(
            group.status(),
            ComposerStatus::Submitted | ComposerStatus::Committed
        ) {
            stats.submitted += 1;
        }
        match &result {
            Ok(execution) => {
                stats.confirmed += 1;
                info!(
                    round = execution.confirmed_round,
                    calls = execution.method_results.len(),
                    "Group confirmed"
                );
            }
            Err(e) => {
                stats.failed += 1;
                warn!(error = %e, ambiguous = e.is_ambiguous(), "Group failed");
            }
        }
        result
    }

    async fn application(&self, app_id: ApplicationId) -> Result<ApplicationInfo, NetworkError> {
        self.network.application(app_id).await
    }

    async fn local_state(
        &self,
        address: &Address,
        app_id: ApplicationId,
    ) -> Result<LocalState, NetworkError> {
        self.network.account_application(address, app_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryAlgod;
    use crate::composer::RETURN_LOG_PREFIX;
    use crate::config::ConfirmationConfig;
    use crate::domain::entities::StateValue;
    use crate::errors::{ConfirmationError, ValidationError};
    use app_abi::errors::AbiError;
    use app_abi::value::AbiValue;

    const APPROVAL: &str = "#pragma version 8\nint 1\nreturn";
    const CLEAR: &str = "#pragma version 8\nint 1";

    fn service() -> ApplicationLifecycleService<InMemoryAlgod> {
        ApplicationLifecycleService::new(Arc::new(InMemoryAlgod::new()), LifecycleConfig::default())
    }

    async fn create(
        service: &ApplicationLifecycleService<InMemoryAlgod>,
        account: &Account,
    ) -> CreatedApp {
        let request = CreateAppRequest::new(APPROVAL, CLEAR)
            .with_schemas(StateSchema::new(1, 1), StateSchema::new(1, 0));
        service.create_app(account, request).await.unwrap()
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let service = service();
        let creator = Account::generate();
        let user = Account::generate();

        let app = create(&service, &creator).await;
        assert_eq!(app.app_id, ApplicationId(1001));
        assert_eq!(app.address, ApplicationId(1001).address());

        let info = service.application(app.app_id).await.unwrap();
        assert_eq!(info.creator, creator.address());
        assert_eq!(info.global_schema, StateSchema::new(1, 1));

        service.opt_in(&user, app.app_id).await.unwrap();
        assert!(service.network().is_opted_in(user.address(), app.app_id));

        service
            .network()
            .set_local_state(user.address(), app.app_id, b"count", StateValue::Uint(3));
        let local = service.local_state(&user.address(), app.app_id).await.unwrap();
        assert_eq!(local.get(b"count"), Some(&StateValue::Uint(3)));

        service
            .call(&user, app.app_id, CallParams::default().with_args(vec![b"inc".to_vec()]))
            .await
            .unwrap();
        service.close_out(&user, app.app_id).await.unwrap();
        assert!(!service.network().is_opted_in(user.address(), app.app_id));

        service
            .update(&creator, app.app_id, "#pragma version 8\nint 0", CLEAR)
            .await
            .unwrap();
        service.delete(&creator, app.app_id).await.unwrap();
        assert!(matches!(
            service.application(app.app_id).await,
            Err(NetworkError::NotFound(_))
        ));

        let stats = service.stats().await;
        assert_eq!(stats, ServiceStats { submitted: 6, confirmed: 6, failed: 0 });
    }

    #[tokio::test]
    async fn test_create_with_opt_in() {
        let service = service();
        let creator = Account::generate();
        let request = CreateAppRequest::new(APPROVAL, CLEAR).with_opt_in();
        let app = service.create_app(&creator, request).await.unwrap();
        assert!(service.network().is_opted_in(creator.address(), app.app_id));

        service.clear_state(&creator, app.app_id).await.unwrap();
        assert!(!service.network().is_opted_in(creator.address(), app.app_id));
    }

    #[tokio::test]
    async fn test_compile_failure_never_broadcasts() {
        let service = service();
        service.network().reject_compile("unknown opcode");
        let err = service
            .create_app(&Account::generate(), CreateAppRequest::new("bogus", CLEAR))
            .await
            .unwrap_err();

        assert_eq!(err.kind, OperationKind::Create);
        assert!(matches!(err.source, StageError::Compile(CompileError::Rejected { .. })));
        assert_eq!(service.network().stats().broadcasts, 0);
        assert_eq!(service.stats().await.failed, 1);
    }

    #[tokio::test]
    async fn test_validation_failure_names_operation() {
        let service = service();
        let err = service
            .opt_in(&Account::generate(), ApplicationId::NONE)
            .await
            .unwrap_err();
        assert!(matches!(
            err.source,
            StageError::Validation(ValidationError::MissingApplicationId { .. })
        ));
        assert_eq!(err.to_string(), "opt-in failed: opt-in requires an application id");
        assert_eq!(service.network().stats().broadcasts, 0);
    }

    #[tokio::test]
    async fn test_timeout_is_ambiguous_and_counted() {
        let network = Arc::new(InMemoryAlgod::new());
        let config = LifecycleConfig {
            confirmation: ConfirmationConfig { max_rounds_to_wait: 2 },
            ..LifecycleConfig::default()
        };
        let service = ApplicationLifecycleService::new(Arc::clone(&network), config);
        let account = Account::generate();
        let app = create(&service, &account).await;

        network.hold_transactions();
        let err = service
            .call(&account, app.app_id, CallParams::default())
            .await
            .unwrap_err();
        assert!(err.is_ambiguous());
        assert!(matches!(
            err.source,
            StageError::Confirmation(ConfirmationError::Timeout { rounds: 2, .. })
        ));

        let stats = service.stats().await;
        assert_eq!(stats.submitted, 2);
        assert_eq!(stats.confirmed, 1);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn test_submit_with_zero_budget() {
        let service = service();
        let account = Account::generate();
        let app = create(&service, &account).await;
        let err = service
            .submit(
                &account,
                AppOperation::Call { app_id: app.app_id },
                CallParams::default(),
                Some(0),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err.source,
            StageError::Confirmation(ConfirmationError::Timeout { rounds: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_call_method_echo() {
        let service = service();
        let account = Arc::new(Account::generate());
        let app = create(&service, &account).await;
        service.network().echo_first_argument();

        let contract = ContractInterface {
            name: "Hello".into(),
            description: None,
            networks: Default::default(),
            methods: vec![app_abi::method::Method::from_signature("hello(string)string").unwrap()],
        };
        let result = service
            .call_method(
                Arc::clone(&account),
                app.app_id,
                &contract,
                "hello",
                vec![MethodArgValue::value("world")],
            )
            .await
            .unwrap();
        assert_eq!(result.return_value, Ok(Some(AbiValue::from("world"))));
        assert!(result.confirmation.logs[0].starts_with(&RETURN_LOG_PREFIX));
    }

    #[tokio::test]
    async fn test_missing_method_never_broadcasts() {
        let service = service();
        let contract = ContractInterface {
            name: "Hello".into(),
            description: None,
            networks: Default::default(),
            methods: Vec::new(),
        };
        let err = service
            .call_method(
                Arc::new(Account::generate()),
                ApplicationId(5),
                &contract,
                "missing",
                Vec::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, OperationKind::MethodCall);
        assert!(matches!(
            err.source,
            StageError::Composer(ComposerError::Abi(AbiError::MethodNotFound { .. }))
        ));
        assert_eq!(service.network().stats().broadcasts, 0);
        assert_eq!(service.stats().await.failed, 1);
    }

    #[tokio::test]
    async fn test_create_from_spec() {
        let service = service();
        let spec = AppSpec::from_json(&format!(
            r#"{{
                "source": {{ "approval": "{}", "clear": "{}" }},
                "state": {{
                    "global": {{ "num_uints": 2, "num_byte_slices": 1 }},
                    "local": {{ "num_uints": 0, "num_byte_slices": 1 }}
                }},
                "contract": {{ "name": "Counter", "methods": [] }}
            }}"#,
            B64.encode(APPROVAL),
            B64.encode(CLEAR)
        ))
        .unwrap();

        let app = service
            .create_from_spec(&Account::generate(), &spec, false)
            .await
            .unwrap();
        let info = service.application(app.app_id).await.unwrap();
        assert_eq!(info.global_schema, StateSchema::new(2, 1));
        assert_eq!(info.local_schema, StateSchema::new(0, 1));
    }

    #[tokio::test]
    async fn test_create_from_spec_without_sources() {
        let service = service();
        let spec =
            AppSpec::from_json(r#"{ "contract": { "name": "Bare", "methods": [] } }"#).unwrap();
        let err = service
            .create_from_spec(&Account::generate(), &spec, false)
            .await
            .unwrap_err();
        assert!(matches!(
            err.source,
            StageError::Compile(CompileError::InvalidSource { .. })
        ));
        assert_eq!(service.network().stats().compiles, 0);
    }
}
