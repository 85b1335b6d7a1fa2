//! # Driving Ports (API - Inbound)
//!
//! The operations the lifecycle service offers. Each one is issued, signed,
//! broadcast and confirmed before it returns.

use crate::composer::{AtomicGroup, GroupExecution, MethodArgValue, MethodResult};
use crate::domain::builder::{AppOperation, CallParams};
use crate::domain::entities::{ApplicationInfo, ConfirmationResult, LocalState};
use crate::domain::signer::Account;
use crate::domain::value_objects::StateSchema;
use crate::errors::{ComposerError, LifecycleError, NetworkError};
use app_abi::contract::ContractInterface;
use async_trait::async_trait;
use shared_types::{Address, ApplicationId};
use std::sync::Arc;

/// Program sources and storage for a new application.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateAppRequest {
    pub approval_source: String,
    pub clear_source: String,
    pub global_schema: StateSchema,
    pub local_schema: StateSchema,
    pub extra_pages: u32,
    /// Opt the creator in within the create transaction.
    pub opt_in: bool,
    /// Arguments, references and note. The sender is always the creating account.
    pub params: CallParams,
}

impl CreateAppRequest {
    #[must_use]
    pub fn new(approval_source: impl Into<String>, clear_source: impl Into<String>) -> Self {
        Self {
            approval_source: approval_source.into(),
            clear_source: clear_source.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_schemas(mut self, global: StateSchema, local: StateSchema) -> Self {
        self.global_schema = global;
        self.local_schema = local;
        self
    }

    #[must_use]
    pub fn with_extra_pages(mut self, extra_pages: u32) -> Self {
        self.extra_pages = extra_pages;
        self
    }

    #[must_use]
    pub fn with_opt_in(mut self) -> Self {
        self.opt_in = true;
        self
    }
}

/// A confirmed create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedApp {
    pub app_id: ApplicationId,
    /// Escrow address of the application.
    pub address: Address,
    pub confirmation: ConfirmationResult,
}

/// Primary API for the application lifecycle.
///
/// ## Usage
///
/// ```ignore
/// let app = api.create_app(&account, CreateAppRequest::new(approval, clear)).await?;
/// api.opt_in(&account, app.app_id).await?;
/// ```
#[async_trait]
pub trait ApplicationLifecycleApi: Send + Sync {
    /// Compiles both programs, deploys them and returns the assigned id.
    async fn create_app(
        &self,
        account: &Account,
        request: CreateAppRequest,
    ) -> Result<CreatedApp, LifecycleError>;

    async fn opt_in(
        &self,
        account: &Account,
        app_id: ApplicationId,
    ) -> Result<ConfirmationResult, LifecycleError>;

    /// Bare NoOp call with raw arguments.
    async fn call(
        &self,
        account: &Account,
        app_id: ApplicationId,
        params: CallParams,
    ) -> Result<ConfirmationResult, LifecycleError>;

    /// Compiles and installs new programs.
    async fn update(
        &self,
        account: &Account,
        app_id: ApplicationId,
        approval_source: &str,
        clear_source: &str,
    ) -> Result<ConfirmationResult, LifecycleError>;

    async fn close_out(
        &self,
        account: &Account,
        app_id: ApplicationId,
    ) -> Result<ConfirmationResult, LifecycleError>;

    async fn clear_state(
        &self,
        account: &Account,
        app_id: ApplicationId,
    ) -> Result<ConfirmationResult, LifecycleError>;

    async fn delete(
        &self,
        account: &Account,
        app_id: ApplicationId,
    ) -> Result<ConfirmationResult, LifecycleError>;

    /// Builds, signs, submits and confirms any operation.
    ///
    /// `round_budget` overrides the configured confirmation budget.
    async fn submit(
        &self,
        account: &Account,
        operation: AppOperation,
        params: CallParams,
        round_budget: Option<u64>,
    ) -> Result<ConfirmationResult, LifecycleError>;

    /// Resolves `method` in `contract` and executes it as a single call.
    async fn call_method(
        &self,
        signer: Arc<Account>,
        app_id: ApplicationId,
        contract: &ContractInterface,
        method: &str,
        args: Vec<MethodArgValue>,
    ) -> Result<MethodResult, LifecycleError>;

    /// Executes a caller-assembled group.
    async fn execute_group(&self, group: &mut AtomicGroup)
        -> Result<GroupExecution, ComposerError>;

    /// Deployed application and its global state.
    async fn application(&self, app_id: ApplicationId) -> Result<ApplicationInfo, NetworkError>;

    /// An account's local state for one application.
    async fn local_state(
        &self,
        address: &Address,
        app_id: ApplicationId,
    ) -> Result<LocalState, NetworkError>;
}
