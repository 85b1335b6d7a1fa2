//! # Method Call Requests
//!
//! Resolution and encoding, the two pure phases of a method call. Neither
//! touches the network: a call that names a missing method or passes a
//! mistyped argument fails here.

use crate::domain::builder::{AppOperation, CallParams};
use crate::domain::signer::Account;
use crate::domain::value_objects::BoxReference;
use crate::errors::ComposerError;
use app_abi::codec::encode;
use app_abi::contract::ContractInterface;
use app_abi::method::{ArgKind, Method, ReferenceType};
use app_abi::types::AbiType;
use app_abi::value::AbiValue;
use shared_types::{Address, ApplicationId, AssetId};
use std::sync::Arc;

/// Application-argument slots available to method arguments (one is the selector).
pub const MAX_ABI_APP_ARGS: usize = 15;

/// A positional method argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodArgValue {
    /// ABI value, or the address / id behind a reference argument.
    Value(AbiValue),
    /// A payment placed in the group before the call.
    Payment { receiver: Address, amount: u64 },
}

impl MethodArgValue {
    pub fn value(value: impl Into<AbiValue>) -> Self {
        Self::Value(value.into())
    }

    fn as_abi(&self) -> Option<&AbiValue> {
        match self {
            Self::Value(v) => Some(v),
            Self::Payment { .. } => None,
        }
    }

    /// Wire type tag of a transaction argument.
    fn type_tag(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::Payment { .. } => "pay",
        }
    }
}

impl From<AbiValue> for MethodArgValue {
    fn from(value: AbiValue) -> Self {
        Self::Value(value)
    }
}

/// One method call destined for an atomic group.
#[derive(Debug, Clone)]
pub struct MethodCallRequest {
    pub method: Method,
    pub args: Vec<MethodArgValue>,
    /// Target application and on-completion action.
    pub operation: AppOperation,
    /// Sender and explicit references; app args are filled in by encoding.
    pub params: CallParams,
    pub signer: Arc<Account>,
}

impl MethodCallRequest {
    /// A call sent by `signer`.
    #[must_use]
    pub fn new(method: Method, operation: AppOperation, signer: Arc<Account>) -> Self {
        Self {
            method,
            args: Vec::new(),
            operation,
            params: CallParams::new(signer.address()),
            signer,
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<MethodArgValue>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn with_boxes(mut self, boxes: Vec<BoxReference>) -> Self {
        self.params.boxes = boxes;
        self
    }

    #[must_use]
    pub fn with_accounts(mut self, accounts: Vec<Address>) -> Self {
        self.params.accounts = accounts;
        self
    }

    #[must_use]
    pub fn with_foreign_apps(mut self, apps: Vec<ApplicationId>) -> Self {
        self.params.foreign_apps = apps;
        self
    }

    #[must_use]
    pub fn with_foreign_assets(mut self, assets: Vec<AssetId>) -> Self {
        self.params.foreign_assets = assets;
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<Vec<u8>>) -> Self {
        self.params.note = note.into();
        self
    }
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Finds the method by name or signature and checks the arguments against it.
pub fn resolve(
    contract: &ContractInterface,
    name_or_signature: &str,
    args: &[MethodArgValue],
) -> Result<Method, ComposerError> {
    let method = contract.resolve(name_or_signature)?;
    check_arguments(method, args)?;
    Ok(method.clone())
}

/// Arity, value shapes and transaction argument types.
pub fn check_arguments(method: &Method, args: &[MethodArgValue]) -> Result<(), ComposerError> {
    let values: Vec<_> = args.iter().map(MethodArgValue::as_abi).collect();
    method.check_args(&values)?;

    for (position, (arg, value)) in method.args.iter().zip(args).enumerate() {
        if let ArgKind::Transaction(expected) = arg.kind {
            if !expected.accepts(value.type_tag()) {
                return Err(ComposerError::TransactionArgument {
                    method: method.name.clone(),
                    position,
                    expected: expected.name(),
                    actual: value.type_tag(),
                });
            }
        }
    }
    Ok(())
}

// =============================================================================
// ENCODING
// =============================================================================

/// A method call lowered to application arguments and references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCall {
    /// Selector followed by the encoded arguments.
    pub app_args: Vec<Vec<u8>>,
    /// References, extended with those the arguments introduced.
    pub params: CallParams,
    /// Payments to place in the group ahead of the call, in argument order.
    pub payments: Vec<(Address, u64)>,
}

/// Lowers checked arguments for a call to `app_id`.
pub fn encode_call(
    method: &Method,
    args: &[MethodArgValue],
    app_id: ApplicationId,
    params: &CallParams,
) -> Result<EncodedCall, ComposerError> {
    check_arguments(method, args)?;

    let mut params = params.clone();
    let mut payments = Vec::new();
    let mut slots: Vec<(AbiType, AbiValue)> = Vec::new();

    for (arg, value) in method.args.iter().zip(args) {
        let abi = match value {
            MethodArgValue::Payment { receiver, amount } => {
                payments.push((*receiver, *amount));
                continue;
            }
            MethodArgValue::Value(v) => v,
        };
        match &arg.kind {
            ArgKind::Value(ty) => slots.push((ty.clone(), abi.clone())),
            ArgKind::Reference(reference) => {
                let index = reference_index(&mut params, app_id, *reference, abi);
                slots.push((AbiType::Uint(8), AbiValue::from(index)));
            }
            ArgKind::Transaction(_) => {}
        }
    }

    if slots.len() > MAX_ABI_APP_ARGS {
        let (types, values): (Vec<_>, Vec<_>) =
            slots.split_off(MAX_ABI_APP_ARGS - 1).into_iter().unzip();
        slots.push((AbiType::Tuple(types), AbiValue::Tuple(values)));
    }

    let mut app_args = Vec::with_capacity(slots.len() + 1);
    app_args.push(method.selector().to_vec());
    for (ty, value) in &slots {
        app_args.push(encode(ty, value)?);
    }
    params.app_args = app_args.clone();

    Ok(EncodedCall {
        app_args,
        params,
        payments,
    })
}

/// Index of a reference argument in its foreign array, appending if absent.
///
/// Values were checked by [`check_arguments`]: accounts carry an address,
/// assets and applications an id that fits in 64 bits.
fn reference_index(
    params: &mut CallParams,
    app_id: ApplicationId,
    reference: ReferenceType,
    value: &AbiValue,
) -> u64 {
    match (reference, value) {
        (ReferenceType::Account, AbiValue::Address(address)) => {
            if *address == params.sender {
                0
            } else {
                1 + position_or_push(&mut params.accounts, *address)
            }
        }
        (ReferenceType::Asset, v) => {
            position_or_push(&mut params.foreign_assets, AssetId(v.as_u64().unwrap_or_default()))
        }
        (ReferenceType::Application, v) => {
            let id = ApplicationId(v.as_u64().unwrap_or_default());
            if id == app_id {
                0
            } else {
                1 + position_or_push(&mut params.foreign_apps, id)
            }
        }
        (ReferenceType::Account, _) => 0,
    }
}

fn position_or_push<T: PartialEq>(items: &mut Vec<T>, item: T) -> u64 {
    let index = match items.iter().position(|x| *x == item) {
        Some(index) => index,
        None => {
            items.push(item);
            items.len() - 1
        }
    };
    index as u64
}

/// Target application of a method call, or the reason the operation cannot carry one.
pub(crate) fn call_target(operation: &AppOperation) -> Result<ApplicationId, ComposerError> {
    match operation {
        AppOperation::ClearState { .. } => Err(ComposerError::ClearStateCall),
        op => Ok(op.app_id()),
    }
}
