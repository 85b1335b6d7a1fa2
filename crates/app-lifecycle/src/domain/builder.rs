//! # Transaction Builder
//!
//! Pure construction of unsigned envelopes. Every limit the network enforces
//! at admission is checked here first, so a build failure never costs a
//! round trip.

use crate::domain::entities::{
    AppCallFields, PaymentFields, TransactionBody, TransactionEnvelope, TransactionHeader,
};
use crate::domain::value_objects::{
    BoxReference, CompiledProgram, NetworkParams, OnComplete, OperationKind, ProgramRole,
    StateSchema,
};
use crate::errors::ValidationError;
use shared_types::{Address, ApplicationId, AssetId};

/// Network admission limits.
pub mod limits {
    /// Application arguments per call.
    pub const MAX_APP_ARGS: usize = 16;
    /// Total bytes across all application arguments.
    pub const MAX_APP_ARGS_TOTAL_BYTES: usize = 2048;
    /// Account references per call.
    pub const MAX_ACCOUNTS: usize = 4;
    /// Accounts + apps + assets + boxes per call.
    pub const MAX_TOTAL_REFERENCES: usize = 8;
    /// Global state slots.
    pub const MAX_GLOBAL_SCHEMA_ENTRIES: u64 = 64;
    /// Local state slots.
    pub const MAX_LOCAL_SCHEMA_ENTRIES: u64 = 16;
    /// Additional program pages.
    pub const MAX_EXTRA_PAGES: u32 = 3;
    /// Bytes per program page (approval + clear).
    pub const PROGRAM_PAGE_SIZE: usize = 2048;
    /// Note field bytes.
    pub const MAX_NOTE_BYTES: usize = 1024;
    /// `last_valid - first_valid`.
    pub const MAX_VALIDITY_WINDOW: u64 = 1000;
    /// Transactions per atomic group.
    pub const MAX_GROUP_SIZE: usize = 16;
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// What a transaction does to an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppOperation {
    /// Deploy a new application. `opt_in` also opts the creator in.
    Create {
        approval: CompiledProgram,
        clear: CompiledProgram,
        global_schema: StateSchema,
        local_schema: StateSchema,
        extra_pages: u32,
        opt_in: bool,
    },
    OptIn { app_id: ApplicationId },
    /// Plain call (NoOp).
    Call { app_id: ApplicationId },
    /// Replace both programs. Schemas cannot change.
    Update {
        app_id: ApplicationId,
        approval: CompiledProgram,
        clear: CompiledProgram,
    },
    CloseOut { app_id: ApplicationId },
    /// Leave unconditionally; only the clear program runs.
    ClearState { app_id: ApplicationId },
    Delete { app_id: ApplicationId },
}

impl AppOperation {
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::OptIn { .. } => OperationKind::OptIn,
            Self::Call { .. } => OperationKind::Call,
            Self::Update { .. } => OperationKind::Update,
            Self::CloseOut { .. } => OperationKind::CloseOut,
            Self::ClearState { .. } => OperationKind::ClearState,
            Self::Delete { .. } => OperationKind::Delete,
        }
    }

    /// Target application; `NONE` for create.
    #[must_use]
    pub fn app_id(&self) -> ApplicationId {
        match self {
            Self::Create { .. } => ApplicationId::NONE,
            Self::OptIn { app_id }
            | Self::Call { app_id }
            | Self::Update { app_id, .. }
            | Self::CloseOut { app_id }
            | Self::ClearState { app_id }
            | Self::Delete { app_id } => *app_id,
        }
    }

    #[must_use]
    pub fn on_complete(&self) -> OnComplete {
        match self {
            Self::Create { opt_in: true, .. } | Self::OptIn { .. } => OnComplete::OptIn,
            Self::Create { .. } | Self::Call { .. } => OnComplete::NoOp,
            Self::Update { .. } => OnComplete::UpdateApplication,
            Self::CloseOut { .. } => OnComplete::CloseOut,
            Self::ClearState { .. } => OnComplete::ClearState,
            Self::Delete { .. } => OnComplete::DeleteApplication,
        }
    }
}

/// Payload shared by every operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallParams {
    pub sender: Address,
    pub app_args: Vec<Vec<u8>>,
    pub accounts: Vec<Address>,
    pub foreign_apps: Vec<ApplicationId>,
    pub foreign_assets: Vec<AssetId>,
    pub boxes: Vec<BoxReference>,
    pub note: Vec<u8>,
    pub lease: Option<[u8; 32]>,
    pub rekey_to: Option<Address>,
}

impl CallParams {
    #[must_use]
    pub fn new(sender: Address) -> Self {
        Self {
            sender,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<Vec<u8>>) -> Self {
        self.app_args = args;
        self
    }

    #[must_use]
    pub fn with_accounts(mut self, accounts: Vec<Address>) -> Self {
        self.accounts = accounts;
        self
    }

    #[must_use]
    pub fn with_foreign_apps(mut self, apps: Vec<ApplicationId>) -> Self {
        self.foreign_apps = apps;
        self
    }

    #[must_use]
    pub fn with_foreign_assets(mut self, assets: Vec<AssetId>) -> Self {
        self.foreign_assets = assets;
        self
    }

    #[must_use]
    pub fn with_boxes(mut self, boxes: Vec<BoxReference>) -> Self {
        self.boxes = boxes;
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<Vec<u8>>) -> Self {
        self.note = note.into();
        self
    }

    fn header(&self, net: &NetworkParams) -> TransactionHeader {
        TransactionHeader {
            sender: self.sender,
            fee: net.fee,
            first_valid: net.first_valid,
            last_valid: net.last_valid,
            genesis_id: net.genesis_id.clone(),
            genesis_hash: net.genesis_hash,
            note: self.note.clone(),
            lease: self.lease,
            rekey_to: self.rekey_to,
            group: None,
        }
    }
}

// =============================================================================
// BUILD
// =============================================================================

/// Builds the unsigned envelope for `operation`.
///
/// Fee and validity range are stamped from `net` unmodified.
pub fn build(
    operation: &AppOperation,
    params: &CallParams,
    net: &NetworkParams,
) -> Result<TransactionEnvelope, ValidationError> {
    check_header(params, net)?;

    let app_id = operation.app_id();
    if app_id.is_none() && !matches!(operation, AppOperation::Create { .. }) {
        return Err(ValidationError::MissingApplicationId {
            kind: operation.kind(),
        });
    }

    let mut fields = AppCallFields {
        app_id,
        on_complete: operation.on_complete(),
        app_args: params.app_args.clone(),
        accounts: params.accounts.clone(),
        foreign_apps: params.foreign_apps.clone(),
        foreign_assets: params.foreign_assets.clone(),
        boxes: params
            .boxes
            .iter()
            .map(|b| normalize_box(b, app_id))
            .collect(),
        ..AppCallFields::default()
    };

    match operation {
        AppOperation::Create {
            approval,
            clear,
            global_schema,
            local_schema,
            extra_pages,
            ..
        } => {
            check_schema("global", global_schema, limits::MAX_GLOBAL_SCHEMA_ENTRIES)?;
            check_schema("local", local_schema, limits::MAX_LOCAL_SCHEMA_ENTRIES)?;
            check_programs(approval, clear, *extra_pages)?;
            fields.approval_program = Some(approval.clone());
            fields.clear_program = Some(clear.clone());
            fields.global_schema = *global_schema;
            fields.local_schema = *local_schema;
            fields.extra_pages = *extra_pages;
        }
        AppOperation::Update {
            approval, clear, ..
        } => {
            check_programs(approval, clear, limits::MAX_EXTRA_PAGES)?;
            fields.approval_program = Some(approval.clone());
            fields.clear_program = Some(clear.clone());
        }
        _ => {}
    }

    check_app_args(&fields.app_args)?;
    check_references(&fields)?;

    Ok(TransactionEnvelope {
        header: params.header(net),
        body: TransactionBody::ApplicationCall(fields),
    })
}

/// Builds a payment, used for transaction-typed ABI arguments.
pub fn build_payment(
    params: &CallParams,
    receiver: Address,
    amount: u64,
    net: &NetworkParams,
) -> Result<TransactionEnvelope, ValidationError> {
    check_header(params, net)?;
    Ok(TransactionEnvelope {
        header: params.header(net),
        body: TransactionBody::Payment(PaymentFields {
            receiver,
            amount,
            close_remainder_to: None,
        }),
    })
}

/// A box of the called app is always referenced as app 0.
fn normalize_box(reference: &BoxReference, app_id: ApplicationId) -> BoxReference {
    if !app_id.is_none() && reference.app_id == app_id {
        BoxReference::own(reference.name.clone())
    } else {
        reference.clone()
    }
}

fn check_header(params: &CallParams, net: &NetworkParams) -> Result<(), ValidationError> {
    if params.note.len() > limits::MAX_NOTE_BYTES {
        return Err(ValidationError::NoteTooLarge {
            size: params.note.len(),
            max: limits::MAX_NOTE_BYTES,
        });
    }
    if net.last_valid < net.first_valid {
        return Err(ValidationError::InvalidValidityRange {
            first_valid: net.first_valid,
            last_valid: net.last_valid,
        });
    }
    if net.window() > limits::MAX_VALIDITY_WINDOW {
        return Err(ValidationError::ValidityWindowTooLarge {
            window: net.window(),
            max: limits::MAX_VALIDITY_WINDOW,
        });
    }
    Ok(())
}

fn check_schema(scope: &'static str, schema: &StateSchema, max: u64) -> Result<(), ValidationError> {
    if schema.entries() > max {
        return Err(ValidationError::SchemaTooLarge {
            scope,
            entries: schema.entries(),
            max,
        });
    }
    Ok(())
}

fn check_programs(
    approval: &CompiledProgram,
    clear: &CompiledProgram,
    extra_pages: u32,
) -> Result<(), ValidationError> {
    for (program, expected) in [(approval, ProgramRole::Approval), (clear, ProgramRole::Clear)] {
        if program.role() != expected {
            return Err(ValidationError::ProgramRoleMismatch {
                expected,
                found: program.role(),
            });
        }
    }
    if extra_pages > limits::MAX_EXTRA_PAGES {
        return Err(ValidationError::TooManyExtraPages {
            requested: extra_pages,
            max: limits::MAX_EXTRA_PAGES,
        });
    }
    let size = approval.len() + clear.len();
    let max = limits::PROGRAM_PAGE_SIZE * (1 + extra_pages as usize);
    if size > max {
        return Err(ValidationError::ProgramTooLarge {
            size,
            max,
            extra_pages,
        });
    }
    Ok(())
}

fn check_app_args(args: &[Vec<u8>]) -> Result<(), ValidationError> {
    if args.len() > limits::MAX_APP_ARGS {
        return Err(ValidationError::TooManyAppArgs {
            count: args.len(),
            max: limits::MAX_APP_ARGS,
        });
    }
    let size: usize = args.iter().map(Vec::len).sum();
    if size > limits::MAX_APP_ARGS_TOTAL_BYTES {
        return Err(ValidationError::AppArgsTooLarge {
            size,
            max: limits::MAX_APP_ARGS_TOTAL_BYTES,
        });
    }
    Ok(())
}

fn check_references(fields: &AppCallFields) -> Result<(), ValidationError> {
    if fields.accounts.len() > limits::MAX_ACCOUNTS {
        return Err(ValidationError::TooManyAccounts {
            count: fields.accounts.len(),
            max: limits::MAX_ACCOUNTS,
        });
    }
    let count = fields.accounts.len()
        + fields.foreign_apps.len()
        + fields.foreign_assets.len()
        + fields.boxes.len();
    if count > limits::MAX_TOTAL_REFERENCES {
        return Err(ValidationError::TooManyReferences {
            count,
            max: limits::MAX_TOTAL_REFERENCES,
        });
    }
    for b in &fields.boxes {
        if !b.app_id.is_none() && !fields.foreign_apps.contains(&b.app_id) {
            return Err(ValidationError::UnknownBoxApplication(b.app_id));
        }
    }
    Ok(())
}
