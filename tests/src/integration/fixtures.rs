//! Shared programs, contracts and service setup.

use app_abi::contract::{AppSpec, ContractInterface};
use app_lifecycle::adapters::{InMemoryAlgod, StaticCredentials};
use app_lifecycle::config::{ConfirmationConfig, LifecycleConfig};
use app_lifecycle::domain::signer::Account;
use app_lifecycle::ports::outbound::CredentialSource;
use app_lifecycle::service::ApplicationLifecycleService;
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use std::sync::Arc;

pub const APPROVAL: &str = "#pragma version 8\ntxn ApplicationID\nbz create\nint 1\nreturn\ncreate:\nint 1";
pub const CLEAR: &str = "#pragma version 8\nint 1";

/// ARC-4 description of the counter application.
pub const COUNTER_CONTRACT: &str = r#"{
    "name": "Counter",
    "desc": "Counts calls and echoes arguments",
    "networks": {},
    "methods": [
        { "name": "hello", "args": [ { "type": "string", "name": "name" } ], "returns": { "type": "string" } },
        { "name": "add", "args": [ { "type": "uint64" }, { "type": "uint64" } ], "returns": { "type": "uint64" } },
        { "name": "add", "args": [ { "type": "uint128" }, { "type": "uint128" } ], "returns": { "type": "uint128" } },
        { "name": "deposit", "args": [ { "type": "pay", "name": "payment" }, { "type": "string", "name": "memo" } ], "returns": { "type": "string" } },
        { "name": "slot_of", "args": [ { "type": "account" } ], "returns": { "type": "uint8" } },
        { "name": "reset", "args": [], "returns": { "type": "void" }, "readonly": false }
    ]
}"#;

#[must_use]
pub fn counter_contract() -> ContractInterface {
    ContractInterface::from_json(COUNTER_CONTRACT).expect("counter contract parses")
}

/// ARC-32 app spec embedding the counter programs and contract.
#[must_use]
pub fn counter_spec() -> AppSpec {
    let json = format!(
        r#"{{
            "source": {{ "approval": "{}", "clear": "{}" }},
            "state": {{
                "global": {{ "num_uints": 1, "num_byte_slices": 0 }},
                "local": {{ "num_uints": 1, "num_byte_slices": 1 }}
            }},
            "contract": {COUNTER_CONTRACT}
        }}"#,
        B64.encode(APPROVAL),
        B64.encode(CLEAR),
    );
    AppSpec::from_json(&json).expect("counter spec parses")
}

/// Account loaded through the credential port from a fixed seed.
#[must_use]
pub fn account(seed_byte: u8) -> Account {
    StaticCredentials::new([seed_byte; 32], None)
        .load()
        .expect("static credentials without an expected address always load")
}

/// Installs a test subscriber once per process. Later calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("app_lifecycle=debug")
        .with_test_writer()
        .try_init();
}

/// Network plus a service over it.
pub struct Harness {
    pub network: Arc<InMemoryAlgod>,
    pub service: ApplicationLifecycleService<InMemoryAlgod>,
}

impl Harness {
    #[must_use]
    pub fn new() -> Self {
        Self::with_budget(ConfirmationConfig::default().max_rounds_to_wait)
    }

    #[must_use]
    pub fn with_budget(max_rounds_to_wait: u64) -> Self {
        init_test_tracing();
        let network = Arc::new(InMemoryAlgod::new());
        let config = LifecycleConfig {
            confirmation: ConfirmationConfig { max_rounds_to_wait },
            ..LifecycleConfig::default()
        };
        let service = ApplicationLifecycleService::new(Arc::clone(&network), config);
        Self { network, service }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
