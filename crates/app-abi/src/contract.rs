//! # Contract Interface
//!
//! Parsed description of an application's callable surface, loaded from an
//! ARC-4 contract document or from the `contract` member of an ARC-32
//! application specification.

use crate::errors::AbiError;
use crate::method::{Method, MethodArg, VOID};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// =============================================================================
// WIRE DOCUMENTS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContractDocument {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    desc: Option<String>,
    #[serde(default)]
    networks: BTreeMap<String, NetworkDocument>,
    methods: Vec<MethodDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NetworkDocument {
    #[serde(rename = "appID")]
    app_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MethodDocument {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    desc: Option<String>,
    #[serde(default)]
    args: Vec<ArgDocument>,
    returns: ReturnDocument,
    #[serde(default)]
    readonly: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArgDocument {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    desc: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReturnDocument {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    desc: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AppSpecDocument {
    contract: ContractDocument,
    #[serde(default)]
    state: Option<StateDocument>,
    #[serde(default)]
    source: Option<SourceDocument>,
}

#[derive(Debug, Clone, Deserialize)]
struct StateDocument {
    global: StateCounts,
    local: StateCounts,
}

#[derive(Debug, Clone, Deserialize)]
struct SourceDocument {
    approval: String,
    clear: String,
}

// =============================================================================
// CONTRACT INTERFACE
// =============================================================================

/// Parsed ARC-4 contract description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractInterface {
    /// Contract name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Deployed application ids keyed by base64 genesis hash.
    pub networks: BTreeMap<String, u64>,
    /// Methods in declaration order.
    pub methods: Vec<Method>,
}

impl ContractInterface {
    /// Parses an ARC-4 contract JSON document.
    pub fn from_json(json: &str) -> Result<Self, AbiError> {
        let doc: ContractDocument =
            serde_json::from_str(json).map_err(|e| AbiError::InvalidContract(e.to_string()))?;
        Self::try_from(doc)
    }

    /// Parses the `contract` member of an ARC-32 application specification.
    pub fn from_arc32_json(json: &str) -> Result<Self, AbiError> {
        Ok(AppSpec::from_json(json)?.contract)
    }

    /// Finds the unique method called `name`.
    ///
    /// Fails with `MethodNotFound` if no method or more than one overload has
    /// this name; use [`Self::method_by_signature`] to pick an overload.
    pub fn method_by_name(&self, name: &str) -> Result<&Method, AbiError> {
        let mut matches = self.methods.iter().filter(|m| m.name == name);
        match (matches.next(), matches.next()) {
            (Some(method), None) => Ok(method),
            (None, _) => Err(AbiError::MethodNotFound {
                name: name.to_string(),
                reason: format!("contract `{}` has no such method", self.name),
            }),
            (Some(_), Some(_)) => Err(AbiError::MethodNotFound {
                name: name.to_string(),
                reason: format!(
                    "ambiguous, {} overloads exist; select by signature",
                    self.methods.iter().filter(|m| m.name == name).count()
                ),
            }),
        }
    }

    /// Finds the method with exactly this signature.
    pub fn method_by_signature(&self, signature: &str) -> Result<&Method, AbiError> {
        self.methods
            .iter()
            .find(|m| m.signature() == signature)
            .ok_or_else(|| AbiError::MethodNotFound {
                name: signature.to_string(),
                reason: format!("contract `{}` has no method with this signature", self.name),
            })
    }

    /// Resolves either a bare name or a full signature.
    pub fn resolve(&self, name_or_signature: &str) -> Result<&Method, AbiError> {
        if name_or_signature.contains('(') {
            self.method_by_signature(name_or_signature)
        } else {
            self.method_by_name(name_or_signature)
        }
    }

    /// Application id deployed on the network with this genesis hash.
    #[must_use]
    pub fn app_id(&self, genesis_hash_b64: &str) -> Option<u64> {
        self.networks.get(genesis_hash_b64).copied()
    }
}

impl TryFrom<ContractDocument> for ContractInterface {
    type Error = AbiError;

    fn try_from(doc: ContractDocument) -> Result<Self, Self::Error> {
        let mut methods = Vec::with_capacity(doc.methods.len());
        let mut signatures = HashSet::new();
        for m in doc.methods {
            let args = m
                .args
                .into_iter()
                .map(|a| {
                    Ok(MethodArg {
                        name: a.name,
                        kind: a.ty.parse()?,
                        description: a.desc,
                    })
                })
                .collect::<Result<Vec<_>, AbiError>>()?;
            let returns = if m.returns.ty == VOID {
                None
            } else {
                Some(m.returns.ty.parse()?)
            };
            let method = Method {
                name: m.name,
                description: m.desc,
                args,
                returns,
                readonly: m.readonly,
            };
            if !signatures.insert(method.signature()) {
                return Err(AbiError::InvalidContract(format!(
                    "duplicate method signature `{}`",
                    method.signature()
                )));
            }
            methods.push(method);
        }

        Ok(Self {
            name: doc.name,
            description: doc.desc,
            networks: doc
                .networks
                .into_iter()
                .map(|(hash, net)| (hash, net.app_id))
                .collect(),
            methods,
        })
    }
}

// =============================================================================
// ARC-32 APPLICATION SPEC
// =============================================================================

/// Declared storage counts for one scope, as written in an app spec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCounts {
    /// Integer slots.
    pub num_uints: u64,
    /// Byte-slice slots.
    pub num_byte_slices: u64,
}

/// Program sources embedded in an app spec (base64-encoded TEAL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSources {
    /// Base64 approval program source.
    pub approval_b64: String,
    /// Base64 clear program source.
    pub clear_b64: String,
}

/// The parts of an ARC-32 application specification this crate consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSpec {
    /// Callable surface.
    pub contract: ContractInterface,
    /// Global storage declaration.
    pub global_state: StateCounts,
    /// Local storage declaration.
    pub local_state: StateCounts,
    /// Embedded program sources, if present.
    pub sources: Option<SpecSources>,
}

impl AppSpec {
    /// Parses an ARC-32 application specification.
    pub fn from_json(json: &str) -> Result<Self, AbiError> {
        let doc: AppSpecDocument =
            serde_json::from_str(json).map_err(|e| AbiError::InvalidContract(e.to_string()))?;
        let (global_state, local_state) = doc
            .state
            .map(|s| (s.global, s.local))
            .unwrap_or_default();
        Ok(Self {
            contract: ContractInterface::try_from(doc.contract)?,
            global_state,
            local_state,
            sources: doc.source.map(|s| SpecSources {
                approval_b64: s.approval,
                clear_b64: s.clear,
            }),
        })
    }
}
