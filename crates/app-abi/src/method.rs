//! # Method Descriptors
//!
//! A method is identified on-chain by its selector: the first four bytes of
//! `SHA-512/256(signature)`, where the signature is `name(arg,...)ret` and
//! `ret` is `void` for methods without a return value.

use crate::errors::AbiError;
use crate::types::{split_tuple, AbiType};
use crate::value::AbiValue;
use shared_types::sha512_256;
use std::fmt;
use std::str::FromStr;

/// Return type name for methods that return nothing.
pub const VOID: &str = "void";

/// Selector byte length.
pub const SELECTOR_LEN: usize = 4;

/// Reference arguments: encoded as a uint8 index into a foreign array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceType {
    /// Index into the accounts array (0 = sender).
    Account,
    /// Index into the foreign assets array.
    Asset,
    /// Index into the foreign apps array (0 = called application).
    Application,
}

impl ReferenceType {
    /// ABI name of this reference type.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Asset => "asset",
            Self::Application => "application",
        }
    }
}

/// Transaction arguments: a separate transaction placed before the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionType {
    /// Any transaction type.
    Any,
    Payment,
    KeyRegistration,
    AssetConfig,
    AssetTransfer,
    AssetFreeze,
    ApplicationCall,
}

impl TransactionType {
    /// ABI name of this transaction type (`txn`, `pay`, ...).
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Any => "txn",
            Self::Payment => "pay",
            Self::KeyRegistration => "keyreg",
            Self::AssetConfig => "acfg",
            Self::AssetTransfer => "axfer",
            Self::AssetFreeze => "afrz",
            Self::ApplicationCall => "appl",
        }
    }

    /// Returns true if a transaction whose `type` field is `type_tag` satisfies this argument.
    #[must_use]
    pub fn accepts(&self, type_tag: &str) -> bool {
        matches!(self, Self::Any) || self.name() == type_tag
    }
}

/// Declared kind of a method argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgKind {
    /// Ordinary ABI value.
    Value(AbiType),
    /// Reference to an account, asset or application.
    Reference(ReferenceType),
    /// A preceding transaction in the same group.
    Transaction(TransactionType),
}

impl ArgKind {
    /// Returns true if this argument occupies an application-argument slot.
    #[must_use]
    pub fn takes_app_arg(&self) -> bool {
        !matches!(self, Self::Transaction(_))
    }

    /// The ABI type used to encode this argument's app-arg slot.
    #[must_use]
    pub fn encoding_type(&self) -> Option<AbiType> {
        match self {
            Self::Value(ty) => Some(ty.clone()),
            Self::Reference(_) => Some(AbiType::Uint(8)),
            Self::Transaction(_) => None,
        }
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(ty) => write!(f, "{ty}"),
            Self::Reference(r) => f.write_str(r.name()),
            Self::Transaction(t) => f.write_str(t.name()),
        }
    }
}

impl FromStr for ArgKind {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "account" => Self::Reference(ReferenceType::Account),
            "asset" => Self::Reference(ReferenceType::Asset),
            "application" => Self::Reference(ReferenceType::Application),
            "txn" => Self::Transaction(TransactionType::Any),
            "pay" => Self::Transaction(TransactionType::Payment),
            "keyreg" => Self::Transaction(TransactionType::KeyRegistration),
            "acfg" => Self::Transaction(TransactionType::AssetConfig),
            "axfer" => Self::Transaction(TransactionType::AssetTransfer),
            "afrz" => Self::Transaction(TransactionType::AssetFreeze),
            "appl" => Self::Transaction(TransactionType::ApplicationCall),
            other => Self::Value(other.parse()?),
        })
    }
}

/// One declared argument of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodArg {
    /// Optional argument name.
    pub name: Option<String>,
    /// Declared kind.
    pub kind: ArgKind,
    /// Optional description.
    pub description: Option<String>,
}

impl MethodArg {
    /// Creates an unnamed argument.
    #[must_use]
    pub fn new(kind: ArgKind) -> Self {
        Self {
            name: None,
            kind,
            description: None,
        }
    }
}

/// A callable method of a contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Method {
    /// Method name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Ordered arguments.
    pub args: Vec<MethodArg>,
    /// Return type, None for `void`.
    pub returns: Option<AbiType>,
    /// True if the method does not modify state.
    pub readonly: bool,
}

impl Method {
    /// Parses a method signature such as `add(uint64,uint64)uint128`.
    pub fn from_signature(signature: &str) -> Result<Self, AbiError> {
        let open = signature
            .find('(')
            .ok_or_else(|| AbiError::parse(signature, "missing `(`"))?;
        let name = &signature[..open];
        if name.is_empty() {
            return Err(AbiError::parse(signature, "empty method name"));
        }

        let close = matching_paren(signature, open)
            .ok_or_else(|| AbiError::parse(signature, "unbalanced argument list"))?;
        let args = split_tuple(&signature[open + 1..close])
            .map_err(|reason| AbiError::parse(signature, reason))?
            .into_iter()
            .map(|arg| arg.parse().map(MethodArg::new))
            .collect::<Result<Vec<_>, _>>()?;

        let returns = match &signature[close + 1..] {
            "" => return Err(AbiError::parse(signature, "missing return type")),
            VOID => None,
            ret => Some(ret.parse()?),
        };

        Ok(Self {
            name: name.to_string(),
            description: None,
            args,
            returns,
            readonly: false,
        })
    }

    /// Canonical signature string.
    #[must_use]
    pub fn signature(&self) -> String {
        let args = self
            .args
            .iter()
            .map(|arg| arg.kind.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let returns = self
            .returns
            .as_ref()
            .map_or_else(|| VOID.to_string(), ToString::to_string);
        format!("{}({args}){returns}", self.name)
    }

    /// First four bytes of `SHA-512/256(signature)`.
    #[must_use]
    pub fn selector(&self) -> [u8; SELECTOR_LEN] {
        let digest = sha512_256(self.signature().as_bytes());
        let mut selector = [0u8; SELECTOR_LEN];
        selector.copy_from_slice(&digest.as_bytes()[..SELECTOR_LEN]);
        selector
    }

    /// Number of arguments that are separate transactions.
    #[must_use]
    pub fn transaction_arg_count(&self) -> usize {
        self.args.iter().filter(|a| !a.kind.takes_app_arg()).count()
    }

    /// Checks that `values` match the declared arguments.
    ///
    /// `values` holds one entry per argument: `None` stands for a supplied
    /// transaction, whose type is validated by the caller. Account references
    /// take an address, asset and application references take an id.
    pub fn check_args(&self, values: &[Option<&AbiValue>]) -> Result<(), AbiError> {
        if values.len() != self.args.len() {
            return Err(AbiError::ArgumentCount {
                method: self.name.clone(),
                expected: self.args.len(),
                actual: values.len(),
            });
        }
        for (position, (arg, value)) in self.args.iter().zip(values).enumerate() {
            match (&arg.kind, value) {
                (ArgKind::Transaction(_), None) => {}
                (ArgKind::Transaction(_), Some(v)) => {
                    return Err(self.arg_error(position, format!("got {}", v.kind())));
                }
                (_, None) => {
                    return Err(self.arg_error(position, "got a transaction".into()));
                }
                (ArgKind::Value(ty), Some(v)) => {
                    ty.check(v).map_err(|reason| self.arg_error(position, reason))?;
                }
                (ArgKind::Reference(ReferenceType::Account), Some(v)) => {
                    if !matches!(v, AbiValue::Address(_)) {
                        return Err(self.arg_error(position, format!("got {}", v.kind())));
                    }
                }
                (ArgKind::Reference(_), Some(v)) => {
                    if v.as_u64().is_none() {
                        return Err(self.arg_error(
                            position,
                            format!("got {}, need a 64-bit id", v.kind()),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    pub(crate) fn arg_error(&self, position: usize, reason: String) -> AbiError {
        AbiError::ArgumentType {
            method: self.name.clone(),
            position,
            expected: self.args[position].kind.to_string(),
            reason,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

impl FromStr for Method {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_signature(s)
    }
}

fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_known_answer() {
        let method = Method::from_signature("add(uint64,uint64)uint128").unwrap();
        assert_eq!(method.selector(), [0x8a, 0xa3, 0xb6, 0x1f]);
    }

    #[test]
    fn test_signature_round_trip() {
        for sig in [
            "hello(string)string",
            "noop()void",
            "pay(pay,account,asset,application)void",
            "nested((uint64,bool[2]),byte[])(string,address)",
        ] {
            assert_eq!(Method::from_signature(sig).unwrap().signature(), sig);
        }
    }

    #[test]
    fn test_void_return_is_none() {
        let method = Method::from_signature("ping()void").unwrap();
        assert!(method.returns.is_none());
        assert!(method.args.is_empty());
    }

    #[test]
    fn test_argument_kinds() {
        let method = Method::from_signature("f(pay,account,uint64)void").unwrap();
        assert_eq!(
            method.args[0].kind,
            ArgKind::Transaction(TransactionType::Payment)
        );
        assert_eq!(
            method.args[1].kind,
            ArgKind::Reference(ReferenceType::Account)
        );
        assert_eq!(method.args[2].kind, ArgKind::Value(AbiType::Uint(64)));
        assert_eq!(method.transaction_arg_count(), 1);
        assert!(TransactionType::Any.accepts("appl"));
        assert!(!TransactionType::Payment.accepts("appl"));
    }

    #[test]
    fn test_malformed_signatures() {
        for bad in ["hello", "(string)string", "hello(string", "hello(string)", "f(uint7)void"] {
            assert!(Method::from_signature(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_check_args() {
        let method = Method::from_signature("hello(string)string").unwrap();
        let ok = AbiValue::from("world");
        assert!(method.check_args(&[Some(&ok)]).is_ok());

        let err = method.check_args(&[]).unwrap_err();
        assert!(matches!(err, AbiError::ArgumentCount { expected: 1, actual: 0, .. }));

        let bad = AbiValue::from(1u64);
        let err = method.check_args(&[Some(&bad)]).unwrap_err();
        assert!(matches!(err, AbiError::ArgumentType { position: 0, .. }));
    }
}
