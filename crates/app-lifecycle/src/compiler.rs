//! # Program Compiler Adapter
//!
//! Turns program source into bytecode through the node's compile endpoint.
//! A compile failure is fatal for the operation that needed the program.

use crate::domain::value_objects::{CompiledProgram, ProgramRole};
use crate::errors::CompileError;
use crate::ports::outbound::AlgodApi;
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use shared_types::Address;
use tracing::debug;

/// Compiles one program for `role`.
pub async fn compile<N: AlgodApi + ?Sized>(
    network: &N,
    source: &str,
    role: ProgramRole,
) -> Result<CompiledProgram, CompileError> {
    let response = network
        .compile(source)
        .await
        .map_err(|e| CompileError::Rejected {
            role,
            reason: e.to_string(),
        })?;

    let invalid = |reason: String| CompileError::InvalidOutput { role, reason };
    let bytes = B64
        .decode(response.result.as_bytes())
        .map_err(|e| invalid(e.to_string()))?;
    if bytes.is_empty() {
        return Err(invalid("empty bytecode".into()));
    }
    let hash: Address = response
        .hash
        .parse()
        .map_err(|e: shared_types::EncodingError| invalid(format!("program hash: {e}")))?;

    debug!(%role, len = bytes.len(), %hash, "Program compiled");
    Ok(CompiledProgram::new(role, bytes, hash))
}

/// Compiles the approval and clear programs, in that order.
pub async fn compile_pair<N: AlgodApi + ?Sized>(
    network: &N,
    approval_source: &str,
    clear_source: &str,
) -> Result<(CompiledProgram, CompiledProgram), CompileError> {
    let approval = compile(network, approval_source, ProgramRole::Approval).await?;
    let clear = compile(network, clear_source, ProgramRole::Clear).await?;
    Ok((approval, clear))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryAlgod;
    use crate::domain::value_objects::program_hash;

    #[tokio::test]
    async fn test_compile_pair() {
        let network = InMemoryAlgod::new();
        let (approval, clear) = compile_pair(&network, "#pragma version 8\nint 1", "int 1")
            .await
            .unwrap();
        assert_eq!(approval.role(), ProgramRole::Approval);
        assert_eq!(clear.role(), ProgramRole::Clear);
        assert_eq!(approval.hash(), program_hash(approval.bytes()));
        assert_ne!(approval.bytes(), clear.bytes());
    }

    #[tokio::test]
    async fn test_rejected_source() {
        let network = InMemoryAlgod::new();
        let err = compile(&network, "   ", ProgramRole::Clear).await.unwrap_err();
        assert!(matches!(
            err,
            CompileError::Rejected {
                role: ProgramRole::Clear,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_approval_failure_stops_pair() {
        let network = InMemoryAlgod::new();
        network.reject_compile("syntax error at line 1");
        let err = compile_pair(&network, "int 1", "int 1").await.unwrap_err();
        assert!(matches!(
            err,
            CompileError::Rejected {
                role: ProgramRole::Approval,
                ..
            }
        ));
        assert_eq!(network.stats().compiles, 1);
    }
}
