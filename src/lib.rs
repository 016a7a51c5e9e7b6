//! Legacy EVM bytecode preprocessing: validation, bit-plane analysis, and
//! dispatch-plan compilation for an interpreter's hot loop.
//!
//! This crate answers exactly one question, cheaply and precomputed:
//! *given a blob of EVM bytecode, which bytes are reachable instructions,
//! which are `PUSHn` operand data, and which `JUMPDEST`s are real jump
//! targets?* Everything downstream — opcode semantics, gas accounting, the
//! actual interpreter loop — is an external collaborator. See each module's
//! docs for the corresponding stage of the pipeline:
//!
//! 1. [`opcode`] — stateless single-byte classification.
//! 2. [`trailer`] — optional CBOR compiler-metadata trailer detection.
//! 3. [`validator`] — the single linear pass that both validates and
//!    populates [`bitplanes::BitPlanes`].
//! 4. [`analyzed`] — [`AnalyzedBytecode`], the immutable validated view
//!    every other module and the caller build on.
//! 5. [`stats`] — an informational, read-only analysis pass.
//! 6. [`plan`] — the minimal and advanced dispatch plans.
//! 7. [`disassembler`] — human-readable disassembly.

mod analyzed;
mod bitmap;
mod bitplanes;
mod config;
mod disassembler;
mod errors;
mod opcode;
pub mod plan;
mod stats;
mod trailer;
mod validator;

pub use analyzed::{AnalyzedBytecode, OpStarts, Pc, Word};
pub use config::{initcode_gas_cost, AnalysisConfig, DEFAULT_MAX_INITCODE_SIZE, DEFAULT_MAX_RUNTIME_SIZE};
pub use disassembler::{disassemble, pretty_print, Disassembler, Instruction};
pub use errors::{PlanError, ValidationError};
pub use opcode::{classify, is_push, push_size, OpcodeInfo, OpcodeKind, FUSABLE_SECOND_OPS};
pub use plan::{
    build_advanced_plan, build_minimal_plan, AdvancedPlan, FusionHandlers, JumpdestInfo,
    MetadataView, MinimalPlan, StreamCell, StreamIdx,
};
pub use stats::{stats, JumpRecord, PushRecord, Stats};
pub use trailer::{CompilerVersion, TrailerDescriptor, TrailerKind};

/// Validate and analyze deployed runtime bytecode (EIP-170 size limit).
///
/// This is the crate's main entry point: everything else (stats, dispatch
/// plans, disassembly) is derived from the [`AnalyzedBytecode`] it returns.
pub fn analyze_runtime(
    code: impl Into<bytes::Bytes>,
    config: &AnalysisConfig,
) -> Result<AnalyzedBytecode, ValidationError> {
    AnalyzedBytecode::from_runtime(code, config)
}

/// Validate and analyze initcode (EIP-3860 size limit). The eventual
/// deployed runtime code returned by the constructor must be validated
/// separately, via [`analyze_runtime`].
pub fn analyze_initcode(
    code: impl Into<bytes::Bytes>,
    config: &AnalysisConfig,
) -> Result<AnalyzedBytecode, ValidationError> {
    AnalyzedBytecode::from_initcode(code, config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn public_api_round_trips_a_small_contract() {
        // PUSH1 0, PUSH1 0, CODECOPY... kept short: PUSH1 5, JUMP, JUMPDEST, STOP
        let code = vec![0x60, 0x04, 0x56, 0x5B, 0x00];
        let analyzed = analyze_runtime(code, &AnalysisConfig::default()).unwrap();
        assert!(analyzed.is_valid_jumpdest(3));

        let s = stats(&analyzed);
        assert_eq!(s.jumps.len(), 1);

        let handler_table = [0u8; 256];
        let minimal = build_minimal_plan(&analyzed, handler_table);
        assert!(minimal.handler_at(0).is_some());

        let advanced = build_advanced_plan(
            &analyzed,
            &handler_table,
            None,
            JumpdestInfo::default(),
            &AnalysisConfig::default(),
        )
        .unwrap();
        assert!(advanced.stream_index_for_pc(3).is_some());

        let rendered = pretty_print(&analyzed);
        assert!(rendered.contains("JUMPDEST"));
    }

    #[test]
    fn oversized_runtime_code_is_rejected() {
        let config = AnalysisConfig {
            max_runtime_size: 2,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            analyze_runtime(vec![0u8; 3], &config),
            Err(ValidationError::BytecodeTooLarge { .. })
        ));
    }
}
