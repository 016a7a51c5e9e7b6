//! Error taxonomy. Structural and resource errors only — the
//! runtime kinds (`InvalidJumpDestination`, `InvalidOpcode`, `OutOfGas`, ...)
//! belong to the interpreter and are never raised here.

use thiserror::Error;

/// Errors that can abort `analyze_runtime`/`analyze_initcode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Runtime code exceeds `AnalysisConfig::max_runtime_size` (EIP-170).
    #[error("runtime bytecode of {len} bytes exceeds the {limit}-byte size limit")]
    BytecodeTooLarge { len: usize, limit: usize },
    /// Initcode exceeds `AnalysisConfig::max_initcode_size` (EIP-3860).
    #[error("initcode of {len} bytes exceeds the {limit}-byte size limit")]
    InitcodeTooLarge { len: usize, limit: usize },
    /// A `PUSHn` at `pc` claims operand bytes past the validated region.
    #[error("PUSH{size} at pc {pc} is missing one or more of its operand bytes")]
    TruncatedPush { pc: u32, size: u8 },
    /// Bit-plane allocation failed.
    #[error("allocation failure while building analysis bitmaps")]
    AllocationFailure,
}

/// Errors that can abort `build_advanced_plan`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlanError {
    /// Stream or constant-pool allocation failed.
    #[error("allocation failure while compiling the advanced dispatch plan")]
    AllocationFailure,
}
