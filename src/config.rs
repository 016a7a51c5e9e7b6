//! Analysis configuration.
//!
//! Modeled as plain data rather than compile-time generics, following
//! `tokamak-jit`'s `JitConfig`: a `Copy` struct with a `Default` impl that
//! documents each field inline rather than a builder, because there are too
//! few knobs here to justify one.

/// EIP-170: maximum size of deployed runtime bytecode.
pub const DEFAULT_MAX_RUNTIME_SIZE: usize = 24_576;
/// EIP-3860: maximum size of initcode.
pub const DEFAULT_MAX_INITCODE_SIZE: usize = 49_152;
/// EIP-3860: gas charged per 32-byte word of initcode.
pub const INITCODE_WORD_GAS: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Runtime code longer than this is rejected with
    /// [`crate::errors::ValidationError::BytecodeTooLarge`].
    pub max_runtime_size: usize,
    /// Initcode longer than this is rejected with
    /// [`crate::errors::ValidationError::InitcodeTooLarge`].
    pub max_initcode_size: usize,
    /// Whether the validator sets fusion-candidate bits and the advanced
    /// plan emits synthetic fused handlers.
    pub fusions_enabled: bool,
    /// Platform word width in bits; determines how large a `PUSHn` value can
    /// be before it spills from an inline stream cell into the constant
    /// pool.
    pub word_size_bits: u32,
    /// SIMD lane count available for JUMPDEST marking; 0 disables the
    /// vectorized path and falls back to the scalar scan. Both paths must
    /// produce bit-identical bit-planes.
    pub vector_length: usize,
}

impl AnalysisConfig {
    /// Construction-time sanity check. A config that fails this is a caller
    /// bug, not attacker-controlled input, so it is a debug assertion
    /// rather than a recoverable error.
    pub fn validate(&self) {
        debug_assert!(
            self.max_initcode_size >= self.max_runtime_size,
            "max_initcode_size must be >= max_runtime_size"
        );
        debug_assert!(self.word_size_bits >= 64, "word_size_bits must be >= 64");
    }

    /// Inline-value capacity, in bytes, of a single stream cell on this
    /// configuration's platform word.
    #[must_use]
    pub const fn inline_value_bytes(&self) -> u32 {
        self.word_size_bits / 8
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_runtime_size: DEFAULT_MAX_RUNTIME_SIZE,
            max_initcode_size: DEFAULT_MAX_INITCODE_SIZE,
            fusions_enabled: true,
            word_size_bits: u64::BITS,
            vector_length: 0,
        }
    }
}

/// EIP-3860 initcode word-cost gas charge: `ceil(len / 32) * 2`.
#[must_use]
pub fn initcode_gas_cost(len: usize) -> u64 {
    let words = len.div_ceil(32);
    (words as u64).saturating_mul(INITCODE_WORD_GAS)
}
