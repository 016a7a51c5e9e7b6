//! The immutable, O(1)-queryable view over validated bytecode.

use bytes::Bytes;

use crate::bitmap::BitPlaneSlice;
use crate::bitplanes::BitPlanes;
use crate::config::AnalysisConfig;
use crate::errors::ValidationError;
use crate::opcode;
use crate::trailer::{self, TrailerDescriptor};

/// Program counter: an index into the runtime byte array.
///
/// `u32` is used uniformly rather than picking the narrowest integer that
/// fits a given `max_runtime_size`, since `AnalysisConfig` is runtime data,
/// not a compile-time bound: `u32` comfortably covers both the EIP-170 and
/// EIP-3860 limits with room to spare, at a fixed, predictable size across
/// every configuration.
pub type Pc = u32;

/// A 256-bit EVM machine word, as pushed onto the stack.
pub type Word = ruint::aliases::U256;

/// The four-byte prologue (`PUSH1 0x80 PUSH1 0x40`) solc emits as the first
/// instructions of deployment (constructor) bytecode, used to decide
/// whether a trailing CBOR trailer participates in the constructor's
/// `RETURN` offset.
const DEPLOYMENT_PROLOGUE: [u8; 4] = [0x60, 0x80, 0x60, 0x40];

/// Immutable, validated view over a bytecode blob. Construct via
/// [`AnalyzedBytecode::from_runtime`] or [`AnalyzedBytecode::from_initcode`].
#[derive(Debug, Clone)]
pub struct AnalyzedBytecode {
    full_bytes: Bytes,
    /// Length of the runtime-code view into `full_bytes`: either the whole
    /// input, or `full_bytes` minus a stripped trailer.
    runtime_len: usize,
    trailer: Option<TrailerDescriptor>,
    bit_planes: BitPlanes,
}

impl AnalyzedBytecode {
    /// Validate and analyze deployed runtime bytecode.
    pub fn from_runtime(
        full_bytes: impl Into<Bytes>,
        config: &AnalysisConfig,
    ) -> Result<Self, ValidationError> {
        config.validate();
        let full_bytes = full_bytes.into();
        if full_bytes.len() > config.max_runtime_size {
            return Err(ValidationError::BytecodeTooLarge {
                len: full_bytes.len(),
                limit: config.max_runtime_size,
            });
        }
        Self::build(full_bytes, config)
    }

    /// Validate and analyze initcode (EIP-3860). Only the initcode size
    /// limit is enforced here; the
    /// eventual deployed runtime code is validated separately once the
    /// constructor returns it.
    pub fn from_initcode(
        full_bytes: impl Into<Bytes>,
        config: &AnalysisConfig,
    ) -> Result<Self, ValidationError> {
        config.validate();
        let full_bytes = full_bytes.into();
        if full_bytes.len() > config.max_initcode_size {
            return Err(ValidationError::InitcodeTooLarge {
                len: full_bytes.len(),
                limit: config.max_initcode_size,
            });
        }
        Self::build(full_bytes, config)
    }

    fn build(full_bytes: Bytes, config: &AnalysisConfig) -> Result<Self, ValidationError> {
        let trailer = trailer::detect_trailer(&full_bytes);
        let is_deployment_prologue =
            full_bytes.len() >= DEPLOYMENT_PROLOGUE.len() && full_bytes[..4] == DEPLOYMENT_PROLOGUE;

        let (runtime_len, validate_up_to) = match &trailer {
            Some(t) if is_deployment_prologue => {
                // Keep the full blob so constructor RETURN offsets stay
                // byte-identical, but never validate the trailer region as
                // code.
                (full_bytes.len(), full_bytes.len() - t.length_in_bytes)
            }
            Some(t) => {
                let stripped = full_bytes.len() - t.length_in_bytes;
                (stripped, stripped)
            }
            None => (full_bytes.len(), full_bytes.len()),
        };

        let bit_planes = crate::validator::build(&full_bytes, validate_up_to, config.fusions_enabled)?;

        tracing::debug!(
            len = full_bytes.len(),
            runtime_len,
            validate_up_to,
            has_trailer = trailer.is_some(),
            "analyzed bytecode"
        );

        Ok(Self {
            full_bytes,
            runtime_len,
            trailer,
            bit_planes,
        })
    }

    /// Length of the runtime-code view.
    #[must_use]
    pub fn len(&self) -> Pc {
        self.runtime_len as Pc
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runtime_len == 0
    }

    /// The full input blob, including any trailer.
    #[must_use]
    pub fn full_bytes(&self) -> &[u8] {
        &self.full_bytes
    }

    /// The runtime-code view: `full_bytes` with any trailer stripped off.
    #[must_use]
    pub fn runtime_bytes(&self) -> &[u8] {
        #[allow(clippy::indexing_slicing)]
        &self.full_bytes[..self.runtime_len]
    }

    #[must_use]
    pub fn trailer(&self) -> Option<&TrailerDescriptor> {
        self.trailer.as_ref()
    }

    #[must_use]
    pub fn byte_at(&self, pc: Pc) -> Option<u8> {
        self.runtime_bytes().get(pc as usize).copied()
    }

    /// # Panics
    /// Panics if `pc >= self.len()`. Only safe to call when `pc` is known to
    /// be in range, e.g. because `is_op_start`/iteration already proved it;
    /// out-of-range queries are a programming error, not a runtime
    /// condition to recover from.
    #[must_use]
    pub fn byte_at_unchecked(&self, pc: Pc) -> u8 {
        self.runtime_bytes()[pc as usize]
    }

    /// Whether `pc` is a `JUMPDEST` reachable as code: op-start and not
    /// push-data.
    #[must_use]
    pub fn is_valid_jumpdest(&self, pc: Pc) -> bool {
        self.bit_planes.is_jumpdest(pc as usize)
    }

    #[must_use]
    pub fn is_op_start(&self, pc: Pc) -> bool {
        self.bit_planes.is_op_start(pc as usize)
    }

    #[must_use]
    pub fn is_push_data(&self, pc: Pc) -> bool {
        self.bit_planes.is_push_data(pc as usize)
    }

    #[must_use]
    pub fn is_fusion_candidate(&self, pc: Pc) -> bool {
        self.bit_planes.is_fusion_candidate(pc as usize)
    }

    /// All four flags for `pc`, read from the packed nibble plane in one
    /// load.
    #[must_use]
    pub fn packed_flags(&self, pc: Pc) -> u8 {
        self.bit_planes.packed_flags(pc as usize)
    }

    #[must_use]
    pub fn op_start_plane(&self) -> &BitPlaneSlice {
        &self.bit_planes.is_op_start
    }

    #[must_use]
    pub fn push_data_plane(&self) -> &BitPlaneSlice {
        &self.bit_planes.is_push_data
    }

    #[must_use]
    pub fn jumpdest_plane(&self) -> &BitPlaneSlice {
        &self.bit_planes.is_jumpdest
    }

    #[must_use]
    pub fn fusion_candidate_plane(&self) -> &BitPlaneSlice {
        &self.bit_planes.is_fusion_candidate
    }

    /// 1 for every non-`PUSHn` op-start, `1 + n` for `PUSHn`.
    #[must_use]
    pub fn instruction_size(&self, pc: Pc) -> Pc {
        match self.byte_at(pc) {
            Some(byte) => 1 + Pc::from(opcode::push_size(byte)),
            None => 1,
        }
    }

    /// The op-start strictly after `pc`'s instruction, if any is still
    /// within the runtime region.
    #[must_use]
    pub fn next_pc(&self, pc: Pc) -> Option<Pc> {
        let next = pc.checked_add(self.instruction_size(pc))?;
        if next < self.len() {
            Some(next)
        } else {
            None
        }
    }

    /// Extract the operand of the `PUSHn` at `pc`, as a big-endian word.
    ///
    /// Returns `None` unless `pc` is op-start, `runtime[pc]` is exactly
    /// `PUSHn` for the given `n`, and the operand lies entirely within the
    /// runtime region.
    #[must_use]
    pub fn read_push(&self, pc: Pc, n: u8) -> Option<Word> {
        if !(1..=32).contains(&n) || !self.is_op_start(pc) {
            return None;
        }
        let byte = self.byte_at(pc)?;
        if opcode::push_size(byte) != n {
            return None;
        }
        let start = pc.checked_add(1)? as usize;
        let end = start.checked_add(n as usize)?;
        let operand = self.runtime_bytes().get(start..end)?;
        Some(Word::from_be_slice(operand))
    }

    /// Walk op-starts from `0`, in increasing order.
    #[must_use]
    pub fn op_starts(&self) -> OpStarts<'_> {
        OpStarts {
            code: self,
            next: Some(0),
        }
    }
}

/// Iterator over every op-start PC, in increasing order, produced by
/// [`AnalyzedBytecode::op_starts`].
pub struct OpStarts<'a> {
    code: &'a AnalyzedBytecode,
    next: Option<Pc>,
}

impl Iterator for OpStarts<'_> {
    type Item = Pc;

    fn next(&mut self) -> Option<Pc> {
        let current = self.next?;
        self.next = self.code.next_pc(current);
        Some(current)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    fn analyze(bytes: &[u8]) -> AnalyzedBytecode {
        AnalyzedBytecode::from_runtime(bytes.to_vec(), &AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn read_push_recovers_big_endian_value() {
        let code = analyze(&[0x61, 0x01, 0x02, 0x00]); // PUSH2 0x0102, STOP
        assert_eq!(code.read_push(0, 2), Some(Word::from(0x0102u32)));
    }

    #[test]
    fn read_push_rejects_wrong_size_or_non_push_pc() {
        let code = analyze(&[0x61, 0x01, 0x02, 0x00]);
        assert_eq!(code.read_push(0, 1), None);
        assert_eq!(code.read_push(3, 1), None);
    }

    #[test]
    fn op_starts_visits_exactly_the_op_start_set_in_order() {
        let code = analyze(&[0x60, 0x01, 0x60, 0x02, 0x01, 0x00]);
        let visited: Vec<Pc> = code.op_starts().collect();
        assert_eq!(visited, vec![0, 2, 4, 5]);
    }

    #[test]
    fn deployment_prologue_with_trailer_keeps_full_runtime_bytes() {
        let mut body = vec![0xA1u8];
        body.extend_from_slice(b"\x64ipfs");
        body.push(0x58);
        body.push(0x22);
        body.extend_from_slice(&[0u8; 34]);
        let len = body.len() as u16;
        body.extend_from_slice(&len.to_be_bytes());

        let mut code = DEPLOYMENT_PROLOGUE.to_vec();
        code.push(0x00); // STOP, so validation of the pre-trailer region succeeds
        code.extend_from_slice(&body);

        let analyzed = analyze(&code);
        assert_eq!(analyzed.runtime_bytes().len(), code.len());
        assert!(analyzed.trailer().is_some());
        // The trailer region itself was never validated as code.
        assert!(!analyzed.is_op_start(5));
    }

    #[test]
    fn non_deployment_code_with_trailer_strips_it() {
        let mut body = vec![0xA1u8];
        body.extend_from_slice(b"\x64ipfs");
        body.push(0x58);
        body.push(0x22);
        body.extend_from_slice(&[0u8; 34]);
        let len = body.len() as u16;
        body.extend_from_slice(&len.to_be_bytes());

        let mut code = vec![0x00]; // STOP, not the deployment prologue
        code.extend_from_slice(&body);

        let analyzed = analyze(&code);
        assert_eq!(analyzed.runtime_bytes().len(), 1);
        assert!(analyzed.trailer().is_some());
    }

    #[test]
    fn bytecode_too_large_is_rejected() {
        let config = AnalysisConfig {
            max_runtime_size: 4,
            ..AnalysisConfig::default()
        };
        let err = AnalyzedBytecode::from_runtime(vec![0u8; 5], &config).unwrap_err();
        assert_eq!(
            err,
            ValidationError::BytecodeTooLarge { len: 5, limit: 4 }
        );
    }
}
