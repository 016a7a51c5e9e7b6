//! The advanced dispatch plan — a fixed-width, tagged instruction stream
//! with interleaved inline metadata and an out-of-line constant pool.
//!
//! A machine-word-wide tagged union would require an unsafe,
//! platform-specific packing trick to realize bit-for-bit in a systems
//! language with guaranteed tail calls. The stream layout itself doesn't
//! care whether a handler corresponds to a canonical or a synthetic
//! opcode, so packing is treated as an optimization, not a contract:
//! `StreamCell<H>` here is a plain, safe Rust enum. It is not literally one
//! machine word wide, but it preserves every compilation invariant, and the
//! accessor contract (`next_instruction`, `metadata`, `stream_index_for_pc`)
//! is unchanged.

use rustc_hash::FxHashMap;

use crate::analyzed::{AnalyzedBytecode, Pc, Word};
use crate::config::AnalysisConfig;
use crate::errors::PlanError;
use crate::opcode;

pub type StreamIdx = u32;

/// Inline metadata describing the `JUMPDEST` an interpreter lands on: its
/// static gas cost and the stack-height bounds an interpreter's opcode
/// table computed for it. Always 8 bytes, so it fits inline on every
/// platform `AnalysisConfig::validate` accepts (word size >= 64 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JumpdestInfo {
    pub static_gas_cost: u32,
    pub min_stack_before: i16,
    pub max_stack_after: i16,
}

/// One word-wide tagged slot in the advanced plan's instruction stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamCell<H> {
    /// Dispatch target for this instruction.
    Handler(H),
    /// A metadata value that fits inline: `PUSH1..PUSH8` always,
    /// `PUSH9..PUSH16` on wide-word platforms, and `PC`'s own value.
    InlineValue(u128),
    /// Index into [`AdvancedPlan::constants`] for metadata too large to
    /// inline.
    ConstantIndex(u32),
    /// Inline `JUMPDEST` metadata (the common case: see [`JumpdestInfo`]).
    JumpdestInline(JumpdestInfo),
    /// Out-of-line `JUMPDEST` metadata, for platforms whose word is too
    /// narrow for [`JumpdestInfo`] to fit inline. Unreachable under
    /// [`AnalysisConfig::validate`]'s `word_size_bits >= 64` invariant;
    /// kept to mirror the metadata-layout table exactly.
    JumpdestPointer(H),
}

/// Registry of handlers for synthetic fused `PUSHn + op` instructions.
/// Open-ended by design — a caller registers exactly the second-ops it
/// wants fused; compiling a
/// fusion candidate whose second op has no registered handler falls back
/// to emitting the `PUSHn` and the second op as two ordinary instructions.
#[derive(Debug, Clone, Default)]
pub struct FusionHandlers<H> {
    by_second_op: FxHashMap<u8, (H, H)>,
}

impl<H: Copy> FusionHandlers<H> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_second_op: FxHashMap::default(),
        }
    }

    /// Register the inline- and constant-pool-form handlers for fusing a
    /// `PUSHn` with `second_op`.
    pub fn register(&mut self, second_op: u8, inline_handler: H, pointer_handler: H) -> &mut Self {
        self.by_second_op.insert(second_op, (inline_handler, pointer_handler));
        self
    }

    #[must_use]
    fn get(&self, second_op: u8) -> Option<(H, H)> {
        self.by_second_op.get(&second_op).copied()
    }
}

/// A compiled advanced dispatch plan.
#[derive(Debug, Clone)]
pub struct AdvancedPlan<H> {
    stream: Vec<StreamCell<H>>,
    constants: Vec<Word>,
    pc_to_stream_idx: FxHashMap<Pc, StreamIdx>,
}

impl<H: Copy> AdvancedPlan<H> {
    #[must_use]
    pub fn stream_len(&self) -> usize {
        self.stream.len()
    }

    #[must_use]
    pub fn constants(&self) -> &[Word] {
        &self.constants
    }

    /// `stream[idx].handler`, advancing `idx` by 1 if `opcode` carries no
    /// metadata cell, by 2 otherwise.
    ///
    /// # Panics
    /// Panics if `idx` is out of range — an interpreter driving a validated
    /// plan never produces an out-of-range `idx`.
    #[must_use]
    pub fn next_instruction(&self, idx: StreamIdx, opcode: u8) -> (H, StreamIdx) {
        let cell = &self.stream[idx as usize];
        let handler = match *cell {
            StreamCell::Handler(h) => h,
            StreamCell::JumpdestPointer(h) => h,
            _ => unreachable!("stream_idx must point at a Handler or JumpdestPointer cell"),
        };
        let advance = if carries_metadata(opcode) { 2 } else { 1 };
        (handler, idx + advance)
    }

    /// A typed view of `stream[idx + 1]`. Does not advance the cursor.
    ///
    /// # Panics
    /// Panics if `idx + 1` is out of range, or the cell at `idx + 1` is not
    /// metadata.
    #[must_use]
    pub fn metadata(&self, idx: StreamIdx) -> MetadataView {
        match self.stream[idx as usize + 1] {
            StreamCell::InlineValue(v) => MetadataView::Inline(v),
            StreamCell::ConstantIndex(i) => MetadataView::Constant(self.constants[i as usize]),
            StreamCell::JumpdestInline(info) => MetadataView::Jumpdest(info),
            StreamCell::Handler(_) | StreamCell::JumpdestPointer(_) => {
                unreachable!("cell at idx + 1 is not a metadata cell")
            }
        }
    }

    /// Stream index of the handler cell for `pc`, for dynamic `JUMP`s.
    #[must_use]
    pub fn stream_index_for_pc(&self, pc: Pc) -> Option<StreamIdx> {
        self.pc_to_stream_idx.get(&pc).copied()
    }
}

/// A typed view of a metadata cell, as returned by
/// [`AdvancedPlan::metadata`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataView {
    Inline(u128),
    Constant(Word),
    Jumpdest(JumpdestInfo),
}

/// Whether `opcode` emits a metadata cell after its handler cell, per the
/// metadata-layout table (synthetic fused opcodes are handled separately by
/// the compiler, not through this table).
fn carries_metadata(opcode: u8) -> bool {
    opcode::is_push(opcode) || opcode == opcode::JUMPDEST || opcode == opcode::PC_OP
}

fn push_size_fits_inline(push_size: u8, config: &AnalysisConfig) -> bool {
    u32::from(push_size) * 8 <= config.word_size_bits
}

/// `value`'s low 16 bytes, as a `u128`. Only meaningful when the caller has
/// already established the value fits in 128 bits.
fn word_to_u128(value: Word) -> u128 {
    let bytes = value.to_be_bytes::<32>();
    #[allow(clippy::indexing_slicing)]
    let low16: [u8; 16] = bytes[16..32].try_into().unwrap_or([0u8; 16]);
    u128::from_be_bytes(low16)
}

fn push_constant(constants: &mut Vec<Word>, value: Word) -> u32 {
    constants.push(value);
    (constants.len() - 1) as u32
}

/// Compile an [`AnalyzedBytecode`] into an [`AdvancedPlan`].
///
/// `jumpdest_info` is the (fork-invariant) gas/stack metadata for the
/// `JUMPDEST` opcode itself; the real per-opcode gas/stack-effect table
/// belongs to an interpreter, so it is supplied by the caller rather than
/// looked up here.
pub fn build_advanced_plan<H: Copy>(
    analyzed: &AnalyzedBytecode,
    handler_table: &[H; 256],
    fusion_handlers: Option<&FusionHandlers<H>>,
    jumpdest_info: JumpdestInfo,
    config: &AnalysisConfig,
) -> Result<AdvancedPlan<H>, PlanError> {
    let op_starts: Vec<Pc> = analyzed.op_starts().collect();

    let mut stream: Vec<StreamCell<H>> = Vec::new();
    stream
        .try_reserve(op_starts.len().saturating_mul(2))
        .map_err(|_| PlanError::AllocationFailure)?;
    let mut constants: Vec<Word> = Vec::new();
    let mut pc_to_stream_idx: FxHashMap<Pc, StreamIdx> = FxHashMap::default();
    pc_to_stream_idx
        .try_reserve(op_starts.len())
        .map_err(|_| PlanError::AllocationFailure)?;

    let mut i = 0usize;
    while i < op_starts.len() {
        let pc = op_starts[i];
        let byte = analyzed.byte_at(pc).unwrap_or(opcode::STOP);
        pc_to_stream_idx.insert(pc, stream.len() as StreamIdx);

        if config.fusions_enabled && analyzed.is_fusion_candidate(pc) {
            if let Some(fused) = try_compile_fusion(
                analyzed,
                &op_starts,
                i,
                pc,
                byte,
                fusion_handlers,
                config,
                &mut stream,
                &mut constants,
            ) {
                i = fused;
                continue;
            }
        }

        compile_plain_instruction(analyzed, pc, byte, handler_table, jumpdest_info, config, &mut stream, &mut constants);
        i += 1;
    }

    Ok(AdvancedPlan {
        stream,
        constants,
        pc_to_stream_idx,
    })
}

/// Try to compile `op_starts[i]` (a fusion candidate) and its successor as
/// one synthetic instruction. Returns the next `op_starts` index to resume
/// at on success, or `None` if there is no registered handler for this
/// second-op (in which case the caller falls back to the plain path).
#[allow(clippy::too_many_arguments)]
fn try_compile_fusion<H: Copy>(
    analyzed: &AnalyzedBytecode,
    op_starts: &[Pc],
    i: usize,
    pc: Pc,
    byte: u8,
    fusion_handlers: Option<&FusionHandlers<H>>,
    config: &AnalysisConfig,
    stream: &mut Vec<StreamCell<H>>,
    constants: &mut Vec<Word>,
) -> Option<usize> {
    let fusion_handlers = fusion_handlers?;
    let successor_pc = *op_starts.get(i + 1)?;
    let successor_byte = analyzed.byte_at(successor_pc)?;
    let (inline_handler, pointer_handler) = fusion_handlers.get(successor_byte)?;

    let push_size = opcode::push_size(byte);
    let value = analyzed.read_push(pc, push_size)?;

    if push_size_fits_inline(push_size, config) {
        stream.push(StreamCell::Handler(inline_handler));
        stream.push(StreamCell::InlineValue(word_to_u128(value)));
    } else {
        let index = push_constant(constants, value);
        stream.push(StreamCell::Handler(pointer_handler));
        stream.push(StreamCell::ConstantIndex(index));
    }
    Some(i + 2)
}

fn compile_plain_instruction<H: Copy>(
    analyzed: &AnalyzedBytecode,
    pc: Pc,
    byte: u8,
    handler_table: &[H; 256],
    jumpdest_info: JumpdestInfo,
    config: &AnalysisConfig,
    stream: &mut Vec<StreamCell<H>>,
    constants: &mut Vec<Word>,
) {
    let handler = handler_table[byte as usize];
    stream.push(StreamCell::Handler(handler));

    if byte == opcode::JUMPDEST {
        // JumpdestInfo is always 8 bytes; config.validate() guarantees
        // word_size_bits >= 64, so this is always the inline branch.
        if config.word_size_bits >= 64 {
            stream.push(StreamCell::JumpdestInline(jumpdest_info));
        } else {
            stream.push(StreamCell::JumpdestPointer(handler));
        }
        return;
    }

    if byte == opcode::PC_OP {
        stream.push(StreamCell::InlineValue(u128::from(pc)));
        return;
    }

    let push_size = opcode::push_size(byte);
    if push_size == 0 {
        return;
    }
    let Some(value) = analyzed.read_push(pc, push_size) else {
        return;
    };
    let fits_inline = match push_size {
        1..=8 => true,
        9..=16 => config.word_size_bits >= 128,
        _ => false,
    };
    if fits_inline {
        stream.push(StreamCell::InlineValue(word_to_u128(value)));
    } else {
        let index = push_constant(constants, value);
        stream.push(StreamCell::ConstantIndex(index));
    }
}
