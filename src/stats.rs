//! A secondary, informational read-only sweep over validated bytecode.
//!
//! This walks `is_op_start`, never raw bytes directly, so its output can
//! never disagree with the authoritative bit-planes produced by the
//! validator.

use crate::analyzed::{AnalyzedBytecode, Pc, Word};
use crate::opcode::{self, STATS_FUSABLE_SECOND_OPS};

/// A decoded `PUSHn` instruction, recorded by the stats pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushRecord {
    pub pc: Pc,
    pub size: u8,
    pub value: Word,
}

/// A static jump: a `PUSHn` immediately followed by `JUMP`/`JUMPI`, with the
/// jump's own PC and the statically-known target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpRecord {
    pub pc_of_jump_op: Pc,
    pub static_target: Word,
}

/// Informational histograms and lists produced by the stats pass. Nothing
/// downstream depends on these values — they exist for tooling and tests.
#[derive(Debug, Clone)]
pub struct Stats {
    pub opcode_histogram: [u64; 256],
    pub push_records: Vec<PushRecord>,
    /// Fusion candidates per this pass's own (narrower) detection, which is
    /// informational only; [`AnalyzedBytecode::is_fusion_candidate`] is
    /// authoritative.
    pub fusion_candidates: Vec<Pc>,
    pub jumpdests: Vec<Pc>,
    pub jumps: Vec<JumpRecord>,
    pub backwards_jumps_count: u64,
    /// Whether the bytecode contains a `CODECOPY`, a common (if imprecise)
    /// heuristic for "this looks like constructor/initcode".
    pub looks_like_constructor: bool,
}

/// Run the stats pass over `code`.
#[must_use]
pub fn stats(code: &AnalyzedBytecode) -> Stats {
    let mut opcode_histogram = [0u64; 256];
    let mut push_records = Vec::new();
    let mut fusion_candidates = Vec::new();
    let mut jumpdests = Vec::new();
    let mut jumps = Vec::new();
    let mut backwards_jumps_count = 0u64;
    let mut looks_like_constructor = false;

    let op_starts: Vec<Pc> = code.op_starts().collect();

    for (idx, &pc) in op_starts.iter().enumerate() {
        let byte = match code.byte_at(pc) {
            Some(b) => b,
            None => continue,
        };
        opcode_histogram[byte as usize] = opcode_histogram[byte as usize].saturating_add(1);

        if byte == opcode::CODECOPY {
            looks_like_constructor = true;
        }

        if code.is_valid_jumpdest(pc) {
            jumpdests.push(pc);
        }

        let push_size = opcode::push_size(byte);
        if push_size == 0 {
            continue;
        }
        let Some(value) = code.read_push(pc, push_size) else {
            continue;
        };
        push_records.push(PushRecord {
            pc,
            size: push_size,
            value,
        });

        let Some(&successor_pc) = op_starts.get(idx + 1) else {
            continue;
        };
        let Some(successor) = code.byte_at(successor_pc) else {
            continue;
        };
        if successor_pc == pc + Pc::from(push_size) + 1 && STATS_FUSABLE_SECOND_OPS.contains(&successor) {
            fusion_candidates.push(pc);
        }
        if matches!(successor, opcode::JUMP | opcode::JUMPI) && successor_pc == pc + Pc::from(push_size) + 1 {
            jumps.push(JumpRecord {
                pc_of_jump_op: successor_pc,
                static_target: value,
            });
            if value <= Word::from(pc) {
                backwards_jumps_count = backwards_jumps_count.saturating_add(1);
            }
        }
    }

    Stats {
        opcode_histogram,
        push_records,
        fusion_candidates,
        jumpdests,
        jumps,
        backwards_jumps_count,
        looks_like_constructor,
    }
}
