//! The minimal dispatch plan — a dense 256-entry handler table indexed
//! directly by opcode byte, with the program counter doubling as the
//! instruction index.

use crate::analyzed::{AnalyzedBytecode, Pc};

/// Borrows an [`AnalyzedBytecode`] and a caller-supplied, dense 256-entry
/// handler table. `PC == instruction index`; `PUSHn` metadata is read on
/// demand through [`AnalyzedBytecode::read_push`] rather than by slicing
/// raw bytes, so the validation boundary is always honored.
#[derive(Debug, Clone, Copy)]
pub struct MinimalPlan<'a, H> {
    analyzed: &'a AnalyzedBytecode,
    handler_table: [H; 256],
}

impl<'a, H: Copy> MinimalPlan<'a, H> {
    /// The handler registered for the opcode at `pc`, or `None` if `pc` is
    /// out of range.
    #[must_use]
    pub fn handler_at(&self, pc: Pc) -> Option<H> {
        let byte = self.analyzed.byte_at(pc)?;
        Some(self.handler_table[byte as usize])
    }

    #[must_use]
    pub fn analyzed(&self) -> &'a AnalyzedBytecode {
        self.analyzed
    }

    #[must_use]
    pub fn handler_table(&self) -> &[H; 256] {
        &self.handler_table
    }
}

/// Build a [`MinimalPlan`]. Infallible: the plan borrows `analyzed` and the
/// caller-owned table, allocating nothing of its own.
#[must_use]
pub fn build_minimal_plan<H: Copy>(
    analyzed: &AnalyzedBytecode,
    handler_table: [H; 256],
) -> MinimalPlan<'_, H> {
    MinimalPlan {
        analyzed,
        handler_table,
    }
}
