//! A lazy, human-readable view over validated bytecode.
//!
//! Disassembly is diagnostic tooling, not a hot path: it walks
//! [`AnalyzedBytecode::op_starts`] the same way the stats pass does, and
//! never duplicates the validator's own reasoning about what counts as an
//! instruction boundary.

use core::fmt::Write as _;

use crate::analyzed::{AnalyzedBytecode, Pc, Word};
use crate::opcode;

/// One decoded instruction, as produced by [`disassemble`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub pc: Pc,
    pub opcode: u8,
    /// `Some` only for `PUSH1..PUSH32`, and only when the operand lies
    /// entirely within the runtime region.
    pub push_value: Option<Word>,
    pub is_jumpdest: bool,
}

/// Lazily decode every instruction in `code`, in increasing `pc` order.
#[must_use]
pub fn disassemble(code: &AnalyzedBytecode) -> Disassembler<'_> {
    Disassembler { code, op_starts: code.op_starts() }
}

/// Iterator returned by [`disassemble`].
pub struct Disassembler<'a> {
    code: &'a AnalyzedBytecode,
    op_starts: crate::analyzed::OpStarts<'a>,
}

impl Iterator for Disassembler<'_> {
    type Item = Instruction;

    fn next(&mut self) -> Option<Instruction> {
        let pc = self.op_starts.next()?;
        let opcode = self.code.byte_at(pc)?;
        let push_size = opcode::push_size(opcode);
        let push_value = if push_size == 0 {
            None
        } else {
            self.code.read_push(pc, push_size)
        };
        Some(Instruction {
            pc,
            opcode,
            push_value,
            is_jumpdest: self.code.is_valid_jumpdest(pc),
        })
    }
}

/// Render `code` as one line per instruction, `pc: MNEMONIC[ value]`.
/// Unnamed/undefined opcodes print as `UNKNOWN(0xNN)`.
#[must_use]
pub fn pretty_print(code: &AnalyzedBytecode) -> String {
    let mut out = String::new();
    for instr in disassemble(code) {
        let mnemonic = mnemonic(instr.opcode);
        let _ = write!(out, "{:>6}: {mnemonic}", instr.pc);
        if let Some(value) = instr.push_value {
            let _ = write!(out, " 0x{value:x}");
        }
        if instr.is_jumpdest {
            out.push_str("  ; jumpdest");
        }
        out.push('\n');
    }
    out
}

/// A best-effort mnemonic table covering the opcodes this crate itself
/// reasons about. A full 256-entry mnemonic table belongs to an interpreter,
/// not this crate; everything else prints as `UNKNOWN(0xNN)`.
fn mnemonic(byte: u8) -> String {
    if opcode::is_push(byte) {
        return format!("PUSH{}", opcode::push_size(byte));
    }
    let name = match byte {
        opcode::STOP => "STOP",
        opcode::ADD => "ADD",
        opcode::MUL => "MUL",
        opcode::SUB => "SUB",
        opcode::DIV => "DIV",
        opcode::AND => "AND",
        opcode::OR => "OR",
        opcode::XOR => "XOR",
        opcode::JUMP => "JUMP",
        opcode::JUMPI => "JUMPI",
        opcode::PC_OP => "PC",
        opcode::JUMPDEST => "JUMPDEST",
        opcode::PUSH0 => "PUSH0",
        opcode::CODECOPY => "CODECOPY",
        opcode::RETURN => "RETURN",
        opcode::REVERT => "REVERT",
        opcode::INVALID => "INVALID",
        opcode::SELFDESTRUCT => "SELFDESTRUCT",
        _ => return format!("UNKNOWN(0x{byte:02x})"),
    };
    name.to_string()
}
