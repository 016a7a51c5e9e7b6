//! Pure, stateless classification of a single bytecode byte.
//!
//! This module never looks at neighboring bytes — whether byte `i` is really
//! reachable code, push data, or a valid jump target is a property of the
//! whole bytecode and is decided by [`crate::validator`], not here.

/// Opcode byte for `JUMPDEST`.
pub const JUMPDEST: u8 = 0x5B;
/// Opcode byte for `JUMP`.
pub const JUMP: u8 = 0x56;
/// Opcode byte for `JUMPI`.
pub const JUMPI: u8 = 0x57;
/// Opcode byte for `PC`.
pub const PC_OP: u8 = 0x58;
/// Opcode byte for `PUSH0` (EIP-3855). Carries no operand.
pub const PUSH0: u8 = 0x5F;
/// First `PUSHn` opcode byte (`PUSH1`).
pub const PUSH1: u8 = 0x60;
/// Last `PUSHn` opcode byte (`PUSH32`).
pub const PUSH32: u8 = 0x7F;
/// Opcode byte for `STOP`.
pub const STOP: u8 = 0x00;
/// Opcode byte for `CODECOPY`, used by the stats pass's constructor heuristic.
pub const CODECOPY: u8 = 0x39;
/// Opcode byte for `RETURN`.
pub const RETURN: u8 = 0xF3;
/// Opcode byte for `REVERT`.
pub const REVERT: u8 = 0xFD;
/// Opcode byte for `INVALID`.
pub const INVALID: u8 = 0xFE;
/// Opcode byte for `SELFDESTRUCT`.
pub const SELFDESTRUCT: u8 = 0xFF;

pub const ADD: u8 = 0x01;
pub const MUL: u8 = 0x02;
pub const SUB: u8 = 0x03;
pub const DIV: u8 = 0x04;
pub const AND: u8 = 0x16;
pub const OR: u8 = 0x17;
pub const XOR: u8 = 0x18;

/// The opcodes the validator and the advanced-plan compiler will fuse a
/// preceding `PUSHn` into, when fusion is enabled. This is the authoritative
/// set.
pub const FUSABLE_SECOND_OPS: [u8; 9] = [ADD, MUL, SUB, DIV, AND, OR, XOR, JUMP, JUMPI];

/// The narrower set the informational stats pass uses for its own
/// fusion-candidate bookkeeping. Deliberately not unified with
/// [`FUSABLE_SECOND_OPS`]: the stats pass predates fusion support and was
/// never widened to match it.
pub const STATS_FUSABLE_SECOND_OPS: [u8; 6] = [ADD, MUL, SUB, DIV, JUMP, JUMPI];

/// Classification of one opcode byte, independent of its position in the
/// bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeKind {
    /// A defined EVM opcode.
    Valid(u8),
    /// A byte with no assigned meaning. Legacy EVM semantics treat this as
    /// an implicit `INVALID` at execution time; preprocessing never rejects
    /// it.
    Undefined,
}

/// Everything [`classify`] can report about a single byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub kind: OpcodeKind,
    /// Number of operand bytes immediately following this opcode: 0 for
    /// everything except `PUSH1..PUSH32`, where it is `1..=32`.
    pub push_size: u8,
    /// Whether this byte is `JUMPDEST` (0x5B).
    pub is_jumpdest: bool,
    /// Whether execution cannot fall through past this opcode
    /// (`STOP`, `JUMP`, `RETURN`, `REVERT`, `INVALID`, `SELFDESTRUCT`).
    pub is_terminator: bool,
}

/// Classify a single bytecode byte. Pure and total: every `u8` value maps to
/// exactly one [`OpcodeInfo`].
#[inline]
#[must_use]
pub fn classify(byte: u8) -> OpcodeInfo {
    let push_size = push_size(byte);
    let is_jumpdest = byte == JUMPDEST;
    let is_terminator = matches!(byte, STOP | JUMP | RETURN | REVERT | INVALID | SELFDESTRUCT);
    let kind = if is_defined(byte) {
        OpcodeKind::Valid(byte)
    } else {
        OpcodeKind::Undefined
    };
    OpcodeInfo {
        kind,
        push_size,
        is_jumpdest,
        is_terminator,
    }
}

/// Number of operand bytes `byte` consumes, 0 unless it is `PUSH1..PUSH32`.
#[inline]
#[must_use]
pub const fn push_size(byte: u8) -> u8 {
    if byte >= PUSH1 && byte <= PUSH32 {
        byte - PUSH1 + 1
    } else {
        0
    }
}

/// Whether `byte` is `PUSH1..PUSH32`.
#[inline]
#[must_use]
pub const fn is_push(byte: u8) -> bool {
    byte >= PUSH1 && byte <= PUSH32
}

/// Placeholder "is this opcode defined" oracle.
///
/// The real per-opcode enum and its gas/stack-effect table belong to an
/// interpreter: this crate only needs to know whether a byte is *some*
/// defined opcode to report [`OpcodeKind`], never which one or what it
/// costs. This table matches the legacy (pre-EOF) opcode set through the
/// Prague/Electra fork set used elsewhere in the workspace
/// (`crates/common/types/account/bytecode.rs`).
const fn is_defined(byte: u8) -> bool {
    matches!(
        byte,
        0x00..=0x0B
            | 0x10..=0x1E
            | 0x20
            | 0x30..=0x4B
            | 0x50..=0x5F
            | 0x60..=0x7F
            | 0x80..=0x8F
            | 0x90..=0x9F
            | 0xA0..=0xA4
            | 0xF0..=0xF5
            | 0xFA
            | 0xFD..=0xFF
            | 0xE6..=0xE8
    )
}
