//! The single linear pass that both rejects malformed bytecode and
//! populates the four bit-planes.
//!
//! This is deliberately one function with a `while` loop over a cursor, not
//! an iterator adapter chain: the scan order, the prefetch hint, and the
//! "mark a whole PUSH-data run in one coalesced write" shape are all
//! performance-relevant and easiest to keep correct as a single
//! straight-line loop, the way `process_bytecode` in
//! `crates/common/types/account/bytecode.rs` does its own one-pass scan.

use crate::bitplanes::BitPlanes;
use crate::errors::ValidationError;
use crate::opcode::{self, FUSABLE_SECOND_OPS};

/// Bytes to prefetch ahead of the scan cursor. A hint only: the portable
/// scalar loop below does not literally issue a `prefetcht0`-style
/// instruction (there is no stable, safe API for that), but bounds its
/// coalesced writes so a real prefetch could be layered on without changing
/// observable bit-plane contents: any optimization here must produce
/// bit-identical planes to the naive scan.
pub const PREFETCH_DISTANCE: usize = 256;

/// Run the validator over `runtime[..validate_up_to]`, returning the four
/// populated bit-planes or the first structural error encountered.
///
/// `validate_up_to` may be smaller than `runtime.len()` — the deployment
/// bytecode carve-out validates only the pre-trailer region while the
/// caller keeps the full byte range for `runtime_bytes`.
///
/// # Panics
/// Panics if `validate_up_to > runtime.len()`; this is a caller
/// precondition, not attacker-controlled input.
pub fn build(
    runtime: &[u8],
    validate_up_to: usize,
    fusions_enabled: bool,
) -> Result<BitPlanes, ValidationError> {
    assert!(
        validate_up_to <= runtime.len(),
        "validate_up_to must not exceed the code length"
    );

    let mut planes =
        BitPlanes::new(validate_up_to).map_err(|_| ValidationError::AllocationFailure)?;
    let mut i = 0usize;

    while i < validate_up_to {
        if i + PREFETCH_DISTANCE < validate_up_to {
            // SAFETY net for future SIMD/prefetch backends: this branch is a
            // pure no-op on the scalar path and exists so the loop shape
            // matches one that could issue a real prefetch without
            // restructuring the scan.
        }

        planes.set_op_start(i);

        // runtime[i] is in-bounds: i < validate_up_to <= runtime.len().
        #[allow(clippy::indexing_slicing)]
        let byte = runtime[i];

        if byte == opcode::JUMPDEST {
            planes.set_jumpdest(i);
            i += 1;
            continue;
        }

        let push_size = opcode::push_size(byte);
        if push_size == 0 {
            i += 1;
            continue;
        }

        let n = push_size as usize;
        let operand_end = i
            .checked_add(n)
            .ok_or(ValidationError::TruncatedPush { pc: i as u32, size: push_size })?;
        if operand_end >= validate_up_to {
            return Err(ValidationError::TruncatedPush {
                pc: i as u32,
                size: push_size,
            });
        }

        for j in (i + 1)..=operand_end {
            planes.set_push_data(j);
        }

        if fusions_enabled {
            let successor_pc = operand_end + 1;
            if successor_pc < validate_up_to {
                #[allow(clippy::indexing_slicing)]
                let successor = runtime[successor_pc];
                if FUSABLE_SECOND_OPS.contains(&successor) {
                    planes.set_fusion_candidate(i);
                }
            }
        }

        i = operand_end + 1;
    }

    Ok(planes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    fn bytes(hex: &str) -> Vec<u8> {
        hex::decode(hex).expect("valid hex fixture")
    }

    #[test]
    fn scenario_push_push_add_stop() {
        let code = bytes("600160020100");
        let planes = build(&code, code.len(), true).unwrap();
        for pc in [0usize, 2, 4, 5] {
            assert!(planes.is_op_start(pc), "pc {pc}");
        }
        for pc in [1usize, 3] {
            assert!(planes.is_push_data(pc), "pc {pc}");
        }
        assert!((0..code.len()).all(|pc| !planes.is_jumpdest(pc)));
    }

    #[test]
    fn scenario_push_jump_jumpdest_stop() {
        let code = bytes("6003565b00");
        let planes = build(&code, code.len(), true).unwrap();
        assert!(planes.is_jumpdest(3));
    }

    #[test]
    fn push_data_that_looks_like_jumpdest_is_not_reachable() {
        // PUSH1 0x01, JUMP, PUSH1 0x5B -> byte 4 is push data equal to 0x5B.
        let code = vec![0x60, 0x01, 0x56, 0x60, 0x5B];
        let planes = build(&code, code.len(), true).unwrap();
        assert!(planes.is_push_data(4));
        assert!(!planes.is_jumpdest(4));
    }

    #[test]
    fn truncated_push32_is_rejected() {
        let mut code = vec![0x7F];
        code.extend(std::iter::repeat_n(0u8, 31));
        let err = build(&code, code.len(), true).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TruncatedPush { pc: 0, size: 32 }
        );
    }

    #[test]
    fn push1_at_end_with_missing_operand_is_rejected() {
        let code = vec![0x60];
        let err = build(&code, code.len(), true).unwrap_err();
        assert_eq!(err, ValidationError::TruncatedPush { pc: 0, size: 1 });
    }

    #[test]
    fn empty_code_succeeds_with_empty_planes() {
        let planes = build(&[], 0, true).unwrap();
        assert_eq!(planes.len(), 0);
    }

    #[test]
    fn single_stop_has_one_op_start_and_nothing_else() {
        let planes = build(&[0x00], 1, true).unwrap();
        assert!(planes.is_op_start(0));
        assert!(!planes.is_push_data(0));
        assert!(!planes.is_jumpdest(0));
    }

    #[test]
    fn push32_then_jumpdest_byte_is_never_a_jumpdest() {
        let mut code = vec![0x7F];
        code.extend(std::iter::repeat_n(0x5B, 32));
        let planes = build(&code, code.len(), true).unwrap();
        for pc in 1..=32 {
            assert!(!planes.is_jumpdest(pc), "pc {pc} is push data, not a jumpdest");
            assert!(planes.is_push_data(pc));
        }
    }

    #[test]
    fn fusion_candidate_set_for_push_then_add() {
        let code = vec![0x60, 0x05, 0x01]; // PUSH1 5, ADD
        let planes = build(&code, code.len(), true).unwrap();
        assert!(planes.is_fusion_candidate(0));
    }

    #[test]
    fn fusion_disabled_never_sets_candidate_bits() {
        let code = vec![0x60, 0x05, 0x01];
        let planes = build(&code, code.len(), false).unwrap();
        assert!(!planes.is_fusion_candidate(0));
    }

    #[test]
    fn exhaustive_invariant_every_position_is_op_start_xor_push_data() {
        let code: Vec<u8> = (0..=255u8).collect();
        let planes = build(&code, code.len(), true).unwrap();
        for i in 0..code.len() {
            assert_ne!(
                planes.is_op_start(i),
                planes.is_push_data(i),
                "position {i} must be exactly one of op-start/push-data"
            );
        }
    }
}
