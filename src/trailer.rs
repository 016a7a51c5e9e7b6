//! Detection of an optional compiler-emitted CBOR metadata trailer. Never
//! fails — a malformed or absent trailer simply means "treat the whole
//! input as code".

/// Smallest trailer that could possibly be valid: the `bzzr0`/`bzzr1` shape
/// (map header 1 + key 6 + byte-string header 2 + 32-byte hash) plus the
/// trailing 2-byte length field. `ipfs` trailers are one byte longer in the
/// key but two bytes longer in the hash, so this remains a safe lower bound
/// for both shapes.
const MIN_TRAILER_SIZE: usize = 1 + 6 + 2 + 32 + 2;
/// Minimum size of the trailer *body* (the part described by the trailing
/// length field, i.e. excluding those final 2 length bytes themselves).
const MIN_BODY_SIZE: usize = MIN_TRAILER_SIZE - 2;

const CBOR_MAP_1: u8 = 0xA1;
const CBOR_MAP_2: u8 = 0xA2;
const CBOR_BYTES_32: u8 = 0x58;
const CBOR_BYTES_20: u8 = 0x20;
const CBOR_BYTES_22: u8 = 0x22;

const KEY_IPFS: &[u8] = b"\x64ipfs";
const KEY_BZZR0: &[u8] = b"\x65bzzr0";
const KEY_BZZR1: &[u8] = b"\x65bzzr1";
const KEY_SOLC: &[u8] = b"\x64solc";

/// Which compiler-metadata hash scheme a trailer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailerKind {
    Ipfs,
    Swarm0,
    Swarm1,
}

/// A `major.minor.patch` solc version triple, if the trailer carried one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

/// Everything recovered from a valid trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailerDescriptor {
    /// Total trailer length in bytes, including the final 2-byte length
    /// field — i.e. `code[len - length_in_bytes ..]` is the trailer.
    pub length_in_bytes: usize,
    pub kind: TrailerKind,
    pub compiler_version: Option<CompilerVersion>,
}

/// Detect and parse a Solidity-style CBOR metadata trailer at the tail of
/// `code`. Returns `None` on any deviation — this function has no error
/// type because a missing or malformed trailer is never a rejection reason.
#[must_use]
pub fn detect_trailer(code: &[u8]) -> Option<TrailerDescriptor> {
    if code.len() < MIN_TRAILER_SIZE {
        return None;
    }

    let len = code.len();
    let length_bytes = code.get(len - 2..len)?;
    let claimed_len = u16::from_be_bytes([length_bytes[0], length_bytes[1]]) as usize;

    if claimed_len.checked_add(2)? > len || claimed_len < MIN_BODY_SIZE {
        return None;
    }

    let body_start = len - 2 - claimed_len;
    let body_end = len - 2;
    let body = &code[body_start..body_end];

    let (kind, rest) = parse_first_entry(body)?;

    let compiler_version = if rest.is_empty() {
        None
    } else {
        Some(parse_solc_entry(rest)?)
    };

    tracing::debug!(
        kind = ?kind,
        length_in_bytes = claimed_len + 2,
        "detected compiler metadata trailer"
    );

    Some(TrailerDescriptor {
        length_in_bytes: claimed_len + 2,
        kind,
        compiler_version,
    })
}

/// Parse the CBOR map header and first `{key: byte-string}` entry, returning
/// the trailer kind and whatever bytes remain (either empty, or a second
/// `"solc"` entry).
fn parse_first_entry(body: &[u8]) -> Option<(TrailerKind, &[u8])> {
    let (entry_count, rest) = match body.first()? {
        &CBOR_MAP_1 => (1u8, &body[1..]),
        &CBOR_MAP_2 => (2u8, &body[1..]),
        _ => return None,
    };

    for (key, header, hash_len, kind) in [
        (KEY_IPFS, CBOR_BYTES_22, 34usize, TrailerKind::Ipfs),
        (KEY_BZZR0, CBOR_BYTES_20, 32usize, TrailerKind::Swarm0),
        (KEY_BZZR1, CBOR_BYTES_20, 32usize, TrailerKind::Swarm1),
    ] {
        if let Some(after_key) = rest.strip_prefix(key) {
            let needed = 2 + hash_len;
            if after_key.len() < needed {
                return None;
            }
            if after_key[0] != CBOR_BYTES_32 || after_key[1] != header {
                return None;
            }
            let after_hash = &after_key[needed..];
            let entry_count_matches_remainder = match entry_count {
                1 => after_hash.is_empty(),
                _ => !after_hash.is_empty(),
            };
            return entry_count_matches_remainder.then_some((kind, after_hash));
        }
    }
    None
}

/// Parse the optional second `{"solc": <3-byte version>}` entry.
fn parse_solc_entry(rest: &[u8]) -> Option<CompilerVersion> {
    let after_key = rest.strip_prefix(KEY_SOLC)?;
    // solc versions are CBOR-encoded as a 3-byte byte string: header 0x43.
    let [header, major, minor, patch] = after_key else {
        return None;
    };
    if *header != 0x43 {
        return None;
    }
    Some(CompilerVersion {
        major: *major,
        minor: *minor,
        patch: *patch,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    fn ipfs_trailer(hash: [u8; 34], with_solc: Option<[u8; 3]>) -> Vec<u8> {
        let mut body = Vec::new();
        match with_solc {
            Some(_) => body.push(CBOR_MAP_2),
            None => body.push(CBOR_MAP_1),
        }
        body.extend_from_slice(KEY_IPFS);
        body.push(CBOR_BYTES_32);
        body.push(CBOR_BYTES_22);
        body.extend_from_slice(&hash);
        if let Some(v) = with_solc {
            body.extend_from_slice(KEY_SOLC);
            body.push(0x43);
            body.extend_from_slice(&v);
        }
        let len = body.len() as u16;
        body.extend_from_slice(&len.to_be_bytes());
        body
    }

    #[test]
    fn too_short_input_has_no_trailer() {
        assert!(detect_trailer(&[0u8; 4]).is_none());
    }

    #[test]
    fn well_formed_ipfs_trailer_without_solc() {
        let trailer = ipfs_trailer([0xAB; 34], None);
        let mut code = vec![0x60, 0x00];
        code.extend_from_slice(&trailer);
        let d = detect_trailer(&code).expect("trailer should parse");
        assert_eq!(d.kind, TrailerKind::Ipfs);
        assert_eq!(d.length_in_bytes, trailer.len());
        assert!(d.compiler_version.is_none());
    }

    #[test]
    fn well_formed_ipfs_trailer_with_solc() {
        let trailer = ipfs_trailer([0xCD; 34], Some([0, 8, 30]));
        let mut code = vec![0x60, 0x00];
        code.extend_from_slice(&trailer);
        let d = detect_trailer(&code).expect("trailer should parse");
        let v = d.compiler_version.expect("version should be present");
        assert_eq!((v.major, v.minor, v.patch), (0, 8, 30));
    }

    #[test]
    fn bzzr_variants_are_recognized() {
        let mut body = vec![CBOR_MAP_1];
        body.extend_from_slice(KEY_BZZR1);
        body.push(CBOR_BYTES_32);
        body.push(CBOR_BYTES_20);
        body.extend_from_slice(&[0x11; 32]);
        let len = body.len() as u16;
        body.extend_from_slice(&len.to_be_bytes());
        let d = detect_trailer(&body).expect("trailer should parse");
        assert_eq!(d.kind, TrailerKind::Swarm1);
    }

    #[test]
    fn claimed_length_longer_than_input_is_rejected() {
        let mut code = ipfs_trailer([0; 34], None);
        let n = code.len();
        code[n - 2] = 0xFF;
        code[n - 1] = 0xFF;
        assert!(detect_trailer(&code).is_none());
    }

    #[test]
    fn garbage_tail_is_not_a_trailer() {
        let code = vec![0x60, 0x01, 0x60, 0x02, 0x01, 0x00];
        assert!(detect_trailer(&code).is_none());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let mut body = vec![CBOR_MAP_1];
        body.extend_from_slice(b"\x64nope");
        body.push(CBOR_BYTES_32);
        body.push(CBOR_BYTES_22);
        body.extend_from_slice(&[0; 34]);
        let len = body.len() as u16;
        body.extend_from_slice(&len.to_be_bytes());
        assert!(detect_trailer(&body).is_none());
    }
}
