//! The `OP_RETURN` marker grammar.
//!
//! The stake-fee, consolidation, treasury, and SKA-burn sub-protocols all
//! tag outputs with fixed byte patterns on an otherwise-standard
//! `OP_RETURN` script. These patterns are consensus-level: any bit change
//! constitutes a different marker. The parser is table-driven and never
//! touches a script interpreter.

use byteorder::{ByteOrder, LittleEndian};

use super::Script;
use crate::asset::AssetId;

pub const OP_RETURN: u8 = 0x6a;
pub const OP_DUP: u8 = 0x76;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_CHECKSIG: u8 = 0xac;
/// Tags the payment outputs of vote and stake-fee transactions.
pub const OP_SSGEN: u8 = 0xbb;
pub const OP_SSTX: u8 = 0xba;
pub const OP_SSRTX: u8 = 0xbc;
pub const OP_TADD: u8 = 0xc1;
pub const OP_TSPEND: u8 = 0xc2;

const OP_DATA_20: u8 = 0x14;

/// The fixed prefix of an SKA emission signature script: a one-byte push
/// of `'S' 'K' 'A'`'s first byte would be ambiguous, so the marker is the
/// literal bytes `0x01 'S' 'K' 'A'` followed by the authorization version.
pub const SKA_EMISSION_SCRIPT_PREFIX: [u8; 4] = [0x01, b'S', b'K', b'A'];

/// The only supported emission authorization version. `0x01` is reserved
/// and always rejected.
pub const SKA_EMISSION_AUTH_VERSION: u8 = 0x02;

/// The minimum length of a well-formed emission signature script.
pub const SKA_EMISSION_SCRIPT_MIN_LEN: usize = 64;

/// A parsed `OP_RETURN` marker.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Marker {
    /// `"SF"`: a staker fee payment for the vote at `voter_seq` in the
    /// block at `height`.
    SsfeeStaker { height: u32, voter_seq: u16 },
    /// `"MF"`: a miner fee payment for the block at `height`.
    SsfeeMiner { height: u32 },
    /// `"SC"`: a consolidation address declared by a vote, routing the
    /// next epoch's staker fees.
    Consolidation { hash160: [u8; 20] },
    /// `"TV"`: a treasury vote; carried as opaque data here.
    TreasuryVote,
    /// `"SKA_BURN"`: the tagged output's value is permanently destroyed.
    SkaBurn { asset_id: AssetId },
}

type Decoder = fn(&[u8]) -> Option<Marker>;

/// Fixed-prefix marker table: `(push length, tag, payload decoder)`.
///
/// The full script is `OP_RETURN || push || tag || payload`, where `push`
/// covers both tag and payload.
const MARKER_TABLE: &[(u8, &[u8], Decoder)] = &[
    (0x08, b"SF", decode_ssfee_staker),
    (0x06, b"MF", decode_ssfee_miner),
    (0x16, b"SC", decode_consolidation),
    (0x09, b"SKA_BURN", decode_ska_burn),
];

fn decode_ssfee_staker(payload: &[u8]) -> Option<Marker> {
    if payload.len() != 6 {
        return None;
    }
    Some(Marker::SsfeeStaker {
        height: LittleEndian::read_u32(&payload[0..4]),
        voter_seq: LittleEndian::read_u16(&payload[4..6]),
    })
}

fn decode_ssfee_miner(payload: &[u8]) -> Option<Marker> {
    if payload.len() != 4 {
        return None;
    }
    Some(Marker::SsfeeMiner {
        height: LittleEndian::read_u32(&payload[0..4]),
    })
}

fn decode_consolidation(payload: &[u8]) -> Option<Marker> {
    if payload.len() != 20 {
        return None;
    }
    let mut hash160 = [0u8; 20];
    hash160.copy_from_slice(payload);
    Some(Marker::Consolidation { hash160 })
}

fn decode_ska_burn(payload: &[u8]) -> Option<Marker> {
    if payload.len() != 1 {
        return None;
    }
    Some(Marker::SkaBurn {
        asset_id: AssetId(payload[0]),
    })
}

impl Marker {
    /// Parses the fixed `OP_RETURN` byte patterns.
    ///
    /// The script must consist of `OP_RETURN` followed by a single direct
    /// data push covering the rest of the script; anything else is not a
    /// marker. Unknown tags return `None` rather than an error, because
    /// arbitrary `OP_RETURN` data is legal in regular outputs.
    pub fn parse(script: &Script) -> Option<Marker> {
        let s = script.as_bytes();
        if s.len() < 4 || s[0] != OP_RETURN {
            return None;
        }
        let push = s[1];
        if push as usize != s.len() - 2 || push > 75 {
            return None;
        }
        let data = &s[2..];

        for (push_len, tag, decode) in MARKER_TABLE {
            if push == *push_len && data.starts_with(tag) {
                return decode(&data[tag.len()..]);
            }
        }

        // Treasury votes are variable length behind the "TV" tag.
        if data.starts_with(b"TV") {
            return Some(Marker::TreasuryVote);
        }

        None
    }
}

/// Returns true if `script` begins with the SKA emission marker bytes and
/// is long enough to hold an authorization.
///
/// This is the shape test used by transaction-type detection; field-level
/// parsing and verification happen during block validation.
pub fn has_emission_script_prefix(script: &Script) -> bool {
    let s = script.as_bytes();
    s.len() >= SKA_EMISSION_SCRIPT_MIN_LEN && s.starts_with(&SKA_EMISSION_SCRIPT_PREFIX)
}

/// Extracts the hash160 from a pay-to-pubkey-hash script.
///
/// Recognises the 25-byte standard shape
/// `OP_DUP OP_HASH160 push20 <h160> OP_EQUALVERIFY OP_CHECKSIG`
/// and the 26-byte stake-tagged variant prefixed with `OP_SSGEN`.
pub fn p2pkh_hash160(script: &Script) -> Option<[u8; 20]> {
    let s = script.as_bytes();
    let body = match s.len() {
        25 => s,
        26 if s[0] == OP_SSGEN => &s[1..],
        _ => return None,
    };
    if body[0] != OP_DUP
        || body[1] != OP_HASH160
        || body[2] != OP_DATA_20
        || body[23] != OP_EQUALVERIFY
        || body[24] != OP_CHECKSIG
    {
        return None;
    }
    let mut hash160 = [0u8; 20];
    hash160.copy_from_slice(&body[3..23]);
    Some(hash160)
}

/// Returns true for the 26-byte `OP_SSGEN`-tagged pay-to-pubkey-hash
/// shape required of stake payment outputs.
pub fn is_stake_gen_p2pkh(script: &Script) -> bool {
    script.len() == 26 && script.as_bytes()[0] == OP_SSGEN && p2pkh_hash160(script).is_some()
}

/// Builds the 25-byte standard pay-to-pubkey-hash script.
pub fn pay_to_pubkey_hash(hash160: [u8; 20]) -> Script {
    let mut s = Vec::with_capacity(25);
    s.extend_from_slice(&[OP_DUP, OP_HASH160, OP_DATA_20]);
    s.extend_from_slice(&hash160);
    s.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    Script(s)
}

/// Builds the 26-byte stake-tagged pay-to-pubkey-hash script.
pub fn stake_gen_pay_to_pubkey_hash(hash160: [u8; 20]) -> Script {
    let mut s = Vec::with_capacity(26);
    s.push(OP_SSGEN);
    s.extend_from_slice(&pay_to_pubkey_hash(hash160).0);
    Script(s)
}

fn op_return_push(data: &[u8]) -> Script {
    debug_assert!(data.len() <= 75);
    let mut s = Vec::with_capacity(2 + data.len());
    s.push(OP_RETURN);
    s.push(data.len() as u8);
    s.extend_from_slice(data);
    Script(s)
}

/// Builds a staker fee marker (`"SF"`).
pub fn ssfee_staker_marker(height: u32, voter_seq: u16) -> Script {
    let mut data = Vec::with_capacity(8);
    data.extend_from_slice(b"SF");
    data.extend_from_slice(&height.to_le_bytes());
    data.extend_from_slice(&voter_seq.to_le_bytes());
    op_return_push(&data)
}

/// Builds a miner fee marker (`"MF"`).
pub fn ssfee_miner_marker(height: u32) -> Script {
    let mut data = Vec::with_capacity(6);
    data.extend_from_slice(b"MF");
    data.extend_from_slice(&height.to_le_bytes());
    op_return_push(&data)
}

/// Builds a consolidation-address marker (`"SC"`).
pub fn consolidation_marker(hash160: [u8; 20]) -> Script {
    let mut data = Vec::with_capacity(22);
    data.extend_from_slice(b"SC");
    data.extend_from_slice(&hash160);
    op_return_push(&data)
}

/// Builds an SKA burn marker.
pub fn ska_burn_marker(asset_id: AssetId) -> Script {
    let mut data = Vec::with_capacity(9);
    data.extend_from_slice(b"SKA_BURN");
    data.push(asset_id.0);
    op_return_push(&data)
}

/// Builds a treasury vote marker with opaque vote data.
pub fn treasury_vote_marker(vote_data: &[u8]) -> Script {
    let mut data = Vec::with_capacity(2 + vote_data.len());
    data.extend_from_slice(b"TV");
    data.extend_from_slice(vote_data);
    op_return_push(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staker_marker_roundtrip() {
        let script = ssfee_staker_marker(123_456, 7);
        assert_eq!(script.len(), 10);
        assert_eq!(
            Marker::parse(&script),
            Some(Marker::SsfeeStaker {
                height: 123_456,
                voter_seq: 7
            })
        );
    }

    #[test]
    fn miner_marker_roundtrip() {
        let script = ssfee_miner_marker(42);
        assert_eq!(script.len(), 8);
        assert_eq!(Marker::parse(&script), Some(Marker::SsfeeMiner { height: 42 }));
    }

    #[test]
    fn consolidation_marker_roundtrip() {
        let hash160 = [0xab; 20];
        let script = consolidation_marker(hash160);
        assert_eq!(script.len(), 24);
        assert_eq!(
            Marker::parse(&script),
            Some(Marker::Consolidation { hash160 })
        );
    }

    #[test]
    fn burn_marker_roundtrip() {
        let script = ska_burn_marker(AssetId(9));
        assert_eq!(script.len(), 11);
        assert_eq!(
            Marker::parse(&script),
            Some(Marker::SkaBurn {
                asset_id: AssetId(9)
            })
        );
    }

    #[test]
    fn treasury_vote_marker_parses() {
        let script = treasury_vote_marker(&[1, 2, 3]);
        assert_eq!(Marker::parse(&script), Some(Marker::TreasuryVote));
    }

    #[test]
    fn non_markers_are_ignored() {
        // not OP_RETURN
        assert_eq!(Marker::parse(&pay_to_pubkey_hash([0; 20])), None);
        // push length disagrees with script length
        assert_eq!(Marker::parse(&Script(vec![OP_RETURN, 9, b'S', b'F'])), None);
        // unknown tag
        let script = op_return_push(b"XYdata");
        assert_eq!(Marker::parse(&script), None);
        // empty script
        assert_eq!(Marker::parse(&Script(vec![])), None);
    }

    #[test]
    fn p2pkh_detection() {
        let hash160 = [0x11; 20];
        assert_eq!(p2pkh_hash160(&pay_to_pubkey_hash(hash160)), Some(hash160));
        assert_eq!(
            p2pkh_hash160(&stake_gen_pay_to_pubkey_hash(hash160)),
            Some(hash160)
        );
        assert!(is_stake_gen_p2pkh(&stake_gen_pay_to_pubkey_hash(hash160)));
        assert!(!is_stake_gen_p2pkh(&pay_to_pubkey_hash(hash160)));
        assert_eq!(p2pkh_hash160(&Script(vec![OP_DUP; 25])), None);
    }

    #[test]
    fn emission_prefix_detection() {
        let mut script = SKA_EMISSION_SCRIPT_PREFIX.to_vec();
        script.push(SKA_EMISSION_AUTH_VERSION);
        script.resize(80, 0);
        assert!(has_emission_script_prefix(&Script(script.clone())));

        // too short to hold an authorization
        script.truncate(32);
        assert!(!has_emission_script_prefix(&Script(script)));
    }
}
