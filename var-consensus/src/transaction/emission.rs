//! The SKA one-time emission authorizer.
//!
//! An emission transaction has exactly one null input whose signature
//! script carries a signed authorization. The signed message is domain
//! separated, pinned to the network id, and pinned to the transaction's
//! no-witness serialization, so an authorization cannot be replayed on
//! another network, for another nonce, or with redirected outputs.

use once_cell::sync::Lazy;
use secp256k1::{Message, PublicKey, Secp256k1, Signature, VerifyOnly};
use sha2::{Digest, Sha256};
use std::convert::TryInto;

use var_chain::{
    amount::{Amount, NonNegative},
    asset::AssetId,
    block::Height,
    transaction::Transaction,
    transparent::{Script, SKA_EMISSION_AUTH_VERSION, SKA_EMISSION_SCRIPT_PREFIX},
};

use crate::chain_state::ChainState;
use crate::error::EmissionError;

static SECP: Lazy<Secp256k1<VerifyOnly>> = Lazy::new(Secp256k1::verification_only);

/// The domain separator of the emission message.
pub const EMISSION_MESSAGE_DOMAIN: &[u8] = b"SKA-EMIT-V2";

/// The largest DER signature the authorizer accepts.
pub const MAX_SIGNATURE_LENGTH: usize = 73;

/// Half the secp256k1 group order, big endian. Signatures with `S`
/// above this are malleable and rejected as non-canonical.
const HALF_CURVE_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b,
    0x20, 0xa0,
];

/// A parsed emission authorization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmissionAuthorization {
    /// The successor of the asset's stored emission nonce.
    pub nonce: u64,
    /// The asset being emitted.
    pub asset_id: AssetId,
    /// The total atoms the authorization permits.
    pub amount: i64,
    /// The height the authorizer signed for; must fall in the asset's
    /// emission window.
    pub authorized_height: i64,
    /// The signing key; must byte-equal the configured emission key.
    pub pubkey: PublicKey,
    /// The DER-encoded ECDSA signature.
    pub signature: Vec<u8>,
}

/// The accepted outcome of an emission check: what the state layer must
/// record when the block commits.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct EmissionOutcome {
    pub asset_id: AssetId,
    /// The new stored nonce (the authorization's nonce).
    pub nonce: u64,
    pub amount: Amount<NonNegative>,
}

/// Parses the authorization out of an emission input's signature
/// script.
///
/// Layout: `0x01 'S' 'K' 'A' || version || nonce(8 LE) || asset_id ||
/// amount(8 LE) || authorized_height(8 LE) || pubkey(33) || sig_len ||
/// signature`. Authorization version `0x01` is reserved and always
/// rejected; only `0x02` parses.
pub fn parse_emission_authorization(
    script: &Script,
) -> Result<EmissionAuthorization, EmissionError> {
    let s = script.as_bytes();
    if s.len() < 64 || !s.starts_with(&SKA_EMISSION_SCRIPT_PREFIX) {
        return Err(EmissionError::MalformedEmission(
            "signature script does not carry an emission authorization",
        ));
    }
    if s[4] != SKA_EMISSION_AUTH_VERSION {
        return Err(EmissionError::MalformedEmission(
            "unsupported emission authorization version",
        ));
    }

    let nonce = u64::from_le_bytes(s[5..13].try_into().expect("slice is 8 bytes"));
    let asset_id = AssetId(s[13]);
    let amount = i64::from_le_bytes(s[14..22].try_into().expect("slice is 8 bytes"));
    let authorized_height = i64::from_le_bytes(s[22..30].try_into().expect("slice is 8 bytes"));
    let pubkey = PublicKey::from_slice(&s[30..63])
        .map_err(|_| EmissionError::BadSignatureFormat("invalid compressed public key"))?;

    let sig_len = s[63] as usize;
    if sig_len > MAX_SIGNATURE_LENGTH {
        return Err(EmissionError::BadSignatureFormat("signature too long"));
    }
    if s.len() != 64 + sig_len {
        return Err(EmissionError::MalformedEmission(
            "authorization length disagrees with its signature length",
        ));
    }
    let signature = s[64..].to_vec();

    Ok(EmissionAuthorization {
        nonce,
        asset_id,
        amount,
        authorized_height,
        pubkey,
        signature,
    })
}

/// Serializes an authorization into an emission signature script.
///
/// Wallet-side mirror of [`parse_emission_authorization`]; also used to
/// build test vectors.
pub fn encode_emission_authorization(auth: &EmissionAuthorization) -> Script {
    let mut s = Vec::with_capacity(64 + auth.signature.len());
    s.extend_from_slice(&SKA_EMISSION_SCRIPT_PREFIX);
    s.push(SKA_EMISSION_AUTH_VERSION);
    s.extend_from_slice(&auth.nonce.to_le_bytes());
    s.push(auth.asset_id.0);
    s.extend_from_slice(&auth.amount.to_le_bytes());
    s.extend_from_slice(&auth.authorized_height.to_le_bytes());
    s.extend_from_slice(&auth.pubkey.serialize());
    s.push(auth.signature.len() as u8);
    s.extend_from_slice(&auth.signature);
    Script(s)
}

/// The 32-byte message an emission signature commits to.
///
/// `SHA256(domain || net_id(4 LE) || asset_id || nonce(8 LE) ||
/// authorized_height(8 LE) || SHA256(no-witness tx))`. Hashing the
/// no-witness form pins every output (so redirecting a recipient breaks
/// the signature) while excluding the signature script itself.
pub fn emission_message(
    net_id: u32,
    auth: &EmissionAuthorization,
    tx: &Transaction,
) -> Result<[u8; 32], EmissionError> {
    let tx_bytes = tx
        .var_serialize_no_witness_to_vec()
        .map_err(|_| EmissionError::MalformedEmission("transaction failed to serialize"))?;
    let inner = Sha256::digest(&tx_bytes);

    let mut hasher = Sha256::new();
    hasher.update(EMISSION_MESSAGE_DOMAIN);
    hasher.update(&net_id.to_le_bytes());
    hasher.update(&[auth.asset_id.0]);
    hasher.update(&auth.nonce.to_le_bytes());
    hasher.update(&auth.authorized_height.to_le_bytes());
    hasher.update(&inner);

    let digest = hasher.finalize();
    let mut msg = [0u8; 32];
    msg.copy_from_slice(&digest);
    Ok(msg)
}

/// Verifies the authorization's signature over `msg`.
///
/// The signature must be valid DER, must use a low `S` (at most half
/// the curve order), and must verify under the authorization's key.
pub fn verify_emission_signature(
    auth: &EmissionAuthorization,
    msg: &[u8; 32],
) -> Result<(), EmissionError> {
    let signature = Signature::from_der(&auth.signature)
        .map_err(|_| EmissionError::BadSignatureFormat("signature is not valid DER"))?;

    let compact = signature.serialize_compact();
    if &compact[32..] > &HALF_CURVE_ORDER[..] {
        return Err(EmissionError::NonCanonicalSignature);
    }

    let message = Message::from_slice(msg).expect("emission messages are 32 bytes");
    SECP.verify(&message, &signature, &auth.pubkey)
        .map_err(|_| EmissionError::SignatureMismatch)
}

/// Runs the full emission check against the chain state.
///
/// On success returns the transition the state layer must record when
/// the enclosing block commits.
pub fn check_emission_transaction(
    tx: &Transaction,
    height: Height,
    state: &impl ChainState,
) -> Result<EmissionOutcome, EmissionError> {
    let params = state.chain_params();

    if !tx.has_single_null_input() {
        return Err(EmissionError::MalformedEmission(
            "emission requires exactly one null input",
        ));
    }
    if tx.outputs.is_empty() {
        return Err(EmissionError::MalformedEmission("emission has no outputs"));
    }
    if !tx.lock_time.is_unlocked() || tx.expiry != 0 {
        return Err(EmissionError::MalformedEmission(
            "emission must not carry a lock time or expiry",
        ));
    }
    if tx.outputs.iter().any(|o| o.script_version != 0) {
        return Err(EmissionError::MalformedEmission(
            "emission outputs must use script version 0",
        ));
    }

    let auth = parse_emission_authorization(&tx.inputs[0].signature_script)?;

    if !auth.asset_id.is_ska() {
        return Err(EmissionError::UnknownAsset(auth.asset_id));
    }
    let coin = params
        .ska_coin(auth.asset_id)
        .ok_or(EmissionError::UnknownAsset(auth.asset_id))?;

    if tx.outputs.iter().any(|o| o.asset_id != auth.asset_id) {
        return Err(EmissionError::InconsistentAsset);
    }

    if height.0 < params.stake_validation_height {
        return Err(EmissionError::PreStakeValidationHeight);
    }
    // SKA-1 launched with the chain; later assets wait for their
    // activation vote.
    if auth.asset_id.0 >= 2 && !state.is_ska_vote_active(auth.asset_id) {
        return Err(EmissionError::InactiveVoteGate(auth.asset_id));
    }

    if state.has_emission_occurred(auth.asset_id) {
        return Err(EmissionError::AlreadyEmitted(auth.asset_id));
    }
    let stored = state.emission_nonce(auth.asset_id);
    if auth.nonce != stored + 1 {
        return Err(EmissionError::InvalidNonce {
            stored,
            actual: auth.nonce,
        });
    }

    let authorized_in_window = auth.authorized_height >= 0
        && auth.authorized_height <= i64::from(u32::MAX)
        && coin.window_contains(auth.authorized_height as u32);
    if !authorized_in_window || !coin.window_contains(height.0) {
        return Err(EmissionError::OutsideEmissionWindow {
            authorized: auth.authorized_height,
            current: height.0,
        });
    }

    let total: Result<Amount<NonNegative>, _> = tx.outputs.iter().map(|o| o.value).sum();
    let total = total.map_err(|_| EmissionError::AmountMismatch)?;
    let configured = coin
        .emission_total()
        .map_err(|_| EmissionError::AmountMismatch)?;
    if auth.amount != total.atoms() || total != configured {
        return Err(EmissionError::AmountMismatch);
    }

    if auth.pubkey.serialize() != coin.emission_pubkey.serialize() {
        return Err(EmissionError::UnauthorizedKey);
    }

    let msg = emission_message(params.net_id, &auth, tx)?;
    verify_emission_signature(&auth, &msg)?;

    Ok(EmissionOutcome {
        asset_id: auth.asset_id,
        nonce: auth.nonce,
        amount: total,
    })
}


#[cfg(test)]
mod tests {
    use super::test_vectors::*;
    use super::*;
    use std::collections::BTreeMap;
    use std::convert::TryFrom;

    use var_chain::parameters::{Network, NetworkParams};
    use var_chain::stake::{determine_tx_type, TxType};
    use var_chain::transparent::p2pkh_hash160;

    /// An in-memory fake of the chain state.
    struct FakeState {
        params: NetworkParams,
        nonces: BTreeMap<AssetId, u64>,
        emitted: BTreeMap<AssetId, bool>,
        active_votes: Vec<AssetId>,
    }

    impl FakeState {
        fn new(params: NetworkParams) -> FakeState {
            FakeState {
                params,
                nonces: BTreeMap::new(),
                emitted: BTreeMap::new(),
                active_votes: Vec::new(),
            }
        }
    }

    impl ChainState for FakeState {
        fn chain_params(&self) -> &NetworkParams {
            &self.params
        }

        fn has_emission_occurred(&self, asset_id: AssetId) -> bool {
            self.emitted.get(&asset_id).copied().unwrap_or(false)
        }

        fn emission_nonce(&self, asset_id: AssetId) -> u64 {
            self.nonces.get(&asset_id).copied().unwrap_or(0)
        }

        fn fetch_utxo_entry(
            &self,
            _outpoint: &var_chain::transparent::OutPoint,
        ) -> Option<var_chain::transparent::UtxoEntry> {
            None
        }

        fn is_ska_vote_active(&self, asset_id: AssetId) -> bool {
            self.active_votes.contains(&asset_id)
        }
    }

    fn testnet_state() -> FakeState {
        let mut params = NetworkParams::for_network(Network::Testnet);
        adopt_test_key(&mut params, AssetId(1));
        FakeState::new(params)
    }

    #[test]
    fn valid_emission_is_accepted() {
        var_test::init();

        let state = testnet_state();
        let tx = signed_emission(&state.params, AssetId(1), 1, 64);
        assert_eq!(determine_tx_type(&tx), TxType::SkaEmission);

        let outcome = check_emission_transaction(&tx, var_chain::block::Height(64), &state)
            .expect("the configured emission verifies");
        assert_eq!(outcome.asset_id, AssetId(1));
        assert_eq!(outcome.nonce, 1);
        assert_eq!(
            outcome.amount,
            state.params.ska_coins[&AssetId(1)].max_supply
        );
    }

    #[test]
    fn emission_accepted_across_the_whole_window() {
        var_test::init();

        let state = testnet_state();
        for height in vec![64u32, 100, 164] {
            let tx = signed_emission(&state.params, AssetId(1), 1, height as i64);
            check_emission_transaction(&tx, var_chain::block::Height(height), &state)
                .expect("heights inside the window are accepted");
        }
    }

    #[test]
    fn miner_redirect_breaks_the_signature() {
        var_test::init();

        let state = testnet_state();
        let mut tx = signed_emission(&state.params, AssetId(1), 1, 64);

        // Redirect the first recipient, keeping the signature.
        let original = p2pkh_hash160(&tx.outputs[0].pk_script).expect("p2pkh output");
        let mut redirected = original;
        redirected[0] ^= 0xff;
        tx.outputs[0].pk_script = var_chain::transparent::pay_to_pubkey_hash(redirected);

        assert_eq!(
            check_emission_transaction(&tx, var_chain::block::Height(64), &state),
            Err(EmissionError::SignatureMismatch)
        );
    }

    #[test]
    fn cross_network_replay_breaks_the_signature() {
        var_test::init();

        // Sign against mainnet's net id but with testnet's window and
        // the shared test key, then submit on testnet.
        let mut mainnet_like = NetworkParams::for_network(Network::Testnet);
        mainnet_like.net_id = var_chain::parameters::MAINNET_NET_ID;
        adopt_test_key(&mut mainnet_like, AssetId(1));

        let state = testnet_state();
        let tx = signed_emission(&mainnet_like, AssetId(1), 1, 64);

        assert_eq!(
            check_emission_transaction(&tx, var_chain::block::Height(64), &state),
            Err(EmissionError::SignatureMismatch)
        );
    }

    #[test]
    fn nonce_skip_is_rejected() {
        var_test::init();

        let state = testnet_state();
        let tx = signed_emission(&state.params, AssetId(1), 2, 64);

        assert_eq!(
            check_emission_transaction(&tx, var_chain::block::Height(64), &state),
            Err(EmissionError::InvalidNonce {
                stored: 0,
                actual: 2
            })
        );
    }

    #[test]
    fn outside_window_is_rejected() {
        var_test::init();

        let state = testnet_state();

        // current height after the window closes
        let tx = signed_emission(&state.params, AssetId(1), 1, 64);
        assert!(matches!(
            check_emission_transaction(&tx, var_chain::block::Height(165), &state),
            Err(EmissionError::OutsideEmissionWindow { .. })
        ));

        // authorized height before the window opens
        let tx = signed_emission(&state.params, AssetId(1), 1, 63);
        assert!(matches!(
            check_emission_transaction(&tx, var_chain::block::Height(64), &state),
            Err(EmissionError::OutsideEmissionWindow { .. })
        ));
    }

    #[test]
    fn already_emitted_is_rejected() {
        var_test::init();

        let mut state = testnet_state();
        state.emitted.insert(AssetId(1), true);
        state.nonces.insert(AssetId(1), 1);

        let tx = signed_emission(&state.params, AssetId(1), 2, 64);
        assert_eq!(
            check_emission_transaction(&tx, var_chain::block::Height(64), &state),
            Err(EmissionError::AlreadyEmitted(AssetId(1)))
        );
    }

    #[test]
    fn amount_mismatch_is_rejected() {
        var_test::init();

        let state = testnet_state();
        let coin = &state.params.ska_coins[&AssetId(1)];
        let mut outputs = configured_outputs(coin, AssetId(1));
        outputs[0].value = Amount::try_from(1i64).expect("valid");

        let short: Result<Amount<NonNegative>, _> = outputs.iter().map(|o| o.value).sum();
        let short = i64::from(short.expect("in range"));
        let tx = sign_emission(&state.params, AssetId(1), 1, short, 64, outputs);

        assert_eq!(
            check_emission_transaction(&tx, var_chain::block::Height(64), &state),
            Err(EmissionError::AmountMismatch)
        );
    }

    #[test]
    fn unknown_and_unauthorized_assets_are_rejected() {
        var_test::init();

        let state = testnet_state();

        // no configuration for SKA-9
        let coin = test_coin_config(Network::Testnet, 64, 100, 1_000);
        let outputs = configured_outputs(&coin, AssetId(9));
        let tx = sign_emission(&state.params, AssetId(9), 1, 1_000, 64, outputs);
        assert_eq!(
            check_emission_transaction(&tx, var_chain::block::Height(64), &state),
            Err(EmissionError::UnknownAsset(AssetId(9)))
        );

        // configured key differs from the signing key
        let mut unauthorized = testnet_state();
        unauthorized
            .params
            .ska_coins
            .get_mut(&AssetId(1))
            .expect("configured")
            .emission_pubkey = NetworkParams::for_network(Network::Testnet).ska_coins
            [&AssetId(1)]
            .emission_pubkey;
        let tx = signed_emission(&state.params, AssetId(1), 1, 64);
        assert_eq!(
            check_emission_transaction(&tx, var_chain::block::Height(64), &unauthorized),
            Err(EmissionError::UnauthorizedKey)
        );
    }

    #[test]
    fn vote_gate_holds_back_secondary_assets() {
        var_test::init();

        let mut state = testnet_state();
        adopt_test_key(&mut state.params, AssetId(2));

        let tx = signed_emission(&state.params, AssetId(2), 1, 128);
        assert_eq!(
            check_emission_transaction(&tx, var_chain::block::Height(128), &state),
            Err(EmissionError::InactiveVoteGate(AssetId(2)))
        );

        state.active_votes.push(AssetId(2));
        check_emission_transaction(&tx, var_chain::block::Height(128), &state)
            .expect("the gated emission passes once the vote is active");
    }

    #[test]
    fn reserved_auth_version_is_rejected() {
        var_test::init();

        let state = testnet_state();
        let mut tx = signed_emission(&state.params, AssetId(1), 1, 64);
        let mut script = tx.inputs[0].signature_script.0.clone();
        script[4] = 0x01;
        tx.inputs[0].signature_script = Script(script);

        assert!(matches!(
            check_emission_transaction(&tx, var_chain::block::Height(64), &state),
            Err(EmissionError::MalformedEmission(_))
        ));
    }

    #[test]
    fn oversized_signature_is_rejected() {
        var_test::init();

        let auth = EmissionAuthorization {
            nonce: 1,
            asset_id: AssetId(1),
            amount: 1,
            authorized_height: 64,
            pubkey: emission_pubkey(),
            signature: vec![0u8; MAX_SIGNATURE_LENGTH + 1],
        };
        let script = encode_emission_authorization(&auth);
        assert_eq!(
            parse_emission_authorization(&script),
            Err(EmissionError::BadSignatureFormat("signature too long"))
        );
    }

    #[test]
    fn high_s_signature_is_rejected() {
        var_test::init();

        let state = testnet_state();
        let tx = signed_emission(&state.params, AssetId(1), 1, 64);
        let mut auth =
            parse_emission_authorization(&tx.inputs[0].signature_script).expect("parses");

        // Flip the signature to its high-S twin: S' = n - S. The result
        // still DER-parses and verifies mathematically, but is
        // non-canonical.
        let mut sig = Signature::from_der(&auth.signature).expect("valid DER");
        let compact = sig.serialize_compact();
        let high_s = negate_s(&compact);
        sig = Signature::from_compact(&high_s).expect("negated S is on the curve order range");
        auth.signature = sig.serialize_der().to_vec();

        let msg = emission_message(state.params.net_id, &auth, &tx).expect("hashes");
        assert_eq!(
            verify_emission_signature(&auth, &msg),
            Err(EmissionError::NonCanonicalSignature)
        );
    }

    /// Computes `(r, n - s)` from a compact signature.
    fn negate_s(compact: &[u8; 64]) -> [u8; 64] {
        // The secp256k1 group order, big endian.
        const ORDER: [u8; 32] = [
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
            0xff, 0xfe, 0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c,
            0xd0, 0x36, 0x41, 0x41,
        ];

        let mut out = *compact;
        let mut borrow = 0u16;
        for i in (0..32).rev() {
            let lhs = ORDER[i] as i32;
            let rhs = compact[32 + i] as i32 + borrow as i32;
            let (value, new_borrow) = if lhs >= rhs {
                (lhs - rhs, 0)
            } else {
                (lhs + 256 - rhs, 1)
            };
            out[32 + i] = value as u8;
            borrow = new_borrow;
        }
        assert_eq!(borrow, 0, "S is always below the group order");
        out
    }
}
