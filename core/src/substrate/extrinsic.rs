//! Signed `balances.transfer` extrinsic (format v4, immortal era, zero tip).

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use parity_scale_codec::{Compact, Encode};

use super::keyring::{MultiSignature, Pair};

/// Version byte of a signed v4 extrinsic: `0b1000_0000 | 4`.
const SIGNED_V4: u8 = 0x84;
/// Payloads longer than this are hashed before signing.
const MAX_PLAIN_PAYLOAD: usize = 256;
const IMMORTAL_ERA: u8 = 0x00;

type Blake2b256 = Blake2b<U32>;

/// Chain facts mixed into the signature so it cannot be replayed elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainState {
    pub genesis_hash: [u8; 32],
    pub spec_version: u32,
    pub transaction_version: u32,
}

/// Where the balances transfer call lives in the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallLayout {
    pub pallet_index: u8,
    pub call_index: u8,
    /// Runtime includes the `CheckMetadataHash` signed extension.
    pub metadata_hash_extension: bool,
}

#[derive(Encode)]
enum MultiAddress {
    #[codec(index = 0)]
    Id([u8; 32]),
}

impl Encode for MultiSignature {
    fn size_hint(&self) -> usize {
        65
    }

    fn encode_to<T: parity_scale_codec::Output + ?Sized>(&self, dest: &mut T) {
        match self {
            MultiSignature::Ed25519(sig) => {
                dest.push_byte(0);
                dest.write(sig);
            }
            MultiSignature::Sr25519(sig) => {
                dest.push_byte(1);
                dest.write(sig);
            }
        }
    }
}

pub fn encode_transfer_call(layout: &CallLayout, dest: [u8; 32], amount: u128) -> Vec<u8> {
    let mut call = vec![layout.pallet_index, layout.call_index];
    MultiAddress::Id(dest).encode_to(&mut call);
    Compact(amount).encode_to(&mut call);
    call
}

fn encode_extra(layout: &CallLayout, nonce: u64) -> Vec<u8> {
    let mut extra = vec![IMMORTAL_ERA];
    Compact(nonce).encode_to(&mut extra);
    Compact(0u128).encode_to(&mut extra);
    if layout.metadata_hash_extension {
        // mode: disabled
        extra.push(0);
    }
    extra
}

fn encode_additional(layout: &CallLayout, state: &ChainState) -> Vec<u8> {
    let mut additional = Vec::with_capacity(8 + 64 + 1);
    state.spec_version.encode_to(&mut additional);
    state.transaction_version.encode_to(&mut additional);
    additional.extend_from_slice(&state.genesis_hash);
    // immortal era: checkpoint block is genesis
    additional.extend_from_slice(&state.genesis_hash);
    if layout.metadata_hash_extension {
        None::<[u8; 32]>.encode_to(&mut additional);
    }
    additional
}

/// Bytes the signer commits to: `call ‖ extra ‖ additional`, hashed with
/// blake2b-256 when longer than 256 bytes.
pub fn signing_payload(call: &[u8], extra: &[u8], additional: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(call.len() + extra.len() + additional.len());
    payload.extend_from_slice(call);
    payload.extend_from_slice(extra);
    payload.extend_from_slice(additional);
    if payload.len() > MAX_PLAIN_PAYLOAD {
        Blake2b256::digest(&payload).to_vec()
    } else {
        payload
    }
}

/// Build the length-prefixed signed extrinsic ready for
/// `author_submitExtrinsic`.
pub fn signed_transfer(
    pair: &Pair,
    layout: &CallLayout,
    state: &ChainState,
    nonce: u64,
    dest: [u8; 32],
    amount: u128,
) -> Vec<u8> {
    let call = encode_transfer_call(layout, dest, amount);
    let extra = encode_extra(layout, nonce);
    let additional = encode_additional(layout, state);
    let signature = pair.sign(&signing_payload(&call, &extra, &additional));

    let mut body = vec![SIGNED_V4];
    MultiAddress::Id(pair.public()).encode_to(&mut body);
    signature.encode_to(&mut body);
    body.extend_from_slice(&extra);
    body.extend_from_slice(&call);

    body.encode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::substrate::keyring::KeyScheme;
    use ed25519_dalek::Verifier;
    use parity_scale_codec::Decode;

    const PHRASE: &str =
        "bottom drive obey lake curtain smoke basket hold race lonely fit walk";

    fn layout() -> CallLayout {
        CallLayout {
            pallet_index: 5,
            call_index: 0,
            metadata_hash_extension: false,
        }
    }

    fn state() -> ChainState {
        ChainState {
            genesis_hash: [9u8; 32],
            spec_version: 10_030,
            transaction_version: 1,
        }
    }

    #[test]
    fn transfer_call_layout() {
        let amount = 100u128 * 10u128.pow(18);
        let call = encode_transfer_call(&layout(), [1u8; 32], amount);
        assert_eq!(&call[..3], &[5, 0, 0]);
        assert_eq!(&call[3..35], &[1u8; 32]);
        // 10^20 needs nine bytes: big-integer compact mode, (9 - 4) << 2 | 0b11
        assert_eq!(call[35], 0x17);
        assert_eq!(call.len(), 35 + 1 + 9);
        let decoded = <Compact<u128>>::decode(&mut &call[35..]).unwrap();
        assert_eq!(decoded.0, amount);
    }

    #[test]
    fn small_transfer_call_bytes() {
        let mut expected = vec![5, 0, 0];
        expected.extend_from_slice(&[1u8; 32]);
        expected.push(0x04);
        assert_eq!(encode_transfer_call(&layout(), [1u8; 32], 1), expected);
        assert_eq!(encode_extra(&layout(), 3), vec![0x00, 0x0c, 0x00]);
    }

    #[test]
    fn extra_encodes_nonce_and_tip() {
        assert_eq!(encode_extra(&layout(), 3), vec![0x00, 3 << 2, 0x00]);
        let with_hash = CallLayout {
            metadata_hash_extension: true,
            ..layout()
        };
        assert_eq!(encode_extra(&with_hash, 3), vec![0x00, 3 << 2, 0x00, 0x00]);
    }

    #[test]
    fn additional_carries_versions_and_genesis() {
        let additional = encode_additional(&layout(), &state());
        assert_eq!(additional.len(), 4 + 4 + 32 + 32);
        assert_eq!(&additional[..4], &10_030u32.to_le_bytes());
        assert_eq!(&additional[8..40], &[9u8; 32]);
    }

    #[test]
    fn long_payload_is_hashed() {
        let long = vec![0u8; 300];
        assert_eq!(signing_payload(&long, &[], &[]).len(), 32);
        assert_eq!(signing_payload(&[1, 2], &[3], &[4]), vec![1, 2, 3, 4]);
    }

    #[test]
    fn signed_extrinsic_is_well_formed() {
        let pair = Pair::from_mnemonic(PHRASE, KeyScheme::Ed25519).unwrap();
        let nonce = 7;
        let amount = 5u128 * 10u128.pow(18);
        let xt = signed_transfer(&pair, &layout(), &state(), nonce, [2u8; 32], amount);

        let mut input = &xt[..];
        let len = <Compact<u32>>::decode(&mut input).unwrap().0 as usize;
        assert_eq!(len, input.len());
        assert_eq!(input[0], SIGNED_V4);
        assert_eq!(input[1], 0x00);
        assert_eq!(&input[2..34], &pair.public());
        assert_eq!(input[34], 0x00);

        let sig: [u8; 64] = input[35..99].try_into().unwrap();
        let call = encode_transfer_call(&layout(), [2u8; 32], amount);
        let extra = encode_extra(&layout(), nonce);
        let payload = signing_payload(&call, &extra, &encode_additional(&layout(), &state()));
        let vk = ed25519_dalek::VerifyingKey::from_bytes(&pair.public()).unwrap();
        assert!(vk
            .verify(&payload, &ed25519_dalek::Signature::from_bytes(&sig))
            .is_ok());

        assert_eq!(&input[99..99 + extra.len()], &extra[..]);
        assert_eq!(&input[99 + extra.len()..], &call[..]);
    }

    #[test]
    fn sr25519_signature_tag() {
        let pair = Pair::from_mnemonic(PHRASE, KeyScheme::Sr25519).unwrap();
        let xt = signed_transfer(&pair, &layout(), &state(), 0, [2u8; 32], 1);
        let mut input = &xt[..];
        let _ = <Compact<u32>>::decode(&mut input).unwrap();
        assert_eq!(input[34], 0x01);
    }
}
