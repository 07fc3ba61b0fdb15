//! SS58 addresses for the target chain.
//!
//! Layout: `base58(prefix ‖ account_id ‖ checksum)` where `prefix` is one
//! byte for formats below 64 and two bytes up to 16383, and `checksum` is the
//! first two bytes of `blake2b-512("SS58PRE" ‖ prefix ‖ account_id)`.

use blake2::{Blake2b512, Digest};
use thiserror::Error;

const SS58_PREFIX: &[u8] = b"SS58PRE";
const CHECKSUM_LEN: usize = 2;
const ACCOUNT_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid base58: {0}")]
    Base58(String),

    #[error("unexpected decoded length {0}")]
    BadLength(usize),

    #[error("reserved address format {0}")]
    ReservedFormat(u16),

    #[error("checksum mismatch")]
    BadChecksum,

    #[error("invalid hex account id: {0}")]
    Hex(String),
}

/// A decoded SS58 address carrying a 32-byte account id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ss58Address {
    pub format: u16,
    pub account: [u8; ACCOUNT_LEN],
}

fn ss58_hash(data: &[u8]) -> [u8; 64] {
    let mut hasher = Blake2b512::new();
    hasher.update(SS58_PREFIX);
    hasher.update(data);
    hasher.finalize().into()
}

fn encode_format(format: u16) -> Vec<u8> {
    if format < 64 {
        vec![format as u8]
    } else {
        let ident = format & 0b0011_1111_1111_1111;
        let first = ((ident & 0b0000_0000_1111_1100) >> 2) as u8 | 0b0100_0000;
        let second = (ident >> 8) as u8 | (((ident & 0b0000_0000_0000_0011) as u8) << 6);
        vec![first, second]
    }
}

pub fn decode_ss58(address: &str) -> Result<Ss58Address, AddressError> {
    let data = bs58::decode(address.trim())
        .into_vec()
        .map_err(|e| AddressError::Base58(e.to_string()))?;
    if data.len() < 2 {
        return Err(AddressError::BadLength(data.len()));
    }

    let (prefix_len, format) = match data[0] {
        0..=63 => (1, data[0] as u16),
        64..=127 => {
            let lower = (data[0] << 2) | (data[1] >> 6);
            let upper = data[1] & 0b0011_1111;
            (2, (lower as u16) | ((upper as u16) << 8))
        }
        _ => return Err(AddressError::ReservedFormat(data[0] as u16)),
    };

    if data.len() != prefix_len + ACCOUNT_LEN + CHECKSUM_LEN {
        return Err(AddressError::BadLength(data.len()));
    }
    if format == 46 || format == 47 {
        return Err(AddressError::ReservedFormat(format));
    }

    let body_len = data.len() - CHECKSUM_LEN;
    let hash = ss58_hash(&data[..body_len]);
    if data[body_len..] != hash[..CHECKSUM_LEN] {
        return Err(AddressError::BadChecksum);
    }

    let mut account = [0u8; ACCOUNT_LEN];
    account.copy_from_slice(&data[prefix_len..body_len]);
    Ok(Ss58Address { format, account })
}

pub fn encode_ss58(account: &[u8; ACCOUNT_LEN], format: u16) -> String {
    let mut data = encode_format(format);
    data.extend_from_slice(account);
    let hash = ss58_hash(&data);
    data.extend_from_slice(&hash[..CHECKSUM_LEN]);
    bs58::encode(data).into_string()
}

/// Accept an SS58 address of any format or a `0x`-prefixed 32-byte hex
/// account id, and return the raw account id.
pub fn parse_account(address: &str) -> Result<[u8; ACCOUNT_LEN], AddressError> {
    let address = address.trim();
    if let Some(hex_str) = address.strip_prefix("0x") {
        let bytes = hex::decode(hex_str).map_err(|e| AddressError::Hex(e.to_string()))?;
        return bytes
            .try_into()
            .map_err(|b: Vec<u8>| AddressError::BadLength(b.len()));
    }
    decode_ss58(address).map(|decoded| decoded.account)
}

/// Pure format gate applied to the buyer's destination address.
pub fn is_valid_target_address(address: &str) -> bool {
    parse_account(address).is_ok()
}
