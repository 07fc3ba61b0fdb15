//! Transfer account derivation from a BIP39 mnemonic.
//!
//! Follows the target ecosystem's keyring: the mnemonic's *entropy* (not the
//! BIP39 seed) goes through PBKDF2-HMAC-SHA512 with salt `"mnemonic"` and 2048
//! rounds; the first 32 bytes are the mini secret key.

use std::fmt;

use bip39::Mnemonic;
use ed25519_dalek::Signer as _;
use schnorrkel::{signing_context, ExpansionMode, MiniSecretKey};
use serde::Deserialize;
use sha2::Sha512;
use thiserror::Error;

use crate::address::encode_ss58;

const PBKDF2_ROUNDS: u32 = 2048;
const SIGNING_CONTEXT: &[u8] = b"substrate";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyScheme {
    Sr25519,
    Ed25519,
}

#[derive(Debug, Error)]
pub enum KeyringError {
    #[error("invalid mnemonic phrase: {0}")]
    InvalidMnemonic(String),

    #[error("key derivation failed: {0}")]
    DerivationFailed(String),
}

/// Signature tagged with its scheme, as the runtime's `MultiSignature`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiSignature {
    Ed25519([u8; 64]),
    Sr25519([u8; 64]),
}

pub enum Pair {
    Sr25519(schnorrkel::Keypair),
    Ed25519(ed25519_dalek::SigningKey),
}

impl fmt::Debug for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pair")
            .field("scheme", &self.scheme())
            .field("public", &hex::encode(self.public()))
            .finish()
    }
}

impl Pair {
    pub fn from_mnemonic(phrase: &str, scheme: KeyScheme) -> Result<Self, KeyringError> {
        let seed = mini_secret_from_mnemonic(phrase)?;
        match scheme {
            KeyScheme::Sr25519 => {
                let mini = MiniSecretKey::from_bytes(&seed)
                    .map_err(|e| KeyringError::DerivationFailed(e.to_string()))?;
                Ok(Pair::Sr25519(mini.expand_to_keypair(ExpansionMode::Ed25519)))
            }
            KeyScheme::Ed25519 => Ok(Pair::Ed25519(ed25519_dalek::SigningKey::from_bytes(&seed))),
        }
    }

    pub fn scheme(&self) -> KeyScheme {
        match self {
            Pair::Sr25519(_) => KeyScheme::Sr25519,
            Pair::Ed25519(_) => KeyScheme::Ed25519,
        }
    }

    pub fn public(&self) -> [u8; 32] {
        match self {
            Pair::Sr25519(kp) => kp.public.to_bytes(),
            Pair::Ed25519(sk) => sk.verifying_key().to_bytes(),
        }
    }

    pub fn address(&self, ss58_format: u16) -> String {
        encode_ss58(&self.public(), ss58_format)
    }

    pub fn sign(&self, message: &[u8]) -> MultiSignature {
        match self {
            Pair::Sr25519(kp) => {
                let ctx = signing_context(SIGNING_CONTEXT);
                MultiSignature::Sr25519(kp.sign(ctx.bytes(message)).to_bytes())
            }
            Pair::Ed25519(sk) => MultiSignature::Ed25519(sk.sign(message).to_bytes()),
        }
    }
}

fn mini_secret_from_mnemonic(phrase: &str) -> Result<[u8; 32], KeyringError> {
    let mnemonic = Mnemonic::parse_normalized(phrase.trim())
        .map_err(|e| KeyringError::InvalidMnemonic(e.to_string()))?;
    let entropy = mnemonic.to_entropy();

    let mut seed = [0u8; 64];
    pbkdf2::pbkdf2_hmac::<Sha512>(&entropy, b"mnemonic", PBKDF2_ROUNDS, &mut seed);

    let mut mini = [0u8; 32];
    mini.copy_from_slice(&seed[..32]);
    Ok(mini)
}
