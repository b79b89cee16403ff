//! Cryptographic primitives for powledger
//!
//! Addresses are hex-encoded compressed secp256k1 public keys, so anyone holding an
//! address can verify signatures made by its owner without a separate key lookup.

use crate::error::ChainError;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE, SECRET_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// SHA-256 of `data`, as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Restores a KeyPair from a hex-encoded 32-byte secret key.
    pub fn from_secret_hex(secret_hex: &str) -> Result<Self, ChainError> {
        let bytes = hex::decode(secret_hex)
            .map_err(|e| ChainError::Crypto(format!("Invalid secret key hex: {}", e)))?;

        let secret_key = SecretKey::from_slice(&bytes).map_err(|e| {
            if bytes.len() != SECRET_KEY_SIZE {
                ChainError::Crypto(format!(
                    "Secret key must be {} bytes, got {}",
                    SECRET_KEY_SIZE,
                    bytes.len()
                ))
            } else {
                ChainError::Crypto(format!("Invalid secret key bytes: {}", e))
            }
        })?;

        Ok(Self::from_secret_key(secret_key))
    }

    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// The address of this key pair: its compressed public key as hex.
    pub fn public_key_hex(&self) -> String {
        let pubkey_bytes: [u8; PUBLIC_KEY_SIZE] = self.public_key.serialize();
        hex::encode(pubkey_bytes)
    }

    /// Signs SHA-256(`message`) and returns the compact signature as hex.
    pub fn sign(&self, message: &[u8]) -> String {
        let digest: [u8; 32] = Sha256::digest(message).into();
        let message = Message::from_digest(digest);
        let signature = SECP256K1_CONTEXT.sign_ecdsa(&message, &self.secret_key);

        let compact: [u8; COMPACT_SIGNATURE_SIZE] = signature.serialize_compact();
        hex::encode(compact)
    }
}

/// Checks `signature_hex` over `message` against the public key encoded in `public_key_hex`.
///
/// Fails closed: malformed hex, wrong lengths, keys off the curve and plain signature
/// mismatches all yield `false` so a chain walk can always finish.
pub fn verify_signature(public_key_hex: &str, signature_hex: &str, message: &[u8]) -> bool {
    let public_key = match hex::decode(public_key_hex)
        .ok()
        .and_then(|bytes| PublicKey::from_slice(&bytes).ok())
    {
        Some(key) => key,
        None => return false,
    };

    let signature = match hex::decode(signature_hex)
        .ok()
        .filter(|bytes| bytes.len() == COMPACT_SIGNATURE_SIZE)
        .and_then(|bytes| Signature::from_compact(&bytes).ok())
    {
        Some(sig) => sig,
        None => return false,
    };

    let digest: [u8; 32] = Sha256::digest(message).into();
    let message = Message::from_digest(digest);

    SECP256K1_CONTEXT
        .verify_ecdsa(&message, &signature, &public_key)
        .is_ok()
}
