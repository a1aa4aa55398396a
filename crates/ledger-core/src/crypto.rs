//! Output ownership: who may spend an output, and how inputs prove it.
//!
//! An output names its owner by [`PublicKey`]. An input spending it carries
//! an Ed25519 signature by that owner over the input's signing payload:
//! every input reference, every output, and the index of the input itself.
//! Signatures are left out of the payload, so inputs can be signed in any
//! order and signing never changes the transaction id.

use std::fmt;

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CryptoError;
use crate::types::Transaction;

/// Signing key of an output owner.
#[derive(Clone)]
pub struct KeyPair(SigningKey);

impl KeyPair {
    /// Fresh owner key from the OS RNG.
    pub fn generate() -> Self {
        Self(SigningKey::generate(&mut rand::rngs::OsRng))
    }

    /// Deterministic owner key, for fixtures and demos.
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        Self(SigningKey::from_bytes(&bytes))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.0.sign(message).to_bytes()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair({})", self.public_key())
    }
}

/// Owner of an output. Serialized as 64 hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Compute the canonical signing payload for one input of a transaction.
///
/// The same bytes are produced when signing and when verifying.
pub fn signing_payload(tx: &Transaction, input_index: usize) -> Result<Vec<u8>, CryptoError> {
    if input_index >= tx.inputs.len() {
        return Err(CryptoError::InputIndexOutOfBounds {
            index: input_index,
            len: tx.inputs.len(),
        });
    }

    let mut data = tx.content_bytes();
    data.extend_from_slice(&(input_index as u64).to_le_bytes());
    Ok(data)
}

/// Sign a transaction input in place.
///
/// Computes the signing payload for the given input, signs it with the
/// keypair and stores the signature in the input.
pub fn sign_transaction_input(
    tx: &mut Transaction,
    input_index: usize,
    keypair: &KeyPair,
) -> Result<(), CryptoError> {
    let payload = signing_payload(tx, input_index)?;
    let signature = keypair.sign(&payload);
    tx.inputs[input_index].signature = signature.to_vec();
    Ok(())
}

/// Whether `signature` is `owner`'s signature over `message`. Signatures
/// that are not exactly 64 bytes never verify.
pub fn verify_signature(owner: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
    let Ok(bytes) = <[u8; 64]>::try_from(signature) else {
        return false;
    };
    owner
        .0
        .verify(message, &ed25519_dalek::Signature::from_bytes(&bytes))
        .is_ok()
}
