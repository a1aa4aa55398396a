//! Trait seams of the settlement core.
//!
//! - [`SignatureVerifier`]: the signature primitive consulted by the
//!   validator ([`Ed25519Verifier`] is the production implementation)
//! - [`SelectionStrategy`]: decides which pending candidate the settler
//!   applies next ([`InputOrder`](crate::settlement::InputOrder) and
//!   [`MaxFee`](crate::settlement::MaxFee) implement it)

use crate::crypto::{self, PublicKey};
use crate::settlement::{Candidate, Step};
use crate::utxo_pool::UtxoPool;

/// Signature verification primitive: `(public key, message, signature) -> bool`.
pub trait SignatureVerifier: Send + Sync {
    /// Return `true` iff `signature` is a valid signature of `message` by `owner`.
    fn verify(&self, owner: &PublicKey, message: &[u8], signature: &[u8]) -> bool;
}

/// Ed25519 signature verification via ed25519-dalek.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, owner: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
        crypto::verify_signature(owner, message, signature)
    }
}

/// Ordering policy of the batch settler.
///
/// The settler calls [`next`](Self::next) repeatedly. Each call sees the
/// candidates still pending (in input order) and the pool as mutated by all
/// acceptances so far, and decides one pending candidate: accept it (with
/// its validation summary against that pool) or reject it. Either way the
/// settler removes it from `pending`. Returning `None` ends the batch and
/// every candidate still pending is rejected.
///
/// [`Step::Accept`] must only name a candidate that validated against the
/// pool passed to that same call.
pub trait SelectionStrategy {
    /// Decide the next pending candidate.
    fn next(
        &mut self,
        pending: &[Candidate],
        pool: &UtxoPool,
        verifier: &dyn SignatureVerifier,
    ) -> Option<Step>;
}
