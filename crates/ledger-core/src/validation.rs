//! Transaction validation against a UTXO pool.
//!
//! A transaction is valid iff, in this order:
//!
//! 1. **Existence**: every input references a UTXO present in the pool
//! 2. **Authorization**: every input's signature verifies against the
//!    referenced output's owner over that input's signing payload
//! 3. **No internal double-claim**: no two inputs reference the same UTXO
//!    identity
//! 4. **Non-negative outputs**: every output value is `>= 0`
//! 5. **Value conservation**: total input value `>=` total output value
//!
//! The checks are independent, so the order only decides which error
//! [`validate_transaction`] reports. Validation is stateless: the answer
//! depends on the pool at call time and can change once the pool has been
//! mutated by another acceptance.

use std::collections::HashSet;

use crate::crypto;
use crate::error::TransactionError;
use crate::traits::SignatureVerifier;
use crate::types::{Amount, Transaction};
use crate::utxo_pool::UtxoPool;

/// Summary of a successfully validated transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedTransaction {
    /// Total value of all claimed outputs.
    pub total_input: Amount,
    /// Total value of all created outputs.
    pub total_output: Amount,
    /// `total_input - total_output`, never negative.
    pub fee: Amount,
}

/// Validate a transaction against the pool, reporting the first failing check.
pub fn validate_transaction(
    tx: &Transaction,
    pool: &UtxoPool,
    verifier: &dyn SignatureVerifier,
) -> Result<ValidatedTransaction, TransactionError> {
    validate_with_authorization(tx, pool, || check_authorization(tx, pool, verifier))
}

/// Check 2 on its own: every input is signed by the owner of the output it
/// claims. Inputs missing from the pool are reported as unknown.
///
/// Once every claimed output exists, the answer cannot change while those
/// outputs stay unspent: a UTXO's owner is fixed by the transaction that
/// created it.
pub fn check_authorization(
    tx: &Transaction,
    pool: &UtxoPool,
    verifier: &dyn SignatureVerifier,
) -> Result<(), TransactionError> {
    for (i, input) in tx.inputs.iter().enumerate() {
        let id = input.utxo_id();
        let output = pool
            .get(&id)
            .map_err(|_| TransactionError::UnknownUtxo(id.to_string()))?;
        let payload = crypto::signing_payload(tx, i)
            .map_err(|_| TransactionError::InvalidSignature { index: i })?;
        if !verifier.verify(&output.owner, &payload, &input.signature) {
            return Err(TransactionError::InvalidSignature { index: i });
        }
    }
    Ok(())
}

/// [`validate_transaction`] with check 2 supplied by the caller, e.g. from
/// a cached [`check_authorization`] result. `authorize` runs only after
/// check 1 has passed.
pub fn validate_with_authorization(
    tx: &Transaction,
    pool: &UtxoPool,
    authorize: impl FnOnce() -> Result<(), TransactionError>,
) -> Result<ValidatedTransaction, TransactionError> {
    // 1. Existence
    for input in &tx.inputs {
        let id = input.utxo_id();
        if !pool.contains(&id) {
            return Err(TransactionError::UnknownUtxo(id.to_string()));
        }
    }

    // 2. Authorization
    authorize()?;

    // 3. No internal double-claim
    let mut seen = HashSet::with_capacity(tx.inputs.len());
    for id in tx.claimed_utxos() {
        if !seen.insert(id) {
            return Err(TransactionError::DuplicateInput(id.to_string()));
        }
    }

    // 4. Non-negative outputs
    if let Some(i) = tx.outputs.iter().position(|out| out.value < 0) {
        return Err(TransactionError::NegativeOutput(i));
    }

    // 5. Value conservation
    let mut total_input: Amount = 0;
    for id in tx.claimed_utxos() {
        let value = pool
            .get(&id)
            .map_err(|_| TransactionError::UnknownUtxo(id.to_string()))?
            .value;
        total_input = total_input
            .checked_add(value)
            .ok_or(TransactionError::ValueOverflow)?;
    }

    let total_output = tx
        .total_output_value()
        .ok_or(TransactionError::ValueOverflow)?;

    if total_input < total_output {
        return Err(TransactionError::InsufficientFunds {
            have: total_input,
            need: total_output,
        });
    }

    Ok(ValidatedTransaction {
        total_input,
        total_output,
        fee: total_input - total_output,
    })
}

/// Like [`validate_transaction`], but an absent transaction is rejected
/// with [`TransactionError::Absent`].
pub fn validate_candidate(
    tx: Option<&Transaction>,
    pool: &UtxoPool,
    verifier: &dyn SignatureVerifier,
) -> Result<ValidatedTransaction, TransactionError> {
    let tx = tx.ok_or(TransactionError::Absent)?;
    validate_transaction(tx, pool, verifier)
}

/// The validity predicate. `None` is never valid.
pub fn is_valid(
    tx: Option<&Transaction>,
    pool: &UtxoPool,
    verifier: &dyn SignatureVerifier,
) -> bool {
    validate_candidate(tx, pool, verifier).is_ok()
}
