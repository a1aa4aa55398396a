//! Shared builders for scenario and property tests.

use ledger_core::crypto::{sign_transaction_input, KeyPair, PublicKey};
use ledger_core::types::{Amount, Hash256, Transaction, TxInput, TxOutput, UtxoId};
use ledger_core::UtxoPool;

/// Deterministic keypair from a seed byte.
pub fn kp(seed: u8) -> KeyPair {
    KeyPair::from_secret_bytes([seed; 32])
}

/// Public key of [`kp`]`(seed)`.
pub fn owner(seed: u8) -> PublicKey {
    kp(seed).public_key()
}

/// A genesis outpoint that no transaction in a batch can create.
pub fn genesis_utxo(seed: u8, index: u64) -> UtxoId {
    UtxoId::new(Hash256([seed; 32]), index)
}

/// Output of `value` owned by `kp(seed)`.
pub fn output(value: Amount, seed: u8) -> TxOutput {
    TxOutput {
        value,
        owner: owner(seed),
    }
}

/// Pool from `(utxo, value, owner seed)` triples.
pub fn make_pool(entries: &[(UtxoId, Amount, u8)]) -> UtxoPool {
    entries
        .iter()
        .map(|&(id, value, seed)| (id, output(value, seed)))
        .collect()
}

/// Transaction spending `inputs`, every input signed by `signer`.
pub fn signed_tx(inputs: &[UtxoId], outputs: Vec<TxOutput>, signer: &KeyPair) -> Transaction {
    let mut tx = Transaction::new(
        inputs.iter().copied().map(TxInput::unsigned).collect(),
        outputs,
    );
    for i in 0..tx.inputs.len() {
        sign_transaction_input(&mut tx, i, signer).expect("input index in range");
    }
    tx
}

/// The `index`-th output of `tx` as an outpoint.
pub fn out_of(tx: &Transaction, index: u64) -> UtxoId {
    UtxoId::new(tx.id(), index)
}
