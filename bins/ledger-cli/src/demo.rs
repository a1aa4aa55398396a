//! Sample epoch batch generator.
//!
//! The batch exercises every outcome the settler can report: a plain spend,
//! a double spend where the later candidate pays more, a child that only
//! settles if the richer side of that double spend wins, an absent
//! candidate, an overspend and a forged signature.

use ledger_core::batch::EpochBatch;
use ledger_core::crypto::{sign_transaction_input, KeyPair};
use ledger_core::error::CryptoError;
use ledger_core::types::{Amount, Hash256, Transaction, TxInput, TxOutput, UtxoId};
use ledger_core::UtxoPool;

fn genesis(seed: u8, index: u8) -> UtxoId {
    let mut tx_id = [0u8; 32];
    tx_id[0] = seed;
    tx_id[1] = index;
    UtxoId::new(Hash256(tx_id), 0)
}

fn spend(
    inputs: &[UtxoId],
    outputs: &[(Amount, &KeyPair)],
    signer: &KeyPair,
) -> Result<Transaction, CryptoError> {
    let mut tx = Transaction::new(
        inputs.iter().copied().map(TxInput::unsigned).collect(),
        outputs
            .iter()
            .map(|(value, owner)| TxOutput {
                value: *value,
                owner: owner.public_key(),
            })
            .collect(),
    );
    for i in 0..tx.inputs.len() {
        sign_transaction_input(&mut tx, i, signer)?;
    }
    Ok(tx)
}

/// Build the sample batch. Keys and genesis ids derive from `seed`.
pub fn sample_batch(seed: u8) -> Result<EpochBatch, CryptoError> {
    let alice = KeyPair::from_secret_bytes([seed; 32]);
    let bob = KeyPair::from_secret_bytes([seed.wrapping_add(1); 32]);

    let (g0, g1, g2) = (genesis(seed, 0), genesis(seed, 1), genesis(seed, 2));
    let pool: UtxoPool = [
        (g0, TxOutput { value: 10, owner: alice.public_key() }),
        (g1, TxOutput { value: 7, owner: alice.public_key() }),
        (g2, TxOutput { value: 5, owner: bob.public_key() }),
    ]
    .into_iter()
    .collect();

    let split = spend(&[g0], &[(4, &bob), (5, &alice)], &alice)?;
    let rich = spend(&[g0], &[(7, &bob)], &alice)?;
    let child = spend(&[UtxoId::new(rich.id(), 0)], &[(6, &alice)], &bob)?;
    let plain = spend(&[g2], &[(5, &alice)], &bob)?;
    let overspend = spend(&[g1], &[(9, &bob)], &alice)?;
    let forged = spend(&[g1], &[(7, &bob)], &bob)?;

    Ok(EpochBatch::new(
        pool,
        vec![
            Some(split),
            Some(rich),
            None,
            Some(child),
            Some(plain),
            Some(overspend),
            Some(forged),
        ],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::error::TransactionError;
    use ledger_core::SelectionPolicy;

    #[test]
    fn sample_is_deterministic_per_seed() {
        assert_eq!(sample_batch(3).unwrap(), sample_batch(3).unwrap());
        assert_ne!(sample_batch(3).unwrap(), sample_batch(4).unwrap());
    }

    #[test]
    fn policies_diverge_on_sample() {
        let batch = sample_batch(7).unwrap();

        let (order, _) = batch.settle(SelectionPolicy::InputOrder).unwrap();
        let positions: Vec<_> = order.accepted.iter().map(|a| a.position).collect();
        assert_eq!(positions, vec![0, 4]);
        assert_eq!(order.total_fees(), 1);

        let (fee, settler) = batch.settle(SelectionPolicy::MaxFee).unwrap();
        let positions: Vec<_> = fee.accepted.iter().map(|a| a.position).collect();
        assert_eq!(positions, vec![1, 3, 4]);
        assert_eq!(fee.total_fees(), 4);
        assert_eq!(settler.pool().total_value(), Some(22 - 4));
    }

    #[test]
    fn sample_rejections() {
        let (settlement, _) = sample_batch(1).unwrap().settle(SelectionPolicy::MaxFee).unwrap();
        let reasons: Vec<_> = settlement
            .rejected
            .iter()
            .map(|r| (r.position, r.reason.clone()))
            .collect();

        assert_eq!(reasons[1], (2, TransactionError::Absent));
        assert_eq!(
            reasons[2],
            (5, TransactionError::InsufficientFunds { have: 7, need: 9 })
        );
        assert_eq!(reasons[3], (6, TransactionError::InvalidSignature { index: 0 }));
        assert_eq!(reasons.len(), 4);
    }
}
