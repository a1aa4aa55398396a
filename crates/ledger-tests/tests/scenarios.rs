//! End-to-end settlement scenarios.
//!
//! Each test builds a small pool and batch by hand, settles it through the
//! public API, and checks the accepted set, the rejection reasons, and the
//! post-batch pool.

use ledger_core::batch::EpochBatch;
use ledger_core::error::TransactionError;
use ledger_core::types::Transaction;
use ledger_core::{settle_batch, SelectionPolicy, Settler, UtxoPool};
use ledger_tests::helpers::*;

const POLICIES: [SelectionPolicy; 2] = [SelectionPolicy::InputOrder, SelectionPolicy::MaxFee];

/// Every accepted transaction's outputs are in the pool, and none of the
/// outputs it claimed are.
fn assert_pool_reflects(pool: &UtxoPool, accepted: &[Transaction]) {
    for tx in accepted {
        for id in tx.claimed_utxos() {
            assert!(!pool.contains(&id), "claimed {id} still in pool");
        }
        let txid = tx.id();
        for (id, output) in tx.created_utxos(txid) {
            assert_eq!(pool.get(&id).unwrap(), output, "created {id} missing");
        }
    }
}

// ---------------------------------------------------------------------------
// Simple spend
// ---------------------------------------------------------------------------

#[test]
fn single_spend_splits_value_and_pays_fee() {
    let u0 = genesis_utxo(0xA0, 0);
    let pool = make_pool(&[(u0, 10, 1)]);
    let t1 = signed_tx(&[u0], vec![output(4, 2), output(5, 1)], &kp(1));

    for policy in POLICIES {
        let (settlement, after) = settle_batch(&pool, vec![t1.clone()], policy).unwrap();

        assert_eq!(settlement.accepted_ids(), vec![t1.id()]);
        assert_eq!(settlement.total_fees(), 1);
        assert!(settlement.rejected.is_empty());

        assert!(!after.contains(&u0));
        assert_eq!(after.len(), 2);
        assert_eq!(after.get(&out_of(&t1, 0)).unwrap().value, 4);
        assert_eq!(after.get(&out_of(&t1, 1)).unwrap().value, 5);
        assert_eq!(after.total_value(), Some(9));
    }
}

#[test]
fn caller_pool_is_untouched() {
    let u0 = genesis_utxo(0xA0, 0);
    let pool = make_pool(&[(u0, 10, 1)]);
    let before = pool.clone();
    let t1 = signed_tx(&[u0], vec![output(10, 2)], &kp(1));

    let (_, after) = settle_batch(&pool, vec![t1], SelectionPolicy::MaxFee).unwrap();

    assert_eq!(pool, before);
    assert_ne!(after, before);
}

// ---------------------------------------------------------------------------
// Double spends
// ---------------------------------------------------------------------------

#[test]
fn double_spend_input_order_keeps_first() {
    let u0 = genesis_utxo(0xA0, 0);
    let pool = make_pool(&[(u0, 10, 1)]);
    let t2 = signed_tx(&[u0], vec![output(9, 2)], &kp(1));
    let t3 = signed_tx(&[u0], vec![output(7, 3)], &kp(1));

    let (settlement, after) =
        settle_batch(&pool, vec![t2.clone(), t3.clone()], SelectionPolicy::InputOrder).unwrap();

    assert_eq!(settlement.accepted_ids(), vec![t2.id()]);
    assert_eq!(settlement.rejected.len(), 1);
    assert_eq!(settlement.rejected[0].position, 1);
    assert_eq!(
        settlement.rejected[0].reason,
        TransactionError::UnknownUtxo(u0.to_string())
    );
    assert_pool_reflects(&after, &settlement.accepted_transactions());
}

#[test]
fn double_spend_max_fee_keeps_richer() {
    let u0 = genesis_utxo(0xA0, 0);
    let pool = make_pool(&[(u0, 10, 1)]);
    let t2 = signed_tx(&[u0], vec![output(9, 2)], &kp(1));
    let t3 = signed_tx(&[u0], vec![output(7, 3)], &kp(1));

    let (settlement, after) =
        settle_batch(&pool, vec![t2, t3.clone()], SelectionPolicy::MaxFee).unwrap();

    assert_eq!(settlement.accepted_ids(), vec![t3.id()]);
    assert_eq!(settlement.total_fees(), 3);
    assert_eq!(settlement.rejected[0].position, 0);
    assert_pool_reflects(&after, &settlement.accepted_transactions());
}

// ---------------------------------------------------------------------------
// Independent transactions
// ---------------------------------------------------------------------------

#[test]
fn independent_batch_accepts_all_under_both_policies() {
    let (u0, u1, u2) = (genesis_utxo(0xA0, 0), genesis_utxo(0xA1, 0), genesis_utxo(0xA2, 0));
    let pool = make_pool(&[(u0, 10, 1), (u1, 10, 1), (u2, 10, 1)]);
    let a = signed_tx(&[u0], vec![output(5, 2)], &kp(1));
    let b = signed_tx(&[u1], vec![output(8, 2)], &kp(1));
    let c = signed_tx(&[u2], vec![output(2, 2)], &kp(1));
    let batch = vec![a.clone(), b.clone(), c.clone()];

    let (order, order_pool) = settle_batch(&pool, batch.clone(), SelectionPolicy::InputOrder).unwrap();
    let (fee, fee_pool) = settle_batch(&pool, batch, SelectionPolicy::MaxFee).unwrap();

    assert_eq!(order.accepted_ids(), vec![a.id(), b.id(), c.id()]);
    // Fees 5, 2, 8: highest first.
    assert_eq!(fee.accepted_ids(), vec![c.id(), a.id(), b.id()]);
    assert_eq!(order.total_fees(), 15);
    assert_eq!(fee.total_fees(), 15);
    assert_eq!(order_pool, fee_pool);
}

// ---------------------------------------------------------------------------
// Invalid candidates
// ---------------------------------------------------------------------------

#[test]
fn overspend_is_rejected_and_pool_unchanged() {
    let u0 = genesis_utxo(0xA0, 0);
    let pool = make_pool(&[(u0, 10, 1)]);
    let greedy = signed_tx(&[u0], vec![output(11, 2)], &kp(1));

    for policy in POLICIES {
        let (settlement, after) = settle_batch(&pool, vec![greedy.clone()], policy).unwrap();
        assert!(settlement.accepted.is_empty());
        assert_eq!(
            settlement.rejected[0].reason,
            TransactionError::InsufficientFunds { have: 10, need: 11 }
        );
        assert_eq!(after, pool);
    }
}

#[test]
fn foreign_signature_is_rejected() {
    let u0 = genesis_utxo(0xA0, 0);
    let pool = make_pool(&[(u0, 10, 1)]);
    let thief = signed_tx(&[u0], vec![output(10, 9)], &kp(9));

    let mut settler = Settler::new(&pool);
    assert!(!settler.is_valid(&thief));
    let settlement = settler.settle(vec![thief]).unwrap();
    assert_eq!(
        settlement.rejected[0].reason,
        TransactionError::InvalidSignature { index: 0 }
    );
    assert_eq!(settler.pool(), &pool);
}

#[test]
fn absent_candidates_are_reported_in_place() {
    let u0 = genesis_utxo(0xA0, 0);
    let pool = make_pool(&[(u0, 10, 1)]);
    let t = signed_tx(&[u0], vec![output(10, 2)], &kp(1));

    for policy in POLICIES {
        let (settlement, _) =
            settle_batch(&pool, vec![None, Some(t.clone()), None], policy).unwrap();
        assert_eq!(settlement.accepted[0].position, 1);
        let absent: Vec<_> = settlement.rejected.iter().map(|r| (r.position, r.txid)).collect();
        assert_eq!(absent, vec![(0, None), (2, None)]);
        assert!(settlement
            .rejected
            .iter()
            .all(|r| r.reason == TransactionError::Absent));
    }
}

// ---------------------------------------------------------------------------
// Chains within a batch
// ---------------------------------------------------------------------------

#[test]
fn child_spends_parent_output_in_same_batch() {
    let u0 = genesis_utxo(0xA0, 0);
    let pool = make_pool(&[(u0, 10, 1)]);
    let parent = signed_tx(&[u0], vec![output(9, 2)], &kp(1));
    let child = signed_tx(&[out_of(&parent, 0)], vec![output(6, 3)], &kp(2));

    // Parent first: both policies accept both.
    for policy in POLICIES {
        let (settlement, after) =
            settle_batch(&pool, vec![parent.clone(), child.clone()], policy).unwrap();
        assert_eq!(settlement.accepted_ids(), vec![parent.id(), child.id()]);
        assert_eq!(after.len(), 1);
        assert_eq!(after.get(&out_of(&child, 0)).unwrap().value, 6);
    }

    // Child first: input order has already passed it by, max fee comes back for it.
    let (order, _) = settle_batch(
        &pool,
        vec![child.clone(), parent.clone()],
        SelectionPolicy::InputOrder,
    )
    .unwrap();
    assert_eq!(order.accepted_ids(), vec![parent.id()]);
    assert_eq!(order.rejected[0].position, 0);

    let (fee, _) = settle_batch(&pool, vec![child.clone(), parent.clone()], SelectionPolicy::MaxFee)
        .unwrap();
    assert_eq!(fee.accepted_ids(), vec![parent.id(), child.id()]);
}

#[test]
fn consecutive_epochs_chain_through_pool() {
    let u0 = genesis_utxo(0xA0, 0);
    let pool = make_pool(&[(u0, 10, 1)]);
    let first = signed_tx(&[u0], vec![output(10, 2)], &kp(1));
    let second = signed_tx(&[out_of(&first, 0)], vec![output(10, 3)], &kp(2));

    let mut settler = Settler::new(&pool);
    settler.settle(vec![first]).unwrap();
    let next_pool = settler.into_pool();

    let (settlement, after) =
        settle_batch(&next_pool, vec![second.clone()], SelectionPolicy::InputOrder).unwrap();
    assert_eq!(settlement.accepted_ids(), vec![second.id()]);
    assert!(after.contains(&out_of(&second, 0)));
}

// ---------------------------------------------------------------------------
// Batch files
// ---------------------------------------------------------------------------

#[test]
fn epoch_batch_settles_from_json() {
    let u0 = genesis_utxo(0xA0, 0);
    let u1 = genesis_utxo(0xA1, 0);
    let pool = make_pool(&[(u0, 10, 1), (u1, 3, 1)]);
    let t2 = signed_tx(&[u0], vec![output(9, 2)], &kp(1));
    let t3 = signed_tx(&[u0], vec![output(7, 3)], &kp(1));
    let t4 = signed_tx(&[u1], vec![output(3, 2)], &kp(1));

    let json = EpochBatch::new(pool, vec![Some(t2), Some(t3), None, Some(t4)])
        .to_json_pretty()
        .unwrap();
    let batch = EpochBatch::from_json(&json).unwrap();

    let graph = batch.conflict_graph();
    assert_eq!(graph.edge_count(), 1);
    assert!(graph.are_conflicting(0, 1));

    let (settlement, settler) = batch.settle(SelectionPolicy::MaxFee).unwrap();
    let positions: Vec<_> = settlement.accepted.iter().map(|a| a.position).collect();
    assert_eq!(positions, vec![1, 3]);
    assert_eq!(settlement.total_fees(), 3);
    assert_eq!(settler.pool().len(), 2);
}
