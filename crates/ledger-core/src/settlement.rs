//! Batch settlement: turn an unordered batch of candidate transactions into
//! a mutually valid accepted set, mutating the settler's pool as it goes.
//!
//! One validator ([`Candidate::validate`]) is shared by all policies; the
//! policies differ only in which pending candidate they decide next
//! ([`SelectionStrategy`]):
//!
//! - [`InputOrder`]: single pass in input order, first valid wins.
//! - [`MaxFee`]: before every acceptance, re-validate all pending
//!   candidates against the current pool and take the highest fee. This is a
//!   greedy heuristic for the maximum-weight conflict-free subset (see
//!   [`ConflictGraph`](crate::conflict::ConflictGraph)); it is not
//!   guaranteed optimal. Because fees are recomputed against the live pool
//!   each round, the result can differ from a one-shot sort by fee.
//!
//! Rejection is a normal outcome and is recorded in
//! [`Settlement::rejected`]. Only pool bookkeeping failures are errors.

use std::cell::OnceCell;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PoolError, SettleError, TransactionError};
use crate::traits::{Ed25519Verifier, SelectionStrategy, SignatureVerifier};
use crate::types::{Amount, Hash256, Transaction};
use crate::utxo_pool::UtxoPool;
use crate::validation::{
    check_authorization, validate_transaction, validate_with_authorization, ValidatedTransaction,
};

/// A candidate still awaiting a decision.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Position in the submitted batch.
    pub position: usize,
    /// Precomputed transaction id.
    pub txid: Hash256,
    pub tx: Transaction,
    /// Signature check result, filled the first time every claimed output exists.
    authorization: OnceCell<Result<(), TransactionError>>,
}

impl Candidate {
    pub fn new(position: usize, tx: Transaction) -> Self {
        Self {
            position,
            txid: tx.id(),
            tx,
            authorization: OnceCell::new(),
        }
    }

    /// Validate against `pool`. Signatures are verified at most once per
    /// candidate; existence, double-claim and value checks always run
    /// against the pool given.
    pub fn validate(
        &self,
        pool: &UtxoPool,
        verifier: &dyn SignatureVerifier,
    ) -> Result<ValidatedTransaction, TransactionError> {
        validate_with_authorization(&self.tx, pool, || {
            self.authorization
                .get_or_init(|| check_authorization(&self.tx, pool, verifier))
                .clone()
        })
    }
}

/// A strategy's decision about one pending candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Apply `pending[index]`; `validated` is its summary against the current pool.
    Accept {
        index: usize,
        validated: ValidatedTransaction,
    },
    /// Drop `pending[index]` for `reason`.
    Reject {
        index: usize,
        reason: TransactionError,
    },
}

/// Single pass in input order: each candidate is decided when its turn
/// comes, against the pool as it stands at that moment.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputOrder;

impl SelectionStrategy for InputOrder {
    fn next(
        &mut self,
        pending: &[Candidate],
        pool: &UtxoPool,
        verifier: &dyn SignatureVerifier,
    ) -> Option<Step> {
        let first = pending.first()?;
        Some(match first.validate(pool, verifier) {
            Ok(validated) => Step::Accept { index: 0, validated },
            Err(reason) => Step::Reject { index: 0, reason },
        })
    }
}

/// Greedy highest-fee-first against the live pool.
///
/// Each round every pending candidate is re-validated; candidates that are
/// currently not claimable are skipped for that round (and may become
/// claimable later, e.g. a child whose parent is accepted meanwhile). Fees
/// come from the live pool every round, signatures are checked once per
/// candidate. Ties on fee go to the smallest transaction id, then the
/// earliest position.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxFee;

impl SelectionStrategy for MaxFee {
    fn next(
        &mut self,
        pending: &[Candidate],
        pool: &UtxoPool,
        verifier: &dyn SignatureVerifier,
    ) -> Option<Step> {
        let mut best: Option<(usize, ValidatedTransaction)> = None;

        for (index, candidate) in pending.iter().enumerate() {
            let Ok(validated) = candidate.validate(pool, verifier) else {
                continue;
            };
            let better = match &best {
                None => true,
                Some((best_index, best_validated)) => {
                    let current = &pending[*best_index];
                    (validated.fee, std::cmp::Reverse(candidate.txid), std::cmp::Reverse(candidate.position))
                        > (best_validated.fee, std::cmp::Reverse(current.txid), std::cmp::Reverse(current.position))
                }
            };
            if better {
                best = Some((index, validated));
            }
        }

        best.map(|(index, validated)| Step::Accept { index, validated })
    }
}

/// Configuration-facing choice of settlement policy.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// First valid wins, in input order.
    #[default]
    InputOrder,
    /// Greedy highest fee first.
    MaxFee,
}

impl SelectionPolicy {
    /// Build the strategy implementing this policy.
    pub fn strategy(self) -> Box<dyn SelectionStrategy> {
        match self {
            Self::InputOrder => Box::new(InputOrder),
            Self::MaxFee => Box::new(MaxFee),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InputOrder => "input-order",
            Self::MaxFee => "max-fee",
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "input-order" | "input_order" | "order" => Ok(Self::InputOrder),
            "max-fee" | "max_fee" | "fee" => Ok(Self::MaxFee),
            other => Err(format!("unknown policy '{other}' (expected input-order or max-fee)")),
        }
    }
}

/// A candidate that made it into the accepted set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedTransaction {
    /// Position in the submitted batch.
    pub position: usize,
    pub txid: Hash256,
    pub tx: Transaction,
    /// Fee against the pool at acceptance time.
    pub fee: Amount,
}

/// A candidate left out of the accepted set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedCandidate {
    /// Position in the submitted batch.
    pub position: usize,
    /// `None` for absent candidates.
    pub txid: Option<Hash256>,
    pub reason: TransactionError,
}

/// Outcome of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settlement {
    /// Accepted transactions in acceptance order.
    pub accepted: Vec<AcceptedTransaction>,
    /// Rejected candidates sorted by position.
    pub rejected: Vec<RejectedCandidate>,
}

impl Settlement {
    /// Accepted transactions in acceptance order.
    pub fn accepted_transactions(&self) -> Vec<Transaction> {
        self.accepted.iter().map(|a| a.tx.clone()).collect()
    }

    /// Ids of the accepted transactions in acceptance order.
    pub fn accepted_ids(&self) -> Vec<Hash256> {
        self.accepted.iter().map(|a| a.txid).collect()
    }

    /// Sum of the accepted fees.
    pub fn total_fees(&self) -> Amount {
        self.accepted.iter().map(|a| a.fee).sum()
    }
}

/// Epoch-local settlement engine owning its own copy of the pool.
pub struct Settler {
    pool: UtxoPool,
    policy: SelectionPolicy,
    verifier: Box<dyn SignatureVerifier>,
}

impl Settler {
    /// Settler over a copy of `pool` with the input-order policy and Ed25519
    /// signatures.
    pub fn new(pool: &UtxoPool) -> Self {
        Self::with_policy(pool, SelectionPolicy::default())
    }

    pub fn with_policy(pool: &UtxoPool, policy: SelectionPolicy) -> Self {
        Self::with_verifier(pool, policy, Box::new(Ed25519Verifier))
    }

    pub fn with_verifier(
        pool: &UtxoPool,
        policy: SelectionPolicy,
        verifier: Box<dyn SignatureVerifier>,
    ) -> Self {
        Self {
            pool: pool.clone(),
            policy,
            verifier,
        }
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// The working pool; after [`settle`](Self::settle) it reflects the
    /// post-batch state.
    pub fn pool(&self) -> &UtxoPool {
        &self.pool
    }

    /// Take the working pool, e.g. as the next epoch's starting pool.
    pub fn into_pool(self) -> UtxoPool {
        self.pool
    }

    /// Validate one transaction against the working pool.
    pub fn validate(&self, tx: &Transaction) -> Result<ValidatedTransaction, TransactionError> {
        validate_transaction(tx, &self.pool, self.verifier.as_ref())
    }

    /// The validity predicate against the working pool.
    pub fn is_valid(&self, tx: &Transaction) -> bool {
        self.validate(tx).is_ok()
    }

    /// Settle a batch with the configured policy.
    ///
    /// Accepts anything convertible to `Option<Transaction>`, so both
    /// `Vec<Transaction>` and `Vec<Option<Transaction>>` work; `None`
    /// candidates are rejected as [`TransactionError::Absent`].
    pub fn settle<I, T>(&mut self, candidates: I) -> Result<Settlement, SettleError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Option<Transaction>>,
    {
        let mut strategy = self.policy.strategy();
        self.settle_with(candidates, strategy.as_mut())
    }

    /// Settle a batch with an explicit strategy.
    pub fn settle_with<I, T>(
        &mut self,
        candidates: I,
        strategy: &mut dyn SelectionStrategy,
    ) -> Result<Settlement, SettleError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Option<Transaction>>,
    {
        let mut settlement = Settlement::default();
        let mut pending = Vec::new();

        for (position, candidate) in candidates.into_iter().enumerate() {
            match candidate.into() {
                Some(tx) => pending.push(Candidate::new(position, tx)),
                None => {
                    debug!(position, "rejected absent candidate");
                    settlement.rejected.push(RejectedCandidate {
                        position,
                        txid: None,
                        reason: TransactionError::Absent,
                    });
                }
            }
        }

        let submitted = pending.len() + settlement.rejected.len();
        let mut accepted_ids = HashSet::new();

        while let Some(step) = strategy.next(&pending, &self.pool, self.verifier.as_ref()) {
            let index = match step {
                Step::Accept { index, .. } | Step::Reject { index, .. } => index,
            };
            if index >= pending.len() {
                return Err(SettleError::InvalidStep {
                    index,
                    pending: pending.len(),
                });
            }
            let candidate = pending.remove(index);

            let validated = match step {
                Step::Accept { validated, .. } => validated,
                Step::Reject { reason, .. } => {
                    reject(&mut settlement, candidate, reason);
                    continue;
                }
            };

            if accepted_ids.contains(&candidate.txid) {
                let reason = TransactionError::DuplicateCandidate(candidate.txid.to_string());
                reject(&mut settlement, candidate, reason);
                continue;
            }

            let existing = candidate
                .tx
                .created_utxos(candidate.txid)
                .map(|(id, _)| id)
                .find(|id| self.pool.contains(id));
            if let Some(id) = existing {
                let reason = TransactionError::OutputExists(id.to_string());
                reject(&mut settlement, candidate, reason);
                continue;
            }

            self.apply(&candidate)?;
            accepted_ids.insert(candidate.txid);

            debug!(
                txid = %candidate.txid,
                position = candidate.position,
                fee = validated.fee,
                "accepted candidate"
            );
            settlement.accepted.push(AcceptedTransaction {
                position: candidate.position,
                txid: candidate.txid,
                tx: candidate.tx,
                fee: validated.fee,
            });
        }

        for candidate in pending {
            let reason = match candidate.validate(&self.pool, self.verifier.as_ref()) {
                Ok(_) => TransactionError::NotSelected,
                Err(reason) => reason,
            };
            reject(&mut settlement, candidate, reason);
        }

        settlement.rejected.sort_by_key(|r| r.position);

        info!(
            policy = %self.policy,
            submitted,
            accepted = settlement.accepted.len(),
            rejected = settlement.rejected.len(),
            fees = settlement.total_fees(),
            pool_size = self.pool.len(),
            "settled batch"
        );

        Ok(settlement)
    }

    /// Spend the candidate's inputs, then create its outputs.
    fn apply(&mut self, candidate: &Candidate) -> Result<(), SettleError> {
        let invariant = |source: PoolError| SettleError::PoolInvariant {
            txid: candidate.txid.to_string(),
            source,
        };

        for id in candidate.tx.claimed_utxos() {
            self.pool.remove(&id).map_err(invariant)?;
        }
        for (id, output) in candidate.tx.created_utxos(candidate.txid) {
            self.pool.insert(id, output.clone()).map_err(invariant)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Settler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settler")
            .field("policy", &self.policy)
            .field("pool_size", &self.pool.len())
            .finish_non_exhaustive()
    }
}

fn reject(settlement: &mut Settlement, candidate: Candidate, reason: TransactionError) {
    debug!(
        txid = %candidate.txid,
        position = candidate.position,
        %reason,
        "rejected candidate"
    );
    settlement.rejected.push(RejectedCandidate {
        position: candidate.position,
        txid: Some(candidate.txid),
        reason,
    });
}

/// Settle `candidates` against a copy of `pool`, returning the outcome and
/// the post-batch pool. The caller's pool is not modified.
pub fn settle_batch<I, T>(
    pool: &UtxoPool,
    candidates: I,
    policy: SelectionPolicy,
) -> Result<(Settlement, UtxoPool), SettleError>
where
    I: IntoIterator<Item = T>,
    T: Into<Option<Transaction>>,
{
    let mut settler = Settler::with_policy(pool, policy);
    let settlement = settler.settle(candidates)?;
    Ok((settlement, settler.into_pool()))
}
