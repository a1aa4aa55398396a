//! The pool of currently spendable outputs.
//!
//! [`UtxoPool`] maps each [`UtxoId`] to the [`TxOutput`] it names. Removal and
//! insertion are the only mutations. The settler deep-copies the caller's
//! pool (`Clone`) and mutates only its own copy.
//!
//! A failed [`insert`](UtxoPool::insert) or [`remove`](UtxoPool::remove)
//! during settlement means the settler's bookkeeping is wrong; callers
//! propagate these errors rather than ignoring them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::PoolError;
use crate::types::{Amount, TxOutput, UtxoId};

/// One `(identity, output)` pair in serialized pool snapshots.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PoolEntry {
    pub utxo: UtxoId,
    pub output: TxOutput,
}

/// Mapping from unspent-output identity to output. Keys are unique.
///
/// A repeated identity never replaces the entry already present:
/// [`insert`](Self::insert) reports it as [`PoolError::DuplicateKey`],
/// collecting from an iterator keeps the first pair, and deserializing
/// (`TryFrom<Vec<PoolEntry>>`) rejects the snapshot.
///
/// Not thread-safe; one settlement owns a pool exclusively.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(into = "Vec<PoolEntry>", try_from = "Vec<PoolEntry>")]
pub struct UtxoPool {
    utxos: HashMap<UtxoId, TxOutput>,
}

impl UtxoPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            utxos: HashMap::new(),
        }
    }

    /// Whether `id` is currently spendable.
    pub fn contains(&self, id: &UtxoId) -> bool {
        self.utxos.contains_key(id)
    }

    /// Look up the output named by `id`.
    pub fn get(&self, id: &UtxoId) -> Result<&TxOutput, PoolError> {
        self.utxos
            .get(id)
            .ok_or_else(|| PoolError::NotFound(id.to_string()))
    }

    /// Add a new unspent output. Fails if `id` is already present; the
    /// existing entry is left untouched.
    pub fn insert(&mut self, id: UtxoId, output: TxOutput) -> Result<(), PoolError> {
        if self.utxos.contains_key(&id) {
            return Err(PoolError::DuplicateKey(id.to_string()));
        }
        self.utxos.insert(id, output);
        Ok(())
    }

    /// Remove a spent output, returning it.
    pub fn remove(&mut self, id: &UtxoId) -> Result<TxOutput, PoolError> {
        self.utxos
            .remove(id)
            .ok_or_else(|| PoolError::NotFound(id.to_string()))
    }

    /// Number of unspent outputs.
    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    /// Whether the pool has no unspent outputs.
    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    /// Iterate over all `(identity, output)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&UtxoId, &TxOutput)> {
        self.utxos.iter()
    }

    /// All identities, sorted.
    pub fn utxo_ids(&self) -> Vec<UtxoId> {
        let mut ids: Vec<UtxoId> = self.utxos.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Sum of all output values. Returns None on overflow.
    pub fn total_value(&self) -> Option<Amount> {
        self.utxos
            .values()
            .try_fold(0 as Amount, |acc, out| acc.checked_add(out.value))
    }
}

impl FromIterator<(UtxoId, TxOutput)> for UtxoPool {
    /// Earlier pairs win over later ones with the same identity.
    fn from_iter<I: IntoIterator<Item = (UtxoId, TxOutput)>>(iter: I) -> Self {
        let mut utxos = HashMap::new();
        for (utxo, output) in iter {
            utxos.entry(utxo).or_insert(output);
        }
        Self { utxos }
    }
}

impl From<UtxoPool> for Vec<PoolEntry> {
    fn from(pool: UtxoPool) -> Self {
        let mut entries: Vec<PoolEntry> = pool
            .utxos
            .into_iter()
            .map(|(utxo, output)| PoolEntry { utxo, output })
            .collect();
        entries.sort_by(|a, b| a.utxo.cmp(&b.utxo));
        entries
    }
}

impl TryFrom<Vec<PoolEntry>> for UtxoPool {
    type Error = PoolError;

    fn try_from(entries: Vec<PoolEntry>) -> Result<Self, Self::Error> {
        let mut pool = UtxoPool::new();
        for entry in entries {
            pool.insert(entry.utxo, entry.output)?;
        }
        Ok(pool)
    }
}
