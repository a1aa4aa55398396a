//! JSON epoch batches: a starting pool plus the candidates proposed for it.
//!
//! ```json
//! {
//!   "pool": [ { "utxo": { "tx_id": "<hex>", "index": 0 },
//!               "output": { "value": 10, "owner": "<hex>" } } ],
//!   "candidates": [ { "inputs": [...], "outputs": [...] }, null ]
//! }
//! ```
//!
//! `null` candidates are kept so positions in reports match the file.

use serde::{Deserialize, Serialize};

use crate::conflict::ConflictGraph;
use crate::error::LedgerError;
use crate::settlement::{SelectionPolicy, Settlement, Settler};
use crate::types::Transaction;
use crate::utxo_pool::UtxoPool;

/// One epoch's input to the settler.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct EpochBatch {
    /// Pool at the start of the epoch.
    pub pool: UtxoPool,
    /// Proposed transactions; `None` entries are absent proposals.
    #[serde(default)]
    pub candidates: Vec<Option<Transaction>>,
}

impl EpochBatch {
    pub fn new(pool: UtxoPool, candidates: Vec<Option<Transaction>>) -> Self {
        Self { pool, candidates }
    }

    pub fn from_json(json: &str) -> Result<Self, LedgerError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, LedgerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Conflict graph over the candidates, positions matching `candidates`.
    pub fn conflict_graph(&self) -> ConflictGraph {
        ConflictGraph::from_candidates(&self.candidates)
    }

    /// Settle the candidates against a copy of the pool.
    ///
    /// Returns the settlement and the settler, which holds the post-batch pool.
    pub fn settle(&self, policy: SelectionPolicy) -> Result<(Settlement, Settler), LedgerError> {
        let mut settler = Settler::with_policy(&self.pool, policy);
        let settlement = settler.settle(self.candidates.iter().cloned())?;
        Ok((settlement, settler))
    }
}
