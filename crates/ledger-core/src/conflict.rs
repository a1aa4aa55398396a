//! Conflict graph over a batch of candidate transactions.
//!
//! Node `i` is the candidate at position `i`. Two candidates are joined by an
//! edge when they claim at least one common [`UtxoId`]; at most one side of
//! an edge can ever be accepted. Selecting the fee-maximizing conflict-free
//! subset is maximum-weight independent set on this graph (NP-hard). The
//! settler's [`MaxFee`](crate::settlement::MaxFee) strategy is a greedy
//! heuristic for it; this graph is kept separate so an exact solver can be
//! built on it without touching validation.

use std::collections::HashMap;

use crate::types::{Transaction, UtxoId};

/// Undirected conflict graph, built once per batch.
#[derive(Debug, Clone, Default)]
pub struct ConflictGraph {
    /// Sorted, deduplicated neighbours per node.
    adjacency: Vec<Vec<usize>>,
    /// UTXO id → positions of the candidates claiming it, ascending.
    claimants: HashMap<UtxoId, Vec<usize>>,
    edge_count: usize,
}

impl ConflictGraph {
    /// Build the graph for a list of transactions.
    pub fn from_transactions(txs: &[Transaction]) -> Self {
        Self::build(txs.iter().map(Some))
    }

    /// Build the graph for a candidate batch. Absent candidates become
    /// isolated nodes so positions line up with the batch.
    pub fn from_candidates(candidates: &[Option<Transaction>]) -> Self {
        Self::build(candidates.iter().map(Option::as_ref))
    }

    fn build<'a>(nodes: impl Iterator<Item = Option<&'a Transaction>>) -> Self {
        let mut claimants: HashMap<UtxoId, Vec<usize>> = HashMap::new();
        let mut len = 0;

        for (position, tx) in nodes.enumerate() {
            len = position + 1;
            let Some(tx) = tx else { continue };
            for id in tx.claimed_utxos() {
                let list = claimants.entry(id).or_default();
                // A transaction claiming the same UTXO twice is not its own neighbour.
                if list.last() != Some(&position) {
                    list.push(position);
                }
            }
        }

        let mut adjacency = vec![Vec::new(); len];
        for list in claimants.values() {
            for (k, &a) in list.iter().enumerate() {
                for &b in &list[k + 1..] {
                    adjacency[a].push(b);
                    adjacency[b].push(a);
                }
            }
        }

        let mut edge_count = 0;
        for neighbours in &mut adjacency {
            neighbours.sort_unstable();
            neighbours.dedup();
            edge_count += neighbours.len();
        }

        Self {
            adjacency,
            claimants,
            edge_count: edge_count / 2,
        }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Positions conflicting with `node`, ascending. Empty for out-of-range nodes.
    pub fn conflicts_with(&self, node: usize) -> &[usize] {
        self.adjacency.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `a` and `b` claim a common UTXO.
    pub fn are_conflicting(&self, a: usize, b: usize) -> bool {
        self.conflicts_with(a).binary_search(&b).is_ok()
    }

    /// Whether no two of `nodes` conflict.
    pub fn is_independent(&self, nodes: &[usize]) -> bool {
        nodes.iter().enumerate().all(|(k, &a)| {
            nodes[k + 1..].iter().all(|&b| !self.are_conflicting(a, b))
        })
    }

    /// Positions of the candidates claiming `utxo`, ascending.
    pub fn claimants(&self, utxo: &UtxoId) -> &[usize] {
        self.claimants.get(utxo).map(Vec::as_slice).unwrap_or(&[])
    }

    /// UTXOs claimed by more than one candidate, with their claimants,
    /// sorted by UTXO id.
    pub fn contested_utxos(&self) -> Vec<(UtxoId, &[usize])> {
        let mut contested: Vec<(UtxoId, &[usize])> = self
            .claimants
            .iter()
            .filter(|(_, list)| list.len() > 1)
            .map(|(id, list)| (*id, list.as_slice()))
            .collect();
        contested.sort_by(|a, b| a.0.cmp(&b.0));
        contested
    }
}
