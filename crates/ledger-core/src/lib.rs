//! # ledger-core
//! Epoch-local UTXO settlement: validate candidate transactions against a
//! pool of unspent outputs and select a mutually valid, optionally
//! fee-maximizing, accepted set.

pub mod batch;
pub mod conflict;
pub mod crypto;
pub mod error;
pub mod settlement;
pub mod traits;
pub mod types;
pub mod utxo_pool;
pub mod validation;

pub use settlement::{settle_batch, SelectionPolicy, Settlement, Settler};
pub use utxo_pool::UtxoPool;
