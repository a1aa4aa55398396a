//! Error types for the settlement core.
//!
//! [`TransactionError`] is a rejection reason, not a failure: the settler
//! records it next to the rejected candidate and moves on. [`PoolError`] and
//! [`SettleError`] are bookkeeping invariant violations and are always
//! propagated to the caller.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("absent transaction")] Absent,
    #[error("unknown UTXO: {0}")] UnknownUtxo(String),
    #[error("invalid signature on input {index}")] InvalidSignature { index: usize },
    #[error("duplicate input: {0}")] DuplicateInput(String),
    #[error("negative value on output {0}")] NegativeOutput(usize),
    #[error("insufficient funds: have {have}, need {need}")] InsufficientFunds { have: i64, need: i64 },
    #[error("value overflow")] ValueOverflow,
    #[error("transaction already accepted in this batch: {0}")] DuplicateCandidate(String),
    #[error("output already present in pool: {0}")] OutputExists(String),
    #[error("not selected by the settlement strategy")] NotSelected,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("UTXO not found: {0}")] NotFound(String),
    #[error("UTXO already present: {0}")] DuplicateKey(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid public key bytes")] InvalidPublicKey,
    #[error("input index out of bounds: {index} >= {len}")] InputIndexOutOfBounds { index: usize, len: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettleError {
    #[error("pool invariant violated while applying {txid}: {source}")]
    PoolInvariant { txid: String, source: PoolError },
    #[error("strategy picked index {index} with only {pending} candidates pending")]
    InvalidStep { index: usize, pending: usize },
}

/// Everything a batch file round trip can fail with.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("malformed batch: {0}")] Json(#[from] serde_json::Error),
    #[error(transparent)] Transaction(#[from] TransactionError),
    #[error(transparent)] Pool(#[from] PoolError),
    #[error(transparent)] Crypto(#[from] CryptoError),
    #[error(transparent)] Settle(#[from] SettleError),
}
