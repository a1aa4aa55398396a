//! Integration and adversarial test suite for the UTXO settler.
//!
//! The tests drive `ledger-core` only through its public API and check the
//! settlement invariants under hand-built scenarios and randomized batches.

pub mod helpers;
