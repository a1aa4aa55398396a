//! Core ledger types: hashes, UTXO identities, transactions.
//!
//! All monetary values are signed counts of the smallest currency unit so
//! that a negative output is representable and can be rejected by the
//! validator instead of being unrepresentable.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::crypto::PublicKey;

/// Amount of currency in the smallest unit.
pub type Amount = i64;

/// A 32-byte hash value. Used for transaction ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The zero hash (32 zero bytes).
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create a Hash256 from a byte array.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero hash.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Identity of an unspent output: the creating transaction plus output index.
///
/// This is the only key used to address an output in a
/// [`UtxoPool`](crate::utxo_pool::UtxoPool).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtxoId {
    /// Id of the transaction that created the output.
    pub tx_id: Hash256,
    /// Index of the output within that transaction.
    pub index: u64,
}

impl UtxoId {
    pub fn new(tx_id: Hash256, index: u64) -> Self {
        Self { tx_id, index }
    }
}

impl fmt::Display for UtxoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_id, self.index)
    }
}

/// A transaction input, claiming a previously created output.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TxInput {
    /// Id of the transaction that created the referenced output.
    pub prev_tx_id: Hash256,
    /// Index of the referenced output.
    pub output_index: u64,
    /// Ed25519 signature by the referenced output's owner. Empty until signed.
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
}

impl TxInput {
    /// An input referencing `utxo` with no signature yet.
    pub fn unsigned(utxo: UtxoId) -> Self {
        Self {
            prev_tx_id: utxo.tx_id,
            output_index: utxo.index,
            signature: Vec::new(),
        }
    }

    /// The UTXO identity this input claims.
    pub fn utxo_id(&self) -> UtxoId {
        UtxoId::new(self.prev_tx_id, self.output_index)
    }
}

/// A transaction output, creating a new UTXO.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TxOutput {
    /// Value in the smallest currency unit.
    pub value: Amount,
    /// Public key allowed to spend this output.
    pub owner: PublicKey,
}

/// A transaction moving value from claimed UTXOs to new outputs.
///
/// A transaction is a value: it does not own pool state. Its id is derived
/// from its content on demand, see [`Transaction::id`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Transaction {
    /// Inputs claiming existing outputs.
    pub inputs: Vec<TxInput>,
    /// New outputs created by this transaction.
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        Self { inputs, outputs }
    }

    /// Canonical content encoding shared by [`id`](Self::id) and the
    /// per-input signing payload.
    ///
    /// Layout, little-endian: input count, then `prev_tx_id || output_index`
    /// per input, then output count, then `value || owner` per output.
    /// Signatures are excluded.
    pub fn content_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(16 + self.inputs.len() * 40 + self.outputs.len() * 40);

        data.extend_from_slice(&(self.inputs.len() as u64).to_le_bytes());
        for input in &self.inputs {
            data.extend_from_slice(input.prev_tx_id.as_bytes());
            data.extend_from_slice(&input.output_index.to_le_bytes());
        }

        data.extend_from_slice(&(self.outputs.len() as u64).to_le_bytes());
        for output in &self.outputs {
            data.extend_from_slice(&output.value.to_le_bytes());
            data.extend_from_slice(&output.owner.to_bytes());
        }

        data
    }

    /// Compute the transaction id (BLAKE3 of [`content_bytes`](Self::content_bytes)).
    ///
    /// Signing inputs never changes the id.
    pub fn id(&self) -> Hash256 {
        Hash256(blake3::hash(&self.content_bytes()).into())
    }

    /// UTXO identities claimed by the inputs, in input order.
    pub fn claimed_utxos(&self) -> impl Iterator<Item = UtxoId> + '_ {
        self.inputs.iter().map(TxInput::utxo_id)
    }

    /// UTXO identities this transaction creates, given its id.
    pub fn created_utxos(&self, txid: Hash256) -> impl Iterator<Item = (UtxoId, &TxOutput)> + '_ {
        self.outputs
            .iter()
            .enumerate()
            .map(move |(index, output)| (UtxoId::new(txid, index as u64), output))
    }

    /// Sum of all output values. Returns None on overflow.
    pub fn total_output_value(&self) -> Option<Amount> {
        self.outputs
            .iter()
            .try_fold(0 as Amount, |acc, out| acc.checked_add(out.value))
    }
}

/// Hex encoding for raw byte fields in JSON.
pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn owner(seed: u8) -> PublicKey {
        KeyPair::from_secret_bytes([seed; 32]).public_key()
    }

    fn sample_tx() -> Transaction {
        Transaction::new(
            vec![TxInput::unsigned(UtxoId::new(Hash256([0x11; 32]), 0))],
            vec![
                TxOutput { value: 4, owner: owner(1) },
                TxOutput { value: 5, owner: owner(2) },
            ],
        )
    }

    // --- Hash256 ---

    #[test]
    fn hash256_zero_is_zero() {
        assert!(Hash256::ZERO.is_zero());
        assert_eq!(Hash256::ZERO, Hash256::default());
        assert!(!Hash256([1; 32]).is_zero());
    }

    #[test]
    fn hash256_display_hex() {
        let s = format!("{}", Hash256([0xAB; 32]));
        assert_eq!(s.len(), 64);
        assert_eq!(&s[0..2], "ab");
    }

    #[test]
    fn hash256_hex_parse() {
        let h = Hash256([0x5C; 32]);
        assert_eq!(Hash256::from_hex(&h.to_string()).unwrap(), h);
        assert!(Hash256::from_hex("zz").is_err());
    }

    #[test]
    fn hash256_json_is_hex_string() {
        let json = serde_json::to_string(&Hash256([0x01; 32])).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));
    }

    // --- UtxoId ---

    #[test]
    fn utxo_id_equality_needs_both_fields() {
        let a = UtxoId::new(Hash256([1; 32]), 0);
        assert_eq!(a, UtxoId::new(Hash256([1; 32]), 0));
        assert_ne!(a, UtxoId::new(Hash256([1; 32]), 1));
        assert_ne!(a, UtxoId::new(Hash256([2; 32]), 0));
    }

    #[test]
    fn utxo_id_display() {
        let s = UtxoId::new(Hash256([0xFF; 32]), 3).to_string();
        assert!(s.ends_with(":3"));
        assert!(s.starts_with("ffff"));
    }

    // --- Transaction ---

    #[test]
    fn id_deterministic() {
        let tx = sample_tx();
        assert_eq!(tx.id(), tx.id());
        assert!(!tx.id().is_zero());
    }

    #[test]
    fn id_ignores_signatures() {
        let unsigned = sample_tx();
        let mut signed = unsigned.clone();
        signed.inputs[0].signature = vec![7u8; 64];
        assert_eq!(unsigned.id(), signed.id());
        assert_ne!(unsigned, signed);
    }

    #[test]
    fn id_changes_with_outputs() {
        let tx1 = sample_tx();
        let mut tx2 = sample_tx();
        tx2.outputs[1].value = 6;
        assert_ne!(tx1.id(), tx2.id());
    }

    #[test]
    fn id_changes_with_inputs() {
        let tx1 = sample_tx();
        let mut tx2 = sample_tx();
        tx2.inputs[0].output_index = 1;
        assert_ne!(tx1.id(), tx2.id());
    }

    #[test]
    fn created_utxos_use_txid_and_position() {
        let tx = sample_tx();
        let txid = tx.id();
        let created: Vec<_> = tx.created_utxos(txid).collect();
        assert_eq!(created.len(), 2);
        assert_eq!(created[0].0, UtxoId::new(txid, 0));
        assert_eq!(created[1].0, UtxoId::new(txid, 1));
        assert_eq!(created[1].1.value, 5);
    }

    #[test]
    fn claimed_utxos_in_input_order() {
        let a = UtxoId::new(Hash256([1; 32]), 0);
        let b = UtxoId::new(Hash256([2; 32]), 7);
        let tx = Transaction::new(vec![TxInput::unsigned(a), TxInput::unsigned(b)], vec![]);
        assert_eq!(tx.claimed_utxos().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn total_output_value_sums_and_detects_overflow() {
        assert_eq!(sample_tx().total_output_value(), Some(9));

        let mut tx = sample_tx();
        tx.outputs[0].value = i64::MAX;
        assert_eq!(tx.total_output_value(), None);

        assert_eq!(Transaction::default().total_output_value(), Some(0));
    }

    #[test]
    fn transaction_json_uses_hex_signatures() {
        let mut tx = sample_tx();
        tx.inputs[0].signature = vec![0xAB, 0xCD];
        let json = serde_json::to_string(&tx).unwrap();
        assert!(json.contains("\"signature\":\"abcd\""));
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tx);
    }
}
