// Primitives - Types fondamentaux du ledger UTXO
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hash universel (Blake3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Hash([u8; 32]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hash des données avec Blake3
    pub fn hash(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Hash(*hash.as_bytes())
    }

    /// Full hex representation (Display only shows the first 8 bytes)
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s.strip_prefix("0x").unwrap_or(s), &mut bytes)?;
        Ok(Hash(bytes))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Numéro de bloc (hauteur)
pub type BlockNumber = u32;

/// Opaque accounting value returned by constraint checkers.
/// Summed per block by the executive and used as pool priority.
pub type Weight = u64;

/// Priorité d'une transaction dans le pool
pub type TransactionPriority = u64;

/// Durée de validité d'une transaction dans le pool (en blocs)
pub type TransactionLongevity = u64;

/// Tag used by the pool to order dependent transactions (an encoded OutputRef)
pub type TransactionTag = Vec<u8>;

/// Timestamp Unix en millisecondes
pub type Timestamp = u64;
