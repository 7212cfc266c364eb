// Block - En-tête et bloc UTXO minimal et auditable
use super::codec;
use super::merkle::ordered_root;
use super::primitives::{BlockNumber, Hash};
use super::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// En-tête de bloc
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Hash du bloc parent
    pub parent_hash: Hash,

    /// Numéro de bloc (hauteur)
    pub number: BlockNumber,

    /// Merkle root de l'état UTXO (après exécution)
    pub state_root: Hash,

    /// Merkle root ordonnée des extrinsics
    pub extrinsics_root: Hash,
}

impl Header {
    /// Partial header handed to `open_block`: the roots are filled in by `close_block`
    pub fn new(parent_hash: Hash, number: BlockNumber) -> Self {
        Self {
            parent_hash,
            number,
            state_root: Hash::ZERO,
            extrinsics_root: Hash::ZERO,
        }
    }

    /// Hash de l'en-tête (identifiant unique du bloc)
    pub fn hash(&self) -> Hash {
        Hash::hash(&codec::encode(self))
    }
}

/// Bloc complet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block<V, C> {
    pub header: Header,
    pub extrinsics: Vec<Transaction<V, C>>,
}

impl<V, C> Block<V, C>
where
    V: Serialize + Clone,
    C: Serialize + Clone,
{
    pub fn new(header: Header, extrinsics: Vec<Transaction<V, C>>) -> Self {
        Self { header, extrinsics }
    }

    /// Hash du bloc
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn number(&self) -> BlockNumber {
        self.header.number
    }
}

/// Racine Merkle ordonnée d'une liste d'extrinsics
pub fn extrinsics_root<V: Serialize, C: Serialize>(extrinsics: &[Transaction<V, C>]) -> Hash {
    ordered_root(extrinsics.iter().map(codec::encode))
}
