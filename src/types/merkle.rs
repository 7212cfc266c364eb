// Merkle - Racines d'état et d'extrinsics
use super::primitives::Hash;
use rs_merkle::{Hasher, MerkleTree};

/// Blake3-based hasher for Merkle trees (consistent with `Hash`)
#[derive(Clone)]
pub struct Blake3Hasher;

impl Hasher for Blake3Hasher {
    type Hash = [u8; 32];

    fn hash(data: &[u8]) -> Self::Hash {
        blake3::hash(data).into()
    }
}

/// Racine Merkle d'une liste ordonnée de feuilles.
///
/// The order of `leaves` is significant. An empty list yields `Hash::ZERO`.
pub fn ordered_root<I, L>(leaves: I) -> Hash
where
    I: IntoIterator<Item = L>,
    L: AsRef<[u8]>,
{
    let leaf_hashes: Vec<[u8; 32]> = leaves
        .into_iter()
        .map(|leaf| Blake3Hasher::hash(leaf.as_ref()))
        .collect();

    if leaf_hashes.is_empty() {
        return Hash::ZERO;
    }

    let tree = MerkleTree::<Blake3Hasher>::from_leaves(&leaf_hashes);
    tree.root().map(Hash::from_bytes).unwrap_or(Hash::ZERO)
}
