// Blocks - Persistance des blocs importés
use super::kv::{KeyValueStore, StorageError, WriteOp};
use crate::types::{codec, Block, BlockNumber, Hash};
use serde::{de::DeserializeOwned, Serialize};

pub const PREFIX_BLOCK_BY_HASH: &[u8] = b"block_by_hash:";
const PREFIX_BLOCK_HASH: &[u8] = b"block_hash:";
const KEY_BEST_BLOCK: &[u8] = b"best_block";
const KEY_GENESIS_HASH: &[u8] = b"genesis_hash";

/// Stockage des blocs: by hash, hash by number, best block and genesis hash
pub struct ChainStore<S> {
    store: S,
}

impl<S: KeyValueStore> ChainStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Stocke un bloc et en fait le meilleur bloc, atomiquement
    pub fn store_block<V, C>(&mut self, block: &Block<V, C>) -> Result<Hash, StorageError>
    where
        V: Serialize + Clone,
        C: Serialize + Clone,
    {
        self.store.write_batch(Self::block_ops(block))?;
        Ok(block.hash())
    }

    /// Writes that store `block` and make it the best block.
    ///
    /// Callers that also change the UTXO set append these to the same batch,
    /// so that the set and the best block never disagree.
    pub fn block_ops<V, C>(block: &Block<V, C>) -> Vec<WriteOp>
    where
        V: Serialize + Clone,
        C: Serialize + Clone,
    {
        let hash = block.hash();
        let number = block.header.number;

        let mut ops = vec![
            WriteOp::Put {
                key: Self::block_key(&hash),
                value: codec::encode(block),
            },
            WriteOp::Put {
                key: Self::block_hash_key(number),
                value: codec::encode(&hash),
            },
            WriteOp::Put {
                key: KEY_BEST_BLOCK.to_vec(),
                value: codec::encode(&number),
            },
        ];
        if number == 0 {
            ops.push(WriteOp::Put {
                key: KEY_GENESIS_HASH.to_vec(),
                value: codec::encode(&hash),
            });
        }
        ops
    }

    pub fn get_block_by_hash<V, C>(&self, hash: &Hash) -> Result<Option<Block<V, C>>, StorageError>
    where
        V: DeserializeOwned,
        C: DeserializeOwned,
    {
        match self.store.get(&Self::block_key(hash))? {
            Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn get_block_hash(&self, number: BlockNumber) -> Result<Option<Hash>, StorageError> {
        match self.store.get(&Self::block_hash_key(number))? {
            Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn get_block_by_number<V, C>(&self, number: BlockNumber) -> Result<Option<Block<V, C>>, StorageError>
    where
        V: DeserializeOwned,
        C: DeserializeOwned,
    {
        match self.get_block_hash(number)? {
            Some(hash) => self.get_block_by_hash(&hash),
            None => Ok(None),
        }
    }

    pub fn get_best_block(&self) -> Result<Option<BlockNumber>, StorageError> {
        match self.store.get(KEY_BEST_BLOCK)? {
            Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn get_genesis_hash(&self) -> Result<Option<Hash>, StorageError> {
        match self.store.get(KEY_GENESIS_HASH)? {
            Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn block_key(hash: &Hash) -> Vec<u8> {
        let mut key = PREFIX_BLOCK_BY_HASH.to_vec();
        key.extend_from_slice(hash.as_bytes());
        key
    }

    fn block_hash_key(number: BlockNumber) -> Vec<u8> {
        let mut key = PREFIX_BLOCK_HASH.to_vec();
        // Big endian pour garder l'ordre numérique
        key.extend_from_slice(&number.to_be_bytes());
        key
    }
}
