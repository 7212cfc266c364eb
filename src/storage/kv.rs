// Key/value - Abstraction du stockage sous-jacent
use super::db::DatabaseError;
use crate::types::{CodecError, OutputRef};

/// Opération d'écriture pour batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Erreurs de stockage
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("Erreur base de données: {0}")]
    Database(#[from] DatabaseError),

    #[error("Sortie déjà présente: {0}")]
    DuplicateOutput(OutputRef),

    #[error("Sortie absente: {0}")]
    MissingOutput(OutputRef),

    #[error("Donnée corrompue: {0}")]
    Corrupted(#[from] CodecError),
}

/// Minimal key/value store the UTXO set and the chain store are built on.
///
/// `write_batch` must apply every operation or none of them.
pub trait KeyValueStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    fn delete(&mut self, key: &[u8]) -> Result<(), StorageError>;

    /// Batch write (transaction atomique)
    fn write_batch(&mut self, ops: Vec<WriteOp>) -> Result<(), StorageError>;

    /// Every entry whose key starts with `prefix`, in ascending key order
    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError>;

    fn exists(&self, key: &[u8]) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }
}
