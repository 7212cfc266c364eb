// Database - Backend RocksDB
use super::kv::{KeyValueStore, StorageError, WriteOp};
use rocksdb::{Options, DB};
use std::path::Path;
use std::sync::Arc;

/// Wrapper autour de RocksDB. Clones share the same underlying handle.
#[derive(Clone)]
pub struct Database {
    db: Arc<DB>,
}

impl Database {
    /// Ouvre ou crée une base de données
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        // Limiter l'accumulation de fichiers pour éviter "Too many open files"
        opts.set_keep_log_file_num(5);
        opts.set_max_manifest_file_size(64 * 1024 * 1024);
        opts.set_max_background_jobs(2);

        let db = DB::open(&opts, path).map_err(|e| DatabaseError::OpenFailed(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>, DatabaseError> {
        self.db
            .get(key)
            .map_err(|e| DatabaseError::ReadFailed(e.to_string()))
    }

    fn write(&self, ops: Vec<WriteOp>) -> Result<(), DatabaseError> {
        let mut batch = rocksdb::WriteBatch::default();

        for op in ops {
            match op {
                WriteOp::Put { key, value } => batch.put(&key, &value),
                WriteOp::Delete { key } => batch.delete(&key),
            }
        }

        self.db
            .write(batch)
            .map_err(|e| DatabaseError::WriteFailed(e.to_string()))
    }

    /// Itère sur les clés avec un préfixe donné; iteration errors are surfaced
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, DatabaseError> {
        let mut items = Vec::new();
        for item in self.db.prefix_iterator(prefix) {
            let (key, value) = item.map_err(|e| DatabaseError::ReadFailed(e.to_string()))?;
            // Without a prefix extractor the iterator runs past the prefix
            if !key.starts_with(prefix) {
                break;
            }
            items.push((key.to_vec(), value.to_vec()));
        }
        Ok(items)
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.read(key)?)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.db
            .put(key, value)
            .map_err(|e| DatabaseError::WriteFailed(e.to_string()).into())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StorageError> {
        self.db
            .delete(key)
            .map_err(|e| DatabaseError::WriteFailed(e.to_string()).into())
    }

    fn write_batch(&mut self, ops: Vec<WriteOp>) -> Result<(), StorageError> {
        Ok(self.write(ops)?)
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        Ok(self.scan_prefix(prefix)?)
    }
}

/// Erreurs de base de données
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatabaseError {
    #[error("Échec d'ouverture de la DB: {0}")]
    OpenFailed(String),

    #[error("Échec de lecture: {0}")]
    ReadFailed(String),

    #[error("Échec d'écriture: {0}")]
    WriteFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_database_basic_ops() {
        let temp_dir = TempDir::new().unwrap();
        let mut db = Database::open(temp_dir.path()).unwrap();

        db.put(b"key1", b"value1").unwrap();
        assert_eq!(db.get(b"key1").unwrap(), Some(b"value1".to_vec()));
        assert!(db.exists(b"key1").unwrap());
        assert!(!db.exists(b"key2").unwrap());

        db.delete(b"key1").unwrap();
        assert!(!db.exists(b"key1").unwrap());
    }

    #[test]
    fn test_database_batch_and_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let mut db = Database::open(temp_dir.path()).unwrap();

        db.write_batch(vec![
            WriteOp::Put {
                key: b"utxo:2".to_vec(),
                value: b"b".to_vec(),
            },
            WriteOp::Put {
                key: b"utxo:1".to_vec(),
                value: b"a".to_vec(),
            },
            WriteOp::Put {
                key: b"zzz".to_vec(),
                value: b"c".to_vec(),
            },
        ])
        .unwrap();

        let items = db.iter_prefix(b"utxo:").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].0, b"utxo:1".to_vec());
    }

    #[test]
    fn test_database_reopen_keeps_data() {
        let temp_dir = TempDir::new().unwrap();
        {
            let mut db = Database::open(temp_dir.path()).unwrap();
            db.put(b"persist", b"yes").unwrap();
        }
        let db = Database::open(temp_dir.path()).unwrap();
        assert_eq!(db.get(b"persist").unwrap(), Some(b"yes".to_vec()));
    }
}
