// Overlay - Écritures en attente au-dessus d'un store en lecture seule
//
// Used to execute a whole block (or build one) without touching the base
// store: reads fall through to the base unless shadowed, and the pending
// changes are flushed as a single batch only once everything succeeded.

use super::kv::{KeyValueStore, StorageError, WriteOp};
use std::collections::BTreeMap;

pub struct OverlayStore<'a, S> {
    base: &'a S,
    /// `None` marks a deletion
    changes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a, S: KeyValueStore> OverlayStore<'a, S> {
    pub fn new(base: &'a S) -> Self {
        Self {
            base,
            changes: BTreeMap::new(),
        }
    }

    /// Nombre de clés modifiées
    pub fn pending(&self) -> usize {
        self.changes.len()
    }

    /// Pending changes as a write batch for the base store
    pub fn into_ops(self) -> Vec<WriteOp> {
        self.changes
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => WriteOp::Put { key, value },
                None => WriteOp::Delete { key },
            })
            .collect()
    }
}

impl<'a, S: KeyValueStore> KeyValueStore for OverlayStore<'a, S> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        match self.changes.get(key) {
            Some(change) => Ok(change.clone()),
            None => self.base.get(key),
        }
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.changes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StorageError> {
        self.changes.insert(key.to_vec(), None);
        Ok(())
    }

    fn write_batch(&mut self, ops: Vec<WriteOp>) -> Result<(), StorageError> {
        for op in ops {
            match op {
                WriteOp::Put { key, value } => {
                    self.changes.insert(key, Some(value));
                }
                WriteOp::Delete { key } => {
                    self.changes.insert(key, None);
                }
            }
        }
        Ok(())
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = self.base.iter_prefix(prefix)?.into_iter().collect();

        for (key, change) in self
            .changes
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
        {
            match change {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        Ok(merged.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn base() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.put(b"p:1", b"one").unwrap();
        store.put(b"p:2", b"two").unwrap();
        store
    }

    #[test]
    fn test_overlay_shadows_base() {
        let base = base();
        let mut overlay = OverlayStore::new(&base);
        overlay.delete(b"p:1").unwrap();
        overlay.put(b"p:3", b"three").unwrap();

        assert_eq!(overlay.get(b"p:1").unwrap(), None);
        assert_eq!(overlay.get(b"p:2").unwrap(), Some(b"two".to_vec()));
        assert_eq!(overlay.get(b"p:3").unwrap(), Some(b"three".to_vec()));
        // La base n'est pas touchée
        assert_eq!(base.get(b"p:1").unwrap(), Some(b"one".to_vec()));
    }

    #[test]
    fn test_overlay_prefix_merge() {
        let base = base();
        let mut overlay = OverlayStore::new(&base);
        overlay.delete(b"p:2").unwrap();
        overlay.put(b"p:0", b"zero").unwrap();
        overlay.put(b"q:0", b"other").unwrap();

        let keys: Vec<_> = overlay
            .iter_prefix(b"p:")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![b"p:0".to_vec(), b"p:1".to_vec()]);
    }

    #[test]
    fn test_overlay_flush() {
        let mut base = base();
        let ops = {
            let mut overlay = OverlayStore::new(&base);
            overlay.delete(b"p:1").unwrap();
            overlay.put(b"p:9", b"nine").unwrap();
            assert_eq!(overlay.pending(), 2);
            overlay.into_ops()
        };
        base.write_batch(ops).unwrap();
        assert!(!base.exists(b"p:1").unwrap());
        assert!(base.exists(b"p:9").unwrap());
    }
}
