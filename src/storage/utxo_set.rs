// UTXO set - Ensemble des sorties non dépensées
use super::kv::{KeyValueStore, StorageError, WriteOp};
use super::overlay::OverlayStore;
use crate::types::{codec, ordered_root, Hash, Output, OutputRef};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeSet;
use std::marker::PhantomData;

/// Storage key prefix
pub const PREFIX_UTXO: &[u8] = b"utxo:";

/// Changements produits par une transaction: consumed refs and created outputs
#[derive(Debug, Clone, PartialEq)]
pub struct UtxoChanges<V> {
    pub consumed: Vec<OutputRef>,
    pub created: Vec<(OutputRef, Output<V>)>,
}

impl<V> Default for UtxoChanges<V> {
    fn default() -> Self {
        Self {
            consumed: Vec::new(),
            created: Vec::new(),
        }
    }
}

/// Typed view of the unspent outputs held in a key/value store.
///
/// Every mutation either fully applies or leaves the store untouched.
pub struct UtxoSet<S, V> {
    store: S,
    _verifier: PhantomData<fn() -> V>,
}

impl<S: Clone, V> Clone for UtxoSet<S, V> {
    fn clone(&self) -> Self {
        Self::new(self.store.clone())
    }
}

impl<S, V> UtxoSet<S, V> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            _verifier: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn key(output_ref: &OutputRef) -> Vec<u8> {
        let mut key = PREFIX_UTXO.to_vec();
        key.extend_from_slice(&codec::encode(output_ref));
        key
    }
}

impl<S, V> UtxoSet<S, V>
where
    S: KeyValueStore,
    V: Serialize + DeserializeOwned,
{
    /// Lit une sortie
    pub fn get(&self, output_ref: &OutputRef) -> Result<Option<Output<V>>, StorageError> {
        match self.store.get(&Self::key(output_ref))? {
            Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, output_ref: &OutputRef) -> Result<bool, StorageError> {
        self.store.exists(&Self::key(output_ref))
    }

    /// Insère une sortie; fails if the ref is already present
    pub fn insert(&mut self, output_ref: &OutputRef, output: &Output<V>) -> Result<(), StorageError> {
        if self.contains(output_ref)? {
            return Err(StorageError::DuplicateOutput(*output_ref));
        }
        self.store.put(&Self::key(output_ref), &codec::encode(output))
    }

    /// Retire une sortie; fails if the ref is absent
    pub fn remove(&mut self, output_ref: &OutputRef) -> Result<Output<V>, StorageError> {
        let output = self
            .get(output_ref)?
            .ok_or(StorageError::MissingOutput(*output_ref))?;
        self.store.delete(&Self::key(output_ref))?;
        Ok(output)
    }

    /// Applies all consumptions and creations in one atomic batch.
    ///
    /// Every consumed ref must exist and every created ref must be absent,
    /// otherwise nothing is written.
    pub fn commit(&mut self, changes: UtxoChanges<V>) -> Result<(), StorageError> {
        let mut consumed = BTreeSet::new();
        for output_ref in &changes.consumed {
            if !consumed.insert(*output_ref) || !self.contains(output_ref)? {
                return Err(StorageError::MissingOutput(*output_ref));
            }
        }

        let mut created = BTreeSet::new();
        for (output_ref, _) in &changes.created {
            if !created.insert(*output_ref) || self.contains(output_ref)? {
                return Err(StorageError::DuplicateOutput(*output_ref));
            }
        }

        let mut ops = Vec::with_capacity(changes.consumed.len() + changes.created.len());
        for output_ref in &changes.consumed {
            ops.push(WriteOp::Delete {
                key: Self::key(output_ref),
            });
        }
        for (output_ref, output) in &changes.created {
            ops.push(WriteOp::Put {
                key: Self::key(output_ref),
                value: codec::encode(output),
            });
        }

        self.store.write_batch(ops)
    }

    /// Toutes les sorties, triées par clé de stockage
    pub fn outputs(&self) -> Result<Vec<(OutputRef, Output<V>)>, StorageError> {
        self.store
            .iter_prefix(PREFIX_UTXO)?
            .into_iter()
            .map(|(key, value)| {
                let output_ref = codec::decode(&key[PREFIX_UTXO.len()..])?;
                let output = codec::decode(&value)?;
                Ok((output_ref, output))
            })
            .collect()
    }

    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.store.iter_prefix(PREFIX_UTXO)?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    /// Merkle root over every (key, value) entry, sorted by key
    pub fn state_root(&self) -> Result<Hash, StorageError> {
        let mut entries = self.store.iter_prefix(PREFIX_UTXO)?;
        entries.sort();
        Ok(ordered_root(entries.iter().map(codec::encode)))
    }

    /// Runs `f` against an overlay of this set and writes its changes only
    /// when it succeeds.
    pub fn execute_atomic<F, R, E>(&mut self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut UtxoSet<OverlayStore<'_, S>, V>) -> Result<R, E>,
        E: From<StorageError>,
    {
        let (result, ops) = {
            let mut overlay = UtxoSet::new(OverlayStore::new(&self.store));
            let result = f(&mut overlay)?;
            (result, overlay.into_store().into_ops())
        };

        self.store.write_batch(ops)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::types::DynamicallyTypedData;

    type TestSet = UtxoSet<MemoryStore, u8>;

    fn output(byte: u8) -> Output<u8> {
        Output {
            payload: DynamicallyTypedData {
                data: vec![byte],
                type_id: *b"test",
            },
            verifier: byte,
        }
    }

    fn oref(i: u32) -> OutputRef {
        OutputRef::new(Hash::hash(b"tx"), i)
    }

    #[test]
    fn test_insert_get_remove() {
        let mut set = TestSet::new(MemoryStore::new());
        set.insert(&oref(0), &output(1)).unwrap();
        assert!(set.contains(&oref(0)).unwrap());
        assert_eq!(set.get(&oref(0)).unwrap(), Some(output(1)));

        let removed = set.remove(&oref(0)).unwrap();
        assert_eq!(removed, output(1));
        assert!(set.is_empty().unwrap());
    }

    #[test]
    fn test_insert_duplicate_fails() {
        let mut set = TestSet::new(MemoryStore::new());
        set.insert(&oref(0), &output(1)).unwrap();
        assert_eq!(
            set.insert(&oref(0), &output(2)),
            Err(StorageError::DuplicateOutput(oref(0)))
        );
        assert_eq!(set.get(&oref(0)).unwrap(), Some(output(1)));
    }

    #[test]
    fn test_remove_missing_fails() {
        let mut set = TestSet::new(MemoryStore::new());
        assert_eq!(set.remove(&oref(3)), Err(StorageError::MissingOutput(oref(3))));
    }

    #[test]
    fn test_commit_is_all_or_nothing() {
        let mut set = TestSet::new(MemoryStore::new());
        set.insert(&oref(0), &output(1)).unwrap();

        // The second consumption is missing: nothing may be applied
        let changes = UtxoChanges {
            consumed: vec![oref(0), oref(1)],
            created: vec![(oref(5), output(5))],
        };
        assert_eq!(set.commit(changes), Err(StorageError::MissingOutput(oref(1))));
        assert!(set.contains(&oref(0)).unwrap());
        assert!(!set.contains(&oref(5)).unwrap());

        let changes = UtxoChanges {
            consumed: vec![oref(0)],
            created: vec![(oref(5), output(5))],
        };
        set.commit(changes).unwrap();
        assert!(!set.contains(&oref(0)).unwrap());
        assert!(set.contains(&oref(5)).unwrap());
    }

    #[test]
    fn test_commit_rejects_double_consumption() {
        let mut set = TestSet::new(MemoryStore::new());
        set.insert(&oref(0), &output(1)).unwrap();
        let changes = UtxoChanges {
            consumed: vec![oref(0), oref(0)],
            created: vec![],
        };
        assert!(set.commit(changes).is_err());
        assert!(set.contains(&oref(0)).unwrap());
    }

    #[test]
    fn test_state_root_tracks_content() {
        let mut a = TestSet::new(MemoryStore::new());
        let mut b = TestSet::new(MemoryStore::new());
        assert_eq!(a.state_root().unwrap(), Hash::ZERO);

        // Insertion order does not matter
        a.insert(&oref(0), &output(0)).unwrap();
        a.insert(&oref(1), &output(1)).unwrap();
        b.insert(&oref(1), &output(1)).unwrap();
        b.insert(&oref(0), &output(0)).unwrap();
        assert_eq!(a.state_root().unwrap(), b.state_root().unwrap());

        b.remove(&oref(1)).unwrap();
        assert_ne!(a.state_root().unwrap(), b.state_root().unwrap());
    }

    #[test]
    fn test_outputs_listing() {
        let mut set = TestSet::new(MemoryStore::new());
        set.insert(&oref(0), &output(0)).unwrap();
        set.insert(&oref(1), &output(1)).unwrap();
        let outputs = set.outputs().unwrap();
        assert_eq!(outputs.len(), 2);
        assert!(outputs.contains(&(oref(1), output(1))));
    }

    #[test]
    fn test_execute_atomic_discards_on_error() {
        let mut set = TestSet::new(MemoryStore::new());
        set.insert(&oref(0), &output(0)).unwrap();

        let result: Result<(), StorageError> = set.execute_atomic(|overlay| {
            overlay.remove(&oref(0))?;
            overlay.insert(&oref(1), &output(1))?;
            overlay.remove(&oref(7))?;
            Ok(())
        });
        assert!(result.is_err());
        assert!(set.contains(&oref(0)).unwrap());
        assert!(!set.contains(&oref(1)).unwrap());

        let result: Result<(), StorageError> = set.execute_atomic(|overlay| {
            overlay.remove(&oref(0))?;
            overlay.insert(&oref(1), &output(1))?;
            Ok(())
        });
        assert!(result.is_ok());
        assert!(!set.contains(&oref(0)).unwrap());
        assert!(set.contains(&oref(1)).unwrap());
    }
}
