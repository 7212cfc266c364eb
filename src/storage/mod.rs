// Storage - Couche de persistance (key/value abstrait, RocksDB, UTXO set)
// Principe: Auditabilité, Reproductibilité, Atomicité

pub mod blocks;
pub mod db;
pub mod kv;
pub mod memory;
pub mod overlay;
pub mod utxo_set;

pub use blocks::ChainStore;
pub use db::{Database, DatabaseError};
pub use kv::{KeyValueStore, StorageError, WriteOp};
pub use memory::MemoryStore;
pub use overlay::OverlayStore;
pub use utxo_set::{UtxoChanges, UtxoSet, PREFIX_UTXO};
