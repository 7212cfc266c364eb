// Block Producer - Production et import des blocs
//
// Production: open block -> inherents from the author's data and the parent
// block -> ready pool transactions (failures skipped) -> close -> persist.
// Everything runs on an overlay of the store; the UTXO changes and the block
// record go out in one batch, and nothing is written unless the whole block
// was built.

use crate::constraint_checker::ConstraintChecker;
use crate::executive::{Executive, ExecutiveError};
use crate::genesis::{GenesisBuilder, GenesisConfig, GenesisError};
use crate::inherents::InherentData;
use crate::node::mempool::TransactionPool;
use crate::storage::{ChainStore, KeyValueStore, StorageError, UtxoSet};
use crate::types::{Block, BlockNumber, Header};
use crate::verifier::Verifier;
use tracing::{debug, info, warn};

/// Block production configuration
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Maximum ordinary transactions per block
    pub max_transactions_per_block: usize,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            max_transactions_per_block: 1000,
        }
    }
}

/// Block production errors
#[derive(Debug, thiserror::Error)]
pub enum ProductionError<E> {
    #[error("Chain not initialized: no genesis block")]
    NotInitialized,

    #[error("Block #{got} does not extend best block #{best}")]
    NotNextBlock { best: BlockNumber, got: BlockNumber },

    #[error("Parent hash does not match best block")]
    WrongParent,

    #[error("Inherent check failed: {0}")]
    InherentCheckFailed(String),

    #[error("Executive error: {0}")]
    Executive(#[from] ExecutiveError<E>),

    #[error("Genesis error: {0}")]
    Genesis(#[from] GenesisError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Builds blocks on top of the best block and imports foreign ones
pub struct BlockProducer<S, V, C> {
    config: ProducerConfig,
    /// Holds the UTXO set and the block store side by side
    set: UtxoSet<S, V>,
    executive: Executive<V, C>,
    best: Option<Block<V, C>>,
}

impl<S, V, C> BlockProducer<S, V, C>
where
    S: KeyValueStore + Clone,
    V: Verifier,
    C: ConstraintChecker<V>,
{
    /// `store` backs both the UTXO set and the block store
    pub fn new(store: S, config: ProducerConfig) -> Self {
        Self {
            config,
            set: UtxoSet::new(store),
            executive: Executive::new(),
            best: None,
        }
    }

    /// Loads the best block, or writes the genesis block if the store is empty
    pub fn initialize(&mut self, genesis: GenesisConfig<V, C>) -> Result<&Block<V, C>, ProductionError<C::Error>> {
        let chain = self.chain();
        let best = match chain.get_best_block()? {
            Some(number) => {
                let block = chain
                    .get_block_by_number(number)?
                    .ok_or(ProductionError::NotInitialized)?;
                info!("📂 Resuming chain at block #{}", number);
                block
            }
            None => {
                let builder = GenesisBuilder::new(genesis);
                let block = self
                    .set
                    .execute_atomic(|overlay| -> Result<Block<V, C>, ProductionError<C::Error>> {
                        let block = builder.build(overlay)?;
                        overlay.store_mut().write_batch(ChainStore::<S>::block_ops(&block))?;
                        Ok(block)
                    })?;
                info!("🌱 Genesis block stored: {}", block.hash());
                block
            }
        };
        Ok(self.best.insert(best))
    }

    pub fn best_block(&self) -> Option<&Block<V, C>> {
        self.best.as_ref()
    }

    pub fn utxo_set(&self) -> &UtxoSet<S, V> {
        &self.set
    }

    /// Block store over a clone of the producer's store
    pub fn chain(&self) -> ChainStore<S> {
        ChainStore::new(self.set.store().clone())
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    /// Height of the next block
    pub fn next_height(&self) -> Option<BlockNumber> {
        self.best.as_ref().map(|b| b.header.number + 1)
    }

    /// Builds, applies and persists the next block
    pub fn produce_block(
        &mut self,
        pool: &mut TransactionPool<V, C>,
        inherent_data: &InherentData,
    ) -> Result<Block<V, C>, ProductionError<C::Error>> {
        let parent = self.best.as_ref().ok_or(ProductionError::NotInitialized)?;
        let number = parent.header.number + 1;
        let parent_hash = parent.hash();

        let inherents = Executive::<V, C>::create_inherents(inherent_data, Some(parent), number)?;
        let max_transactions = self.config.max_transactions_per_block;

        let executive = &mut self.executive;
        let (block, skipped) = self.set.execute_atomic(
            |overlay| -> Result<(Block<V, C>, usize), ExecutiveError<C::Error>> {
                executive.open_block(Header::new(parent_hash, number))?;

                let mut extrinsics = Vec::with_capacity(inherents.len());
                for inherent in inherents {
                    if let Err(e) = executive.apply_extrinsic(overlay, inherent.clone()) {
                        // Un inherent invalide rend le bloc impossible
                        let _ = executive.close_block(overlay);
                        return Err(e);
                    }
                    extrinsics.push(inherent);
                }

                let mut skipped = 0;
                for tx in pool.select_transactions(overlay, number, max_transactions) {
                    match executive.apply_extrinsic(overlay, tx.clone()) {
                        Ok(_) => extrinsics.push(tx),
                        Err(e) => {
                            skipped += 1;
                            debug!("Skipping transaction {}: {}", tx.hash(), e);
                        }
                    }
                }

                let header = executive.close_block(overlay)?;
                let block = Block::new(header, extrinsics);
                overlay.store_mut().write_batch(ChainStore::<S>::block_ops(&block))?;
                Ok((block, skipped))
            },
        )?;

        if skipped > 0 {
            warn!("⚠️ {} transactions failed execution", skipped);
        }
        info!(
            "🔨 Produced block #{} ({}) with {} extrinsics",
            number,
            block.hash(),
            block.extrinsics.len()
        );

        pool.remove_included(&block.extrinsics);
        pool.prune(&self.set, number + 1);
        self.best = Some(block.clone());
        Ok(block)
    }

    /// Checks and executes a block built elsewhere, then makes it the best block
    pub fn import_block(
        &mut self,
        block: Block<V, C>,
        inherent_data: &InherentData,
        pool: Option<&mut TransactionPool<V, C>>,
    ) -> Result<(), ProductionError<C::Error>> {
        let best = self.best.as_ref().ok_or(ProductionError::NotInitialized)?;
        if block.header.number != best.header.number + 1 {
            return Err(ProductionError::NotNextBlock {
                best: best.header.number,
                got: block.header.number,
            });
        }
        if block.header.parent_hash != best.hash() {
            return Err(ProductionError::WrongParent);
        }

        let checks = Executive::<V, C>::check_inherents(&block, inherent_data);
        if checks.fatal_error() {
            let reasons: Vec<String> = checks
                .errors()
                .map(|(id, e)| format!("{}: {}", String::from_utf8_lossy(id), e))
                .collect();
            return Err(ProductionError::InherentCheckFailed(reasons.join(", ")));
        }

        let executive = &mut self.executive;
        self.set
            .execute_atomic(|overlay| -> Result<(), ProductionError<C::Error>> {
                executive.execute_block(overlay, &block)?;
                overlay.store_mut().write_batch(ChainStore::<S>::block_ops(&block))?;
                Ok(())
            })?;
        info!("📥 Imported block #{} ({})", block.header.number, block.hash());

        if let Some(pool) = pool {
            pool.remove_included(&block.extrinsics);
            pool.prune(&self.set, block.header.number + 1);
        }
        self.best = Some(block);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::genesis_tx_hash;
    use crate::pieces::money::{Coin, MoneyConstraintChecker};
    use crate::pieces::timestamp::{BestTimestamp, TIMESTAMP_INHERENT_IDENTIFIER};
    use crate::runtime::{development_genesis_config, OuterConstraintChecker, OuterVerifier, FAUCET_AMOUNT};
    use crate::storage::{Database, MemoryStore};
    use crate::storage::blocks::PREFIX_BLOCK_BY_HASH;
    use crate::storage::{DatabaseError, WriteOp};
    use crate::types::{Input, Output, OutputRef, Transaction};
    use crate::verifier::UpForGrabs;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    type DevProducer<S> = BlockProducer<S, OuterVerifier, OuterConstraintChecker>;
    type DevPool = TransactionPool<OuterVerifier, OuterConstraintChecker>;

    fn timestamp(now: u64) -> InherentData {
        let mut data = InherentData::new();
        data.put_data(TIMESTAMP_INHERENT_IDENTIFIER, &now).unwrap();
        data
    }

    fn faucet_spend(out: u128) -> Transaction<OuterVerifier, OuterConstraintChecker> {
        Transaction {
            inputs: vec![Input::unsigned(OutputRef::new(genesis_tx_hash(), 2))],
            peeks: vec![],
            outputs: vec![Output::new(Coin::<0>::new(out), UpForGrabs)],
            checker: MoneyConstraintChecker::<0>::Spend.into(),
        }
    }

    #[test]
    fn test_produce_blocks_with_pool() {
        let mut producer = DevProducer::new(MemoryStore::new(), ProducerConfig::default());
        producer.initialize(development_genesis_config()).unwrap();
        assert_eq!(producer.next_height(), Some(1));

        let mut pool = DevPool::new(100);
        let tx = faucet_spend(FAUCET_AMOUNT - 1);
        pool.submit(producer.utxo_set(), tx.clone(), 1).unwrap();

        let block1 = producer.produce_block(&mut pool, &timestamp(10_000)).unwrap();
        assert_eq!(block1.header.number, 1);
        // Timestamp inherent first, then the spend
        assert_eq!(block1.extrinsics.len(), 2);
        assert!(block1.extrinsics[0].outputs[0].payload.is::<BestTimestamp>());
        assert_eq!(block1.extrinsics[1], tx);
        assert!(pool.is_empty());
        assert!(producer.utxo_set().contains(&tx.output_ref(0)).unwrap());

        let block2 = producer.produce_block(&mut pool, &timestamp(13_000)).unwrap();
        assert_eq!(block2.header.parent_hash, block1.hash());
        assert_eq!(producer.chain().get_best_block().unwrap(), Some(2));
    }

    /// Memory store whose next batch touching a block record fails once
    #[derive(Clone, Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_block_write: Arc<AtomicBool>,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
            self.inner.get(key)
        }

        fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
            self.inner.put(key, value)
        }

        fn delete(&mut self, key: &[u8]) -> Result<(), StorageError> {
            self.inner.delete(key)
        }

        fn write_batch(&mut self, ops: Vec<WriteOp>) -> Result<(), StorageError> {
            let touches_block = ops
                .iter()
                .any(|op| matches!(op, WriteOp::Put { key, .. } if key.starts_with(PREFIX_BLOCK_BY_HASH)));
            if touches_block && self.fail_block_write.swap(false, Ordering::SeqCst) {
                return Err(DatabaseError::WriteFailed("disk full".to_string()).into());
            }
            self.inner.write_batch(ops)
        }

        fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
            self.inner.iter_prefix(prefix)
        }

        fn exists(&self, key: &[u8]) -> Result<bool, StorageError> {
            self.inner.exists(key)
        }
    }

    #[test]
    fn test_failed_block_write_leaves_set_and_best_block() {
        let store = FlakyStore::default();
        let fail = store.fail_block_write.clone();
        let mut producer = DevProducer::new(store, ProducerConfig::default());
        producer.initialize(development_genesis_config()).unwrap();
        let mut pool = DevPool::new(100);
        producer.produce_block(&mut pool, &timestamp(10_000)).unwrap();

        let tx = faucet_spend(FAUCET_AMOUNT - 1);
        pool.submit(producer.utxo_set(), tx.clone(), 2).unwrap();
        let root = producer.utxo_set().state_root().unwrap();

        fail.store(true, Ordering::SeqCst);
        assert!(matches!(
            producer.produce_block(&mut pool, &timestamp(13_000)),
            Err(ProductionError::Executive(ExecutiveError::Storage(StorageError::Database(_))))
        ));
        assert_eq!(producer.utxo_set().state_root().unwrap(), root);
        assert_eq!(producer.next_height(), Some(2));
        assert_eq!(producer.chain().get_best_block().unwrap(), Some(1));
        assert!(pool.contains(&tx.hash()));

        // Le disque revient: le même bloc passe
        let block2 = producer.produce_block(&mut pool, &timestamp(13_000)).unwrap();
        assert_eq!(block2.header.number, 2);
        assert!(block2.extrinsics.contains(&tx));
        assert_eq!(producer.chain().get_best_block().unwrap(), Some(2));
        assert!(producer.utxo_set().contains(&tx.output_ref(0)).unwrap());
    }

    #[test]
    fn test_failed_import_write_leaves_follower() {
        let mut author = DevProducer::new(FlakyStore::default(), ProducerConfig::default());
        let store = FlakyStore::default();
        let fail = store.fail_block_write.clone();
        let mut follower = DevProducer::new(store, ProducerConfig::default());
        author.initialize(development_genesis_config()).unwrap();
        follower.initialize(development_genesis_config()).unwrap();

        let mut pool = DevPool::new(100);
        let block = author.produce_block(&mut pool, &timestamp(10_000)).unwrap();
        let root = follower.utxo_set().state_root().unwrap();

        fail.store(true, Ordering::SeqCst);
        assert!(matches!(
            follower.import_block(block.clone(), &timestamp(10_500), None),
            Err(ProductionError::Storage(StorageError::Database(_)))
        ));
        assert_eq!(follower.utxo_set().state_root().unwrap(), root);
        assert_eq!(follower.chain().get_best_block().unwrap(), Some(0));

        follower.import_block(block, &timestamp(10_500), None).unwrap();
        assert_eq!(
            follower.utxo_set().state_root().unwrap(),
            author.utxo_set().state_root().unwrap()
        );
    }

    #[test]
    fn test_bad_inherent_data_writes_nothing() {
        let mut producer = DevProducer::new(MemoryStore::new(), ProducerConfig::default());
        producer.initialize(development_genesis_config()).unwrap();
        let mut pool = DevPool::new(100);
        let before = producer.utxo_set().state_root().unwrap();

        // No timestamp at all
        assert!(matches!(
            producer.produce_block(&mut pool, &InherentData::new()),
            Err(ProductionError::Executive(ExecutiveError::Inherent(_)))
        ));
        assert_eq!(producer.utxo_set().state_root().unwrap(), before);
        assert_eq!(producer.next_height(), Some(1));
    }

    #[test]
    fn test_import_block_from_other_node() {
        let mut author = DevProducer::new(MemoryStore::new(), ProducerConfig::default());
        let mut follower = DevProducer::new(MemoryStore::new(), ProducerConfig::default());
        author.initialize(development_genesis_config()).unwrap();
        follower.initialize(development_genesis_config()).unwrap();

        let mut pool = DevPool::new(100);
        pool.submit(author.utxo_set(), faucet_spend(5), 1).unwrap();
        let block = author.produce_block(&mut pool, &timestamp(10_000)).unwrap();

        follower.import_block(block.clone(), &timestamp(10_500), None).unwrap();
        assert_eq!(
            follower.utxo_set().state_root().unwrap(),
            author.utxo_set().state_root().unwrap()
        );

        // Importing it twice is not extending the chain
        assert!(matches!(
            follower.import_block(block, &timestamp(10_500), None),
            Err(ProductionError::NotNextBlock { best: 1, got: 1 })
        ));
    }

    #[test]
    fn test_import_rejects_future_timestamp() {
        let mut author = DevProducer::new(MemoryStore::new(), ProducerConfig::default());
        let mut follower = DevProducer::new(MemoryStore::new(), ProducerConfig::default());
        author.initialize(development_genesis_config()).unwrap();
        follower.initialize(development_genesis_config()).unwrap();

        let mut pool = DevPool::new(100);
        let block = author.produce_block(&mut pool, &timestamp(1_000_000)).unwrap();
        assert!(matches!(
            follower.import_block(block, &timestamp(1_000), None),
            Err(ProductionError::InherentCheckFailed(_))
        ));
    }

    #[test]
    fn test_resume_from_database() {
        let dir = tempfile::tempdir().unwrap();
        let best_hash = {
            let db = Database::open(dir.path()).unwrap();
            let mut producer = DevProducer::new(db, ProducerConfig::default());
            producer.initialize(development_genesis_config()).unwrap();
            let mut pool = DevPool::new(100);
            producer.produce_block(&mut pool, &timestamp(10_000)).unwrap().hash()
        };

        let db = Database::open(dir.path()).unwrap();
        let mut producer = DevProducer::new(db, ProducerConfig::default());
        let best = producer.initialize(development_genesis_config()).unwrap();
        assert_eq!(best.hash(), best_hash);
        assert_eq!(producer.next_height(), Some(2));
    }
}
