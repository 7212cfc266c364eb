// Node Runner - Boucle de production de la chaîne de développement
use crate::cli::config::NodeConfig;
use crate::genesis::GenesisBuilder;
use crate::inherents::InherentData;
use crate::node::{BlockProducer, ProducerConfig, TransactionPool};
use crate::pieces::timestamp::TIMESTAMP_INHERENT_IDENTIFIER;
use crate::runtime::{development_genesis_config, Block, OuterConstraintChecker, OuterVerifier};
use crate::storage::{Database, KeyValueStore, MemoryStore, UtxoSet};
use tokio::signal;
use tracing::{error, info, warn};

type DevProducer<S> = BlockProducer<S, OuterVerifier, OuterConstraintChecker>;
type DevPool = TransactionPool<OuterVerifier, OuterConstraintChecker>;

/// Run the dev chain until Ctrl+C or `max_blocks`
pub async fn run_node(config: NodeConfig) -> Result<(), RunnerError> {
    info!("🚀 Starting KratOs UTXO node");
    info!("⛓️  Chain: {}", config.chain.chain_name);

    let producer_config = ProducerConfig {
        max_transactions_per_block: config.chain.max_block_extrinsics,
    };

    if config.in_memory {
        info!("🧪 In-memory chain, nothing will be persisted");
        let producer = DevProducer::new(MemoryStore::new(), producer_config);
        run_chain(producer, &config).await
    } else {
        info!("📁 Data path: {}", config.base_path.display());
        std::fs::create_dir_all(&config.base_path)
            .map_err(|e| RunnerError::Io(format!("Failed to create data dir: {}", e)))?;
        let db = Database::open(config.base_path.join("db"))
            .map_err(|e| RunnerError::Storage(e.to_string()))?;
        let producer = DevProducer::new(db, producer_config);
        run_chain(producer, &config).await
    }
}

async fn run_chain<S>(mut producer: DevProducer<S>, config: &NodeConfig) -> Result<(), RunnerError>
where
    S: KeyValueStore + Clone,
{
    let genesis = producer
        .initialize(development_genesis_config())
        .map_err(|e| RunnerError::Production(e.to_string()))?;
    info!("🔗 Genesis: {}", genesis.hash());

    let mut pool = DevPool::with_config(config.chain.mempool.clone());
    let mut block_interval =
        tokio::time::interval(std::time::Duration::from_millis(config.chain.block_time_ms));
    let mut stats_interval = tokio::time::interval(std::time::Duration::from_secs(60));
    // Le premier tick est immédiat
    block_interval.tick().await;
    stats_interval.tick().await;

    let mut produced: u32 = 0;
    info!("✅ Node started, block time {} ms", config.chain.block_time_ms);

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("\n⚠️  Ctrl+C received, shutting down...");
                break;
            }

            _ = block_interval.tick() => {
                let inherent_data = current_inherent_data()?;
                match producer.produce_block(&mut pool, &inherent_data) {
                    Ok(_) => produced += 1,
                    Err(e) => warn!("⚠️ Block production failed: {}", e),
                }

                if config.max_blocks.is_some_and(|max| produced >= max) {
                    info!("🏁 Produced {} blocks, stopping", produced);
                    break;
                }
            }

            _ = stats_interval.tick() => {
                log_stats(&producer, &pool);
            }
        }
    }

    log_stats(&producer, &pool);
    info!("👋 Node stopped cleanly");
    Ok(())
}

/// Wall clock for the timestamp inherent
fn current_inherent_data() -> Result<InherentData, RunnerError> {
    let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let mut data = InherentData::new();
    data.put_data(TIMESTAMP_INHERENT_IDENTIFIER, &now)
        .map_err(|e| RunnerError::Production(e.to_string()))?;
    Ok(data)
}

fn log_stats<S: KeyValueStore + Clone>(producer: &DevProducer<S>, pool: &DevPool) {
    let height = producer.best_block().map(|b| b.header.number).unwrap_or(0);
    let utxos = match producer.utxo_set().len() {
        Ok(n) => n,
        Err(e) => {
            error!("Failed to count UTXOs: {}", e);
            return;
        }
    };
    let stats = pool.stats();

    info!(
        "📊 Block #{} | UTXOs: {} | Pool: {} (added {}, rejected {}, evicted {})",
        height,
        utxos,
        pool.len(),
        stats.total_added,
        stats.total_rejected,
        stats.total_evicted
    );
}

/// Builds the dev genesis block in memory
pub fn genesis_block() -> Result<Block, RunnerError> {
    let mut set = UtxoSet::<MemoryStore, OuterVerifier>::new(MemoryStore::new());
    GenesisBuilder::new(development_genesis_config())
        .build(&mut set)
        .map_err(|e| RunnerError::Production(e.to_string()))
}

/// Runner errors
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Block production error: {0}")]
    Production(String),
}
