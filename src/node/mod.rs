// Node - Pool de transactions et production de blocs
pub mod mempool;
pub mod producer;

pub use mempool::{MempoolConfig, PoolError, PoolStats, TransactionPool};
pub use producer::{BlockProducer, ProducerConfig, ProductionError};
