// Genesis - Configuration et bloc genesis
pub mod builder;
pub mod config;

pub use builder::{genesis_tx_hash, GenesisBuilder, GenesisConfig, GenesisError};
pub use config::{ChainConfig, ConfigError};
