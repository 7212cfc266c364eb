// CLI Configuration - Convert CLI args to node config
use crate::cli::RunCmd;
use crate::genesis::ChainConfig;
use std::path::PathBuf;
use tracing::info;

/// Complete node configuration derived from CLI arguments
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Chain configuration
    pub chain: ChainConfig,
    /// Base data path
    pub base_path: PathBuf,
    /// In-memory chain, nothing persisted
    pub in_memory: bool,
    /// Stop after this many produced blocks
    pub max_blocks: Option<u32>,
}

impl NodeConfig {
    /// Create configuration from CLI run command
    pub fn from_run_cmd(cmd: &RunCmd) -> Result<Self, ConfigError> {
        let mut chain = match cmd.chain.as_str() {
            "dev" => ChainConfig::development(),
            path => Self::load_chain_config(path)?,
        };

        if let Some(block_time) = cmd.block_time_ms {
            info!("⏱️  Block time override: {} ms", block_time);
            chain.block_time_ms = block_time;
        }
        chain.validate()?;

        Ok(Self {
            chain,
            base_path: cmd.get_base_path(),
            in_memory: cmd.tmp,
            max_blocks: cmd.max_blocks,
        })
    }

    /// Load chain config from file
    fn load_chain_config(path: &str) -> Result<ChainConfig, ConfigError> {
        if !std::path::Path::new(path).exists() {
            return Err(ConfigError::ChainConfigNotFound(path.to_string()));
        }
        ChainConfig::from_file(path).map_err(|e| ConfigError::ChainConfigRead(e.to_string()))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Chain config not found: {0}")]
    ChainConfigNotFound(String),

    #[error("Failed to read chain config: {0}")]
    ChainConfigRead(String),

    #[error("Invalid chain config: {0}")]
    Invalid(#[from] crate::genesis::ConfigError),
}
