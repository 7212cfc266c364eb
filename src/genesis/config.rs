// Configuration de la chaîne - Paramètres de production et du pool
use crate::node::mempool::MempoolConfig;
use serde::{Deserialize, Serialize};

/// Erreurs de configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Block time must be at least {min} ms, got {got}")]
    BlockTimeTooShort { min: u64, got: u64 },

    #[error("max_block_extrinsics must be non-zero")]
    NoExtrinsicsAllowed,

    #[error("Pool size must be non-zero")]
    EmptyPool,
}

/// Minimum block time; the timestamp inherent refuses faster blocks
pub const MIN_BLOCK_TIME_MS: u64 = crate::pieces::timestamp::MINIMUM_TIME_INTERVAL;

/// Configuration de la chaîne
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Nom de la chaîne
    pub chain_name: String,

    /// Temps cible entre deux blocs (ms)
    pub block_time_ms: u64,

    /// Nombre maximum d'extrinsics ordinaires par bloc
    pub max_block_extrinsics: usize,

    /// Configuration du pool de transactions
    pub mempool: MempoolConfig,
}

impl ChainConfig {
    /// Chaîne de développement locale
    pub fn development() -> Self {
        Self {
            chain_name: "kratos-utxo-dev".to_string(),
            block_time_ms: 3_000,
            max_block_extrinsics: 1_000,
            mempool: MempoolConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_time_ms < MIN_BLOCK_TIME_MS {
            return Err(ConfigError::BlockTimeTooShort {
                min: MIN_BLOCK_TIME_MS,
                got: self.block_time_ms,
            });
        }
        if self.max_block_extrinsics == 0 {
            return Err(ConfigError::NoExtrinsicsAllowed);
        }
        if self.mempool.max_size == 0 {
            return Err(ConfigError::EmptyPool);
        }
        Ok(())
    }

    /// Charge depuis un fichier JSON
    pub fn from_file(path: &str) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Sauvegarde vers un fichier JSON
    pub fn to_file(&self, path: &str) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::development()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChainConfig::default();
        assert_eq!(config.chain_name, "kratos-utxo-dev");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_fast_blocks() {
        let mut config = ChainConfig::development();
        config.block_time_ms = 10;
        assert_eq!(
            config.validate(),
            Err(ConfigError::BlockTimeTooShort {
                min: MIN_BLOCK_TIME_MS,
                got: 10
            })
        );

        config.block_time_ms = 1_000;
        config.max_block_extrinsics = 0;
        assert_eq!(config.validate(), Err(ConfigError::NoExtrinsicsAllowed));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        let path = path.to_str().unwrap();

        let mut config = ChainConfig::development();
        config.block_time_ms = 6_000;
        config.to_file(path).unwrap();
        assert_eq!(ChainConfig::from_file(path).unwrap(), config);
    }

    #[test]
    fn test_from_file_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = ChainConfig::from_file(path.to_str().unwrap()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
