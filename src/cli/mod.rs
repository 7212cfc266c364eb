// CLI - Interface en ligne de commande du nœud UTXO
// Principle: Simple, clear, composable commands

pub mod config;
pub mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// KratOs UTXO - Development node for the UTXO ledger engine
#[derive(Parser, Debug)]
#[command(name = "kratos-utxo")]
#[command(author = "KratOs Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "KratOs UTXO node - verifiers, constraint checkers and pieces")]
#[command(long_about = r#"
KratOs UTXO runs a development chain of the UTXO ledger engine.

Start a dev chain with persistent storage:
  kratos-utxo run

Start a throwaway chain in memory, stop after 10 blocks:
  kratos-utxo run --tmp --max-blocks 10

Print the genesis block of the dev chain:
  kratos-utxo genesis --format json
"#)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true, default_value = "false")]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", env = "KRATOS_UTXO_LOG")]
    pub log_level: String,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the development chain
    Run(RunCmd),

    /// Print the genesis block
    Genesis(GenesisCmd),

    /// Key management
    Key(KeyCmd),
}

/// Run the node
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Base path for chain data
    #[arg(short = 'd', long, env = "KRATOS_UTXO_BASE_PATH")]
    pub base_path: Option<PathBuf>,

    /// Chain configuration ("dev" or path to a JSON chain config)
    #[arg(long, default_value = "dev")]
    pub chain: String,

    /// Keep the chain in memory, nothing is written to disk
    #[arg(long)]
    pub tmp: bool,

    /// Stop after producing this many blocks
    #[arg(long)]
    pub max_blocks: Option<u32>,

    /// Override the block time of the chain config (ms)
    #[arg(long)]
    pub block_time_ms: Option<u64>,
}

/// Print the genesis block
#[derive(Parser, Debug)]
pub struct GenesisCmd {
    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub format: String,
}

/// Key management commands
#[derive(Parser, Debug)]
pub struct KeyCmd {
    #[command(subcommand)]
    pub subcommand: KeySubcommand,
}

#[derive(Subcommand, Debug)]
pub enum KeySubcommand {
    /// Generate a new keypair
    Generate {
        /// Key type (ed25519, sr25519)
        #[arg(long, default_value = "ed25519")]
        scheme: String,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (hex, json)
        #[arg(long, default_value = "json")]
        format: String,
    },
}

impl RunCmd {
    /// Get the base path, defaulting to platform-specific data directory
    pub fn get_base_path(&self) -> PathBuf {
        if let Some(ref path) = self.base_path {
            path.clone()
        } else {
            let data_dir = dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("kratos-utxo");

            data_dir.join("chains").join(&self.chain)
        }
    }
}
