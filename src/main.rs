// KratOs UTXO - Entry point
use clap::Parser;
use kratos_utxo::cli::config::NodeConfig;
use kratos_utxo::cli::runner::{genesis_block, run_node};
use kratos_utxo::cli::{Cli, Commands, KeySubcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_filter = if cli.verbose { "debug" } else { &cli.log_level };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter)),
        )
        .init();

    print_banner();

    match cli.command {
        Commands::Run(cmd) => {
            let config = NodeConfig::from_run_cmd(&cmd).map_err(|e| {
                error!("Configuration error: {}", e);
                anyhow::anyhow!("Configuration error: {}", e)
            })?;

            if let Err(e) = run_node(config).await {
                error!("Node error: {}", e);
                return Err(anyhow::anyhow!("Node error: {}", e));
            }
        }

        Commands::Genesis(cmd) => {
            let block = genesis_block()?;
            let header = &block.header;
            match cmd.format.as_str() {
                "json" => {
                    let json = serde_json::json!({
                        "hash": format!("0x{}", block.hash().to_hex()),
                        "number": header.number,
                        "parentHash": format!("0x{}", header.parent_hash.to_hex()),
                        "stateRoot": format!("0x{}", header.state_root.to_hex()),
                        "extrinsicsRoot": format!("0x{}", header.extrinsics_root.to_hex()),
                        "extrinsics": block.extrinsics.len(),
                    });
                    println!("{}", serde_json::to_string_pretty(&json)?);
                }
                "text" => {
                    println!("Genesis hash:     0x{}", block.hash().to_hex());
                    println!("State root:       0x{}", header.state_root.to_hex());
                    println!("Extrinsics root:  0x{}", header.extrinsics_root.to_hex());
                    println!("Extrinsics:       {}", block.extrinsics.len());
                }
                other => return Err(anyhow::anyhow!("Unknown format: {}", other)),
            }
        }

        Commands::Key(cmd) => match cmd.subcommand {
            KeySubcommand::Generate { scheme, output, format } => {
                generate_key(&scheme, output.as_ref(), &format)?;
            }
        },
    }

    info!("Goodbye!");
    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ╔═══════════════════════════════════════════╗
    ║                                           ║
    ║          K R A T O S   ·   U T X O        ║
    ║                                           ║
    ║     Verifiers • Checkers • Pieces         ║
    ║                                           ║
    ╚═══════════════════════════════════════════╝
    "#
    );
    println!("    Version: {}", env!("CARGO_PKG_VERSION"));
    println!();
}

/// Generate a new keypair
fn generate_key(scheme: &str, output: Option<&std::path::PathBuf>, format: &str) -> anyhow::Result<()> {
    info!("Generating {} keypair", scheme);

    let (secret_hex, public_hex) = match scheme {
        "ed25519" => {
            use ed25519_dalek::SigningKey;
            use rand::rngs::OsRng;

            let signing_key = SigningKey::generate(&mut OsRng);
            (
                hex::encode(signing_key.to_bytes()),
                hex::encode(signing_key.verifying_key().to_bytes()),
            )
        }
        "sr25519" => {
            use schnorrkel::{ExpansionMode, MiniSecretKey};

            let mini_secret = MiniSecretKey::generate();
            let keypair = mini_secret.expand_to_keypair(ExpansionMode::Ed25519);
            (
                hex::encode(mini_secret.as_bytes()),
                hex::encode(keypair.public.to_bytes()),
            )
        }
        _ => return Err(anyhow::anyhow!("Unknown key scheme: {}", scheme)),
    };

    match format {
        "json" => {
            let json = serde_json::json!({
                "scheme": scheme,
                "secretKey": format!("0x{}", secret_hex),
                "publicKey": format!("0x{}", public_hex),
            });
            let output_str = serde_json::to_string_pretty(&json)?;

            if let Some(path) = output {
                std::fs::write(path, &output_str)?;
                info!("Key saved to: {}", path.display());
            } else {
                println!("{}", output_str);
            }
        }
        "hex" => {
            println!("Secret Key: 0x{}", secret_hex);
            println!("Public Key: 0x{}", public_hex);
        }
        _ => return Err(anyhow::anyhow!("Unknown format: {}", format)),
    }

    Ok(())
}
