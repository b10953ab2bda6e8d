mod cli;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use output::print_error;
use sealgrant_auth::{AesGcmSealer, SealerKey, TokenCodec};

fn main() {
    let cli = Cli::parse();
    init_tracing(if cli.verbose { "debug" } else { "warn" });

    if let Err(e) = run(&cli) {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Keygen(args) => commands::keygen::keygen(args),
        Commands::Inspect(args) => commands::inspect::run(&codec(cli)?, args),
        Commands::MintCode(args) => commands::mint::run(&codec(cli)?, args),
        Commands::CheckConfig(args) => commands::config::run(args),
    }
}

fn codec(cli: &Cli) -> Result<TokenCodec> {
    let key = SealerKey::from_env(&cli.key_env)
        .with_context(|| format!("Failed to load sealer key from {}", cli.key_env))?;
    let sealer = AesGcmSealer::new(cli.key_id.clone(), &key)?;
    Ok(TokenCodec::new(std::sync::Arc::new(sealer)))
}

fn init_tracing(level: &str) {
    // RUST_LOG wins over the verbosity flag
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
