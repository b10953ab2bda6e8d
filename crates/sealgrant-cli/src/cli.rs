use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "sealgrant")]
#[command(about = "Sealgrant CLI: mint and inspect sealed OAuth grant tokens")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Environment variable holding the sealer key (hex or base64)
    #[arg(long, global = true, default_value = "SEALGRANT_KEY")]
    pub key_env: String,

    /// Identifier of the sealer key, stored in every token header
    #[arg(long, global = true, env = "SEALGRANT_KEY_ID", default_value = "default")]
    pub key_id: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print a fresh 32-byte sealer key
    Keygen(KeygenArgs),
    /// Unseal a token and print its claims
    Inspect(InspectArgs),
    /// Issue an authorization code for testing
    MintCode(MintCodeArgs),
    /// Parse and validate a TOML grants configuration
    CheckConfig(CheckConfigArgs),
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum KeyFormat {
    #[default]
    Hex,
    Base64,
}

#[derive(clap::Args)]
pub struct KeygenArgs {
    /// Key encoding
    #[arg(long, default_value = "hex")]
    pub format: KeyFormat,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum TokenKind {
    Code,
    Access,
    Refresh,
}

#[derive(clap::Args)]
pub struct InspectArgs {
    /// The sealed token
    pub token: String,
    /// Expected token type (tries all types if omitted)
    #[arg(long = "type")]
    pub kind: Option<TokenKind>,
}

#[derive(clap::Args)]
pub struct MintCodeArgs {
    /// Client the code is bound to
    #[arg(long)]
    pub client_id: String,
    /// Subject identifier of the end user
    #[arg(long)]
    pub subject: String,
    /// Space-delimited scope
    #[arg(long, default_value = "openid")]
    pub scope: String,
    /// Redirect URI bound into the code
    #[arg(long)]
    pub redirect_uri: Option<String>,
    /// PKCE code challenge
    #[arg(long)]
    pub code_challenge: Option<String>,
    /// PKCE code challenge method (S256 or plain)
    #[arg(long, requires = "code_challenge")]
    pub code_challenge_method: Option<String>,
    /// Grants configuration supplying issuer and code lifetime
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct CheckConfigArgs {
    /// Path to the TOML file
    pub file: PathBuf,
}
