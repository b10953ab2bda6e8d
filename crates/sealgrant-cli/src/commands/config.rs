use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use sealgrant_auth::GrantsConfig;

use crate::cli::CheckConfigArgs;
use crate::output::{print_field, print_success};

pub fn run(args: &CheckConfigArgs) -> Result<()> {
    let config = load(&args.file)?;
    let lifetimes = &config.lifetimes;

    print_success(&format!("{} is valid", args.file.display()));
    print_field("Issuer", &config.issuer);
    print_field(
        "Lifetimes",
        format!(
            "code {}s, access {}s, refresh {}s",
            lifetimes.authorization_code.as_secs(),
            lifetimes.access_token.as_secs(),
            lifetimes.refresh_token.as_secs()
        ),
    );
    print_field(
        "PKCE",
        format!(
            "force={} allow_plain={}",
            config.pkce.force, config.pkce.allow_plain
        ),
    );
    print_field(
        "Refresh tokens",
        if config.refresh.require_offline_access {
            "only with offline_access"
        } else {
            "always"
        },
    );
    print_field(
        "Revoke lineage on replay",
        config.replay.revoke_lineage_on_replay,
    );
    print_field(
        "Sealer key",
        format!("{} (id {})", config.sealer.key_env, config.sealer.key_id),
    );
    Ok(())
}

pub fn load(path: &Path) -> Result<GrantsConfig> {
    let input =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    GrantsConfig::from_toml_str(&input)
        .with_context(|| format!("Invalid configuration in {}", path.display()))
}
