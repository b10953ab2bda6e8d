use anyhow::Result;

use sealgrant_auth::SealerKey;

use crate::cli::{KeyFormat, KeygenArgs};

pub fn keygen(args: &KeygenArgs) -> Result<()> {
    println!("{}", encode(&SealerKey::generate(), args.format));
    Ok(())
}

fn encode(key: &SealerKey, format: KeyFormat) -> String {
    match format {
        KeyFormat::Hex => key.to_hex(),
        KeyFormat::Base64 => key.to_base64(),
    }
}
