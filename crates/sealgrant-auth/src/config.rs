//! Grant issuance and validation configuration.
//!
//! Token lifetimes, PKCE policy, refresh issuance policy, replay handling and
//! sealer key location, loaded from TOML with human-readable durations.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest key id the sealed envelope header can carry.
pub const MAX_KEY_ID_LEN: usize = u8::MAX as usize;

/// Root grants configuration.
///
/// # Example (TOML)
///
/// ```toml
/// issuer = "https://idp.example.org"
///
/// [lifetimes]
/// authorization_code = "5m"
/// access_token = "10m"
/// refresh_token = "2h"
///
/// [pkce]
/// force = true
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GrantsConfig {
    /// Issuer identifier. `GrantService` only seals authorization codes that
    /// name it, and the CLI writes it into minted codes.
    pub issuer: String,

    /// Token lifetimes.
    pub lifetimes: LifetimeConfig,

    /// PKCE policy.
    pub pkce: PkceConfig,

    /// Refresh token issuance policy.
    pub refresh: RefreshConfig,

    /// Authorization code replay handling.
    pub replay: ReplayConfig,

    /// Sealer key location.
    pub sealer: SealerConfig,
}

impl Default for GrantsConfig {
    fn default() -> Self {
        Self {
            issuer: "https://idp.example.org".to_string(),
            lifetimes: LifetimeConfig::default(),
            pkce: PkceConfig::default(),
            refresh: RefreshConfig::default(),
            replay: ReplayConfig::default(),
            sealer: SealerConfig::default(),
        }
    }
}

/// Token lifetimes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifetimeConfig {
    /// Authorization code lifetime, and the longest one `GrantService` will
    /// seal. Codes should be short-lived; they are single-use and carry PKCE
    /// state.
    #[serde(with = "humantime_serde")]
    pub authorization_code: Duration,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token: Duration,

    /// Refresh token lifetime. Also the duration of a lineage revocation.
    #[serde(with = "humantime_serde")]
    pub refresh_token: Duration,
}

impl Default for LifetimeConfig {
    fn default() -> Self {
        Self {
            authorization_code: Duration::from_secs(300), // 5 minutes
            access_token: Duration::from_secs(600),       // 10 minutes
            refresh_token: Duration::from_secs(2 * 3600), // 2 hours
        }
    }
}

/// PKCE policy (RFC 7636).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PkceConfig {
    /// Reject authorization codes that were issued without a challenge.
    pub force: bool,

    /// Accept the `plain` challenge method.
    pub allow_plain: bool,
}

/// Refresh token issuance policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Only mint a refresh token when the granted scope contains
    /// `offline_access`. When disabled, every code exchange yields one.
    pub require_offline_access: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            require_offline_access: true,
        }
    }
}

/// Authorization code replay handling.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Revoke the whole grant lineage when a code is redeemed twice
    /// (RFC 6749 section 4.1.2). Tokens already minted from the code stop
    /// validating.
    pub revoke_lineage_on_replay: bool,
}

/// Sealer key location.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SealerConfig {
    /// Environment variable holding the 32-byte key (hex or base64).
    pub key_env: String,

    /// Identifier stamped into sealed envelopes for the current key.
    pub key_id: String,
}

impl Default for SealerConfig {
    fn default() -> Self {
        Self {
            key_env: "SEALGRANT_KEY".to_string(),
            key_id: "default".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// The configuration document could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl GrantsConfig {
    /// Parses a TOML document and validates the result.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML and any error from
    /// [`GrantsConfig::validate`].
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The issuer is empty
    /// - Any lifetime is zero
    /// - The refresh token lifetime is shorter than the access token lifetime
    /// - The sealer key id is empty or longer than 255 bytes
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::InvalidValue(
                "issuer cannot be empty".to_string(),
            ));
        }

        for (name, lifetime) in [
            ("authorization_code", self.lifetimes.authorization_code),
            ("access_token", self.lifetimes.access_token),
            ("refresh_token", self.lifetimes.refresh_token),
        ] {
            // Sub-second lifetimes truncate to zero in the sealed form.
            if lifetime.as_secs() == 0 {
                return Err(ConfigError::InvalidValue(format!(
                    "lifetimes.{name} must be at least one second"
                )));
            }
        }

        if self.lifetimes.refresh_token < self.lifetimes.access_token {
            return Err(ConfigError::InvalidValue(
                "lifetimes.refresh_token must not be shorter than lifetimes.access_token"
                    .to_string(),
            ));
        }

        if self.sealer.key_id.is_empty() {
            return Err(ConfigError::InvalidValue(
                "sealer.key_id cannot be empty".to_string(),
            ));
        }

        if self.sealer.key_id.len() > MAX_KEY_ID_LEN {
            return Err(ConfigError::InvalidValue(format!(
                "sealer.key_id must be at most {MAX_KEY_ID_LEN} bytes, got {}",
                self.sealer.key_id.len()
            )));
        }

        Ok(())
    }
}
