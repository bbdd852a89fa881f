use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use rv_auction::AuctionConfig;

use crate::error::{ServerError, ServerResult};

/// Top-level server configuration, loaded from TOML.
///
/// Every section is optional in the file; missing keys take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub engine: EngineConfig,
    pub sweep: SweepConfig,
    pub auditor: AuditorConfig,
    pub seed: SeedConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            engine: EngineConfig::default(),
            sweep: SweepConfig::default(),
            auditor: AuditorConfig::default(),
            seed: SeedConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bid_max_attempts: u32,
    pub complete_max_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bid_max_attempts: 5,
            complete_max_attempts: 5,
        }
    }
}

/// Expiry sweep for listings whose owner never completed them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub enabled: bool,
    #[serde(with = "secs")]
    pub interval: Duration,
    /// Time after `auction_end_time` before a listing is expired.
    #[serde(with = "secs")]
    pub grace: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(60),
            grace: Duration::from_secs(24 * 60 * 60),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditorConfig {
    pub enabled: bool,
    #[serde(with = "secs")]
    pub interval: Duration,
    /// Run a full audit every this many ticks; other ticks drain the queue.
    pub full_audit_every: u32,
}

impl Default for AuditorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(30),
            full_audit_every: 20,
        }
    }
}

/// Users and posts registered in the in-memory entity directory at startup.
/// The directory is owned by the user and post services in production.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub users: Vec<String>,
    pub posts: Vec<SeedPost>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPost {
    pub id: String,
    pub owner: String,
}

impl ServerConfig {
    pub fn from_toml_str(raw: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn validate(&self) -> ServerResult<()> {
        self.auction_config()
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))?;
        if self.sweep.interval.is_zero() {
            return Err(ServerError::Config("sweep.interval must be non-zero".into()));
        }
        if self.auditor.interval.is_zero() {
            return Err(ServerError::Config("auditor.interval must be non-zero".into()));
        }
        if self.auditor.full_audit_every == 0 {
            return Err(ServerError::Config(
                "auditor.full_audit_every must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn auction_config(&self) -> AuctionConfig {
        AuctionConfig {
            bid_max_attempts: self.engine.bid_max_attempts,
            transition_max_attempts: self.engine.complete_max_attempts,
            expiry_grace_secs: self.sweep.grace.as_secs(),
        }
    }
}

/// Durations as whole seconds.
mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
