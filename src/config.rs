//! Runtime configuration (SPEC_FULL §1): loaded first from an inline
//! JSON environment variable, then from a `config.json` file on disk,
//! falling back to defaults — the same three-tier precedence as the
//! teacher's `config::load_config`.

use std::env;
use std::fs::read_to_string;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use log::LevelFilter;
use serde::Deserialize;

/// The server version extracted from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const CONFIG_ENV_KEY: &str = "ECHELON_CONFIG_JSON";
const CONFIG_FILE_PATH: &str = "config.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub server: ServerConfig,
    pub matchmaker: MatchmakerConfig,
    pub registry: RegistryConfig,
    pub lobby: LobbyConfig,
    pub logging: LevelFilter,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            matchmaker: MatchmakerConfig::default(),
            registry: RegistryConfig::default(),
            lobby: LobbyConfig::default(),
            logging: LevelFilter::Info,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Address the thin admin/health HTTP surface binds (spec.md §6
    /// "purely-presentational command surfaces" are out of scope; this
    /// endpoint is the one ambient exception per SPEC_FULL §1).
    pub admin_bind: IpAddr,
    pub admin_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 42127,
            admin_bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            admin_port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchmakerConfig {
    /// Default max-RTT ceiling applied when a ticket doesn't specify one
    /// (spec.md §4.6 step 2).
    pub default_max_rtt_ms: u32,
    /// Matchmaker cycle tick rate (spec.md §4.6: "runs on a fixed tick").
    pub cycle_interval_ms: u64,
    /// Queue-age threshold after which priority-sort widening kicks in
    /// (spec.md §4.6 step 6).
    pub queue_priority_after_ms: u64,
    pub disable_arena_backfill: bool,
}

impl Default for MatchmakerConfig {
    fn default() -> Self {
        Self {
            default_max_rtt_ms: 150,
            cycle_interval_ms: 1_000,
            queue_priority_after_ms: 30_000,
            disable_arena_backfill: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Timeout for one UDP health-probe round trip (SPEC_FULL §2).
    pub health_probe_timeout_ms: u64,
    pub health_probe_retries: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            health_probe_timeout_ms: 750,
            health_probe_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LobbyConfig {
    /// Lobby actor tick rate (spec.md §4.5: "the match loop ticks on a
    /// fixed interval").
    pub tick_interval_ms: u64,
    /// Grace period an empty match is kept alive before teardown
    /// (spec.md §4.5 edge cases).
    pub empty_match_grace_secs: u64,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 250,
            empty_match_grace_secs: 30,
        }
    }
}

/// Loads configuration from the environment variable, then the config
/// file, then defaults — never fails outright, matching the teacher's
/// "fall back to defaults and keep booting" posture.
pub fn load_config() -> RuntimeConfig {
    if let Ok(raw) = env::var(CONFIG_ENV_KEY) {
        match serde_json::from_str(&raw) {
            Ok(config) => return config,
            Err(err) => {
                eprintln!("failed to parse {CONFIG_ENV_KEY} (using defaults): {err}");
            }
        }
    }

    let path = Path::new(CONFIG_FILE_PATH);
    if path.exists() {
        match read_to_string(path).map(|data| serde_json::from_str::<RuntimeConfig>(&data)) {
            Ok(Ok(config)) => return config,
            Ok(Err(err)) => eprintln!("failed to parse {CONFIG_FILE_PATH} (using defaults): {err}"),
            Err(err) => eprintln!("failed to read {CONFIG_FILE_PATH} (using defaults): {err}"),
        }
    }

    RuntimeConfig::default()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_config_binds_unspecified_host() {
        let config = RuntimeConfig::default();
        assert_eq!(config.server.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.server.port, 42127);
    }

    #[test]
    fn test_missing_env_and_file_falls_back_to_defaults() {
        std::env::remove_var(CONFIG_ENV_KEY);
        let config = load_config();
        assert_eq!(config.matchmaker.default_max_rtt_ms, 150);
    }
}
