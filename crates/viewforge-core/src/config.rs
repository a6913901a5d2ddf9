//! Engine-wide tunables loaded from TOML, falling back to defaults when no
//! file is present. Mirrors `pickaxe-server::config::ServerConfig`'s
//! `#[serde(default = "fn")]` per-field defaulting exactly.

use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Tick period the background dig-session driver runs at, in ms.
    #[serde(default = "default_dig_tick_ms")]
    pub dig_tick_ms: u64,
    /// Period of the coarser `DigManager::sync` background sweep, in ms.
    #[serde(default = "default_sync_period_ms")]
    pub sync_period_ms: u64,
    /// Hard cap on distinct audience-visible views a single player may
    /// belong to at once; `0` disables the cap.
    #[serde(default = "default_max_views_per_player")]
    pub max_views_per_player: u32,
}

fn default_dig_tick_ms() -> u64 {
    50
}

fn default_sync_period_ms() -> u64 {
    60_000
}

fn default_max_views_per_player() -> u32 {
    0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dig_tick_ms: default_dig_tick_ms(),
            sync_period_ms: default_sync_period_ms(),
            max_views_per_player: default_max_views_per_player(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: EngineConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::info!("no config file found at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }
}
