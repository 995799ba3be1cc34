use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration for a record store instance.
/// Every field has a default so a partial (or absent) file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    pub persistence: PersistenceConfig,
    pub snapshots:   SnapshotConfig,
    pub analytics:   AnalyticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Location of the single persisted JSON document.
    pub path:        PathBuf,
    /// Quiet period after the last mutation before a write fires.
    pub debounce_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            path:        PathBuf::from("DATA").join("persist.json"),
            debounce_ms: 500,
        }
    }
}

impl PersistenceConfig {
    pub fn debounce(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.debounce_ms as i64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Ring capacity; the oldest snapshot is evicted on overflow.
    pub capacity:            usize,
    /// Courtesy pause between batch items. Not a correctness requirement.
    pub batch_item_delay_ms: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            capacity:            10,
            batch_item_delay_ms: 500,
        }
    }
}

impl SnapshotConfig {
    pub fn batch_item_delay(&self) -> Duration {
        Duration::from_millis(self.batch_item_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Seed for the risk-band simulation stream.
    pub forecast_seed: u64,
    /// Home base named in port-distance insights.
    pub home_base:     String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            forecast_seed: 0x5EA5_1DE5,
            home_base:     "Phoenix".to_string(),
        }
    }
}

impl DeskConfig {
    /// Load from a JSON file. Missing keys fall back to defaults.
    /// In tests, use DeskConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: DeskConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Configuration used by tests: no batch pause, a short debounce.
    pub fn default_test() -> Self {
        let mut config = Self::default();
        config.snapshots.batch_item_delay_ms = 0;
        config.persistence.debounce_ms = 500;
        config
    }
}
