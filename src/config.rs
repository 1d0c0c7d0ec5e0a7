//! Engine configuration, loadable from JSON.

use crate::error::Result;
use crate::placement::ReplaceBehavior;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Options for placing a schematic into a world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasteOptions {
    #[serde(default)]
    pub replace: ReplaceBehavior,
    /// Run a second pass notifying the neighbours of every placed block
    #[serde(default)]
    pub notify_neighbors: bool,
    /// Re-register captured scheduled ticks (authoritative worlds only)
    #[serde(default = "default_true")]
    pub paste_ticks: bool,
    #[serde(default)]
    pub ignore_entities: bool,
}

impl Default for PasteOptions {
    fn default() -> Self {
        PasteOptions {
            replace: ReplaceBehavior::default(),
            notify_neighbors: false,
            paste_ticks: true,
            ignore_entities: false,
        }
    }
}

/// Options for capturing an area into a schematic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOptions {
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default)]
    pub ignore_entities: bool,
    #[serde(default = "default_true")]
    pub capture_ticks: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        CaptureOptions {
            author: default_author(),
            ignore_entities: false,
            capture_ticks: true,
        }
    }
}

/// Per-increment budget of the incremental tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOptions {
    /// Chunk columns processed per increment at most
    #[serde(default = "default_max_chunks")]
    pub max_chunks_per_tick: usize,
    /// Wall-clock time an increment may use, in milliseconds
    #[serde(default = "default_time_budget_ms")]
    pub time_budget_ms: u64,
    /// Run each task every N scheduler ticks
    #[serde(default = "default_tick_interval")]
    pub tick_interval: u32,
}

impl Default for TaskOptions {
    fn default() -> Self {
        TaskOptions {
            max_chunks_per_tick: default_max_chunks(),
            time_budget_ms: default_time_budget_ms(),
            tick_interval: default_tick_interval(),
        }
    }
}

impl TaskOptions {
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierOptions {
    /// Positions remembered per (expected, found) pair
    #[serde(default = "default_positions_per_pair")]
    pub max_positions_per_pair: usize,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        VerifierOptions {
            max_positions_per_pair: default_positions_per_pair(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub paste: PasteOptions,
    #[serde(default)]
    pub capture: CaptureOptions,
    #[serde(default)]
    pub tasks: TaskOptions,
    #[serde(default)]
    pub verifier: VerifierOptions,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn default_true() -> bool {
    true
}
fn default_author() -> String {
    "Unknown".to_string()
}
fn default_max_chunks() -> usize {
    4
}
fn default_time_budget_ms() -> u64 {
    40
}
fn default_tick_interval() -> u32 {
    1
}
fn default_positions_per_pair() -> usize {
    1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{ "paste": { "replace": "all", "notify_neighbors": true }, "tasks": { "max_chunks_per_tick": 16 } }"#,
        )
        .unwrap();
        assert_eq!(config.paste.replace, ReplaceBehavior::All);
        assert!(config.paste.notify_neighbors);
        assert!(config.paste.paste_ticks);
        assert_eq!(config.tasks.max_chunks_per_tick, 16);
        assert_eq!(config.tasks.time_budget_ms, 40);
        assert_eq!(config.capture, CaptureOptions::default());
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(EngineConfig::from_json_str("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = EngineConfig::default();
        config.capture.author = "builder".to_string();
        let json = config.to_json().unwrap();
        assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_json() {
        let err = EngineConfig::from_json_str(r#"{ "paste": { "replace": "sometimes" } }"#);
        assert!(matches!(err, Err(crate::error::SchematicError::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{ "verifier": { "max_positions_per_pair": 8 } }"#).unwrap();
        let config = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.verifier.max_positions_per_pair, 8);
    }
}
