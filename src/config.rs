//! `profscope.toml` config loading.

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "profscope.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    #[serde(default)]
    pub flame: FlameConfig,

    #[serde(default)]
    pub gc: GcConfig,

    #[serde(default)]
    pub jit: JitConfig,

    #[serde(default)]
    pub fields: FieldsConfig,

    /// Extra field-name labels merged over the built-in tables.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FlameConfig {
    /// Nodes below this share of the root are left out of the rendered levels.
    #[serde(default)]
    pub min_percent: f64,

    #[serde(default = "default_flame_title")]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GcConfig {
    #[serde(default = "default_longest_pauses")]
    pub longest_pauses: usize,

    #[serde(default = "default_longest_pauses")]
    pub concurrent_cycles: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JitConfig {
    #[serde(default = "default_longest_compilations")]
    pub longest_compilations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FieldsConfig {
    /// Upper bound for builders collecting every matching event.
    #[serde(default = "default_max_events")]
    pub max_events: usize,
}

fn default_flame_title() -> String {
    "Flame Graph".to_string()
}

fn default_longest_pauses() -> usize {
    20
}

fn default_longest_compilations() -> usize {
    20
}

fn default_max_events() -> usize {
    1000
}

impl Default for FlameConfig {
    fn default() -> Self {
        Self {
            min_percent: 0.0,
            title: default_flame_title(),
        }
    }
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            longest_pauses: default_longest_pauses(),
            concurrent_cycles: default_longest_pauses(),
        }
    }
}

impl Default for JitConfig {
    fn default() -> Self {
        Self {
            longest_compilations: default_longest_compilations(),
        }
    }
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            max_events: default_max_events(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flame: FlameConfig::default(),
            gc: GcConfig::default(),
            jit: JitConfig::default(),
            fields: FieldsConfig::default(),
            labels: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn load_optional(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => match toml::from_str::<Config>(&s) {
                Ok(cfg) => cfg,
                Err(err) => {
                    tracing::warn!("failed to parse config {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                tracing::warn!("failed to read config {}: {err}", path.display());
                Self::default()
            }
        }
    }

    /// Field labels for `base`, with the `[labels]` overrides applied on top.
    pub fn field_labels(&self, base: crate::FieldLabels) -> crate::FieldLabels {
        base.with_overrides(&self.labels)
    }
}
