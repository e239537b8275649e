use std::{collections::BTreeMap, fs, path::PathBuf};

use serde::Deserialize;
use substation_client::domain::SequenceLabel;

use crate::reports::thresholds::ThresholdRules;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

/// Alert thresholds as written in the config file.
///
/// Without a `[thresholds]` section the built-in rules apply. Inside the
/// section, a key that is left out disables that check.
#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default)]
    pub current: Option<f64>,
    #[serde(default)]
    pub voltage: Option<f64>,
    #[serde(default)]
    pub sequence: BTreeMap<String, f64>,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        let rules = ThresholdRules::default();
        Self {
            current: rules.current,
            voltage: rules.voltage,
            sequence: rules
                .sequence
                .iter()
                .map(|(label, v)| (label.as_str().to_string(), *v))
                .collect(),
        }
    }
}

impl TryFrom<&ThresholdConfig> for ThresholdRules {
    type Error = anyhow::Error;

    fn try_from(cfg: &ThresholdConfig) -> anyhow::Result<Self> {
        let mut sequence = BTreeMap::new();
        for (name, value) in &cfg.sequence {
            let label: SequenceLabel = name
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid thresholds.sequence entry: {e}"))?;
            sequence.insert(label, *value);
        }

        Ok(ThresholdRules {
            current: cfg.current,
            voltage: cfg.voltage,
            sequence,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("exports"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub metrics: Option<MetricsConfig>,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("REPORTING_CONFIG")
            .unwrap_or_else(|_| "reporting-config.toml".to_string());
        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config '{path}': {e}"))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }

    pub fn threshold_rules(&self) -> anyhow::Result<ThresholdRules> {
        ThresholdRules::try_from(&self.thresholds)
    }
}
