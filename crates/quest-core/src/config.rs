use crate::error::{QuestError, Result};
use crate::paths;
use crate::planner::SprintConstraints;
use crate::types::SprintStrategy;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// PlanningConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningConfig {
    #[serde(default = "default_strategy")]
    pub strategy: SprintStrategy,
    #[serde(default = "default_max_points")]
    pub max_points_per_sprint: u32,
    #[serde(default = "default_max_tickets")]
    pub max_tickets_per_sprint: usize,
}

fn default_strategy() -> SprintStrategy {
    SprintStrategy::Balanced
}

fn default_max_points() -> u32 {
    20
}

fn default_max_tickets() -> usize {
    10
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            max_points_per_sprint: default_max_points(),
            max_tickets_per_sprint: default_max_tickets(),
        }
    }
}

impl PlanningConfig {
    pub fn constraints(&self) -> SprintConstraints {
        SprintConstraints {
            max_points_per_sprint: self.max_points_per_sprint,
            max_tickets_per_sprint: self.max_tickets_per_sprint,
        }
    }
}

// ---------------------------------------------------------------------------
// OracleConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_model() -> String {
    "sprint-planner-v1".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_api_key_env() -> String {
    "QUEST_ORACLE_API_KEY".to_string()
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            model: default_model(),
            timeout_seconds: default_timeout_seconds(),
            api_key_env: default_api_key_env(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub project: String,
    #[serde(default)]
    pub planning: PlanningConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
}

impl Config {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            planning: PlanningConfig::default(),
            oracle: OracleConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(QuestError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
