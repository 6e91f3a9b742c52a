use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// One content node of the repository snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub path: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// trace, debug, info, warn, error
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    #[cfg(test)]
    fn node(&self, path: &str) -> Option<&NodeConfig> {
        self.nodes.iter().find(|n| n.path == path)
    }
}
