use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_region() -> String {
    "us-east-1".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Region written into the generated provider block.
    #[serde(default = "default_region")]
    pub region: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Default project bundle directory.
    #[serde(default)]
    pub directory: Option<String>,
    /// Project name recorded in bundle metadata.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub project: ProjectConfig,
}

/// Default configuration used when no config file is supplied.
pub fn init_default() -> anyhow::Result<Config> {
    Ok(Config::default())
}

/// Load configuration from a JSON file.
pub fn init_from_path(path: &str) -> anyhow::Result<Config> {
    let path = Path::new(path);
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config {}: {}", path.display(), e))?;
    let config: Config = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("failed to parse config {}: {}", path.display(), e))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = init_default().unwrap();
        assert_eq!(config.provider.region, "us-east-1");
        assert!(config.project.directory.is_none());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"project": {"name": "demo"}}"#).unwrap();
        assert_eq!(config.provider.region, "us-east-1");
        assert_eq!(config.project.name.as_deref(), Some("demo"));
    }
}
