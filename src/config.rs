use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_COMMIT_LIMIT: usize = 50;

/// Optional `devmind.toml` settings; CLI flags take precedence
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DevmindConfig {
    pub database: Option<String>,
    pub path: Option<String>,
    #[serde(default)]
    pub extra_ignore: Vec<String>,
    pub commit_limit: Option<usize>,
}

impl DevmindConfig {
    pub fn commit_limit(&self) -> usize {
        self.commit_limit.unwrap_or(DEFAULT_COMMIT_LIMIT)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("devmind.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".devmind").join("devmind.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<DevmindConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: DevmindConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
