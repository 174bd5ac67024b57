use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    pub verbose: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("shot"),
            verbose: false,
        }
    }
}

impl CliConfig {
    pub fn new(data_dir: Option<PathBuf>, verbose: bool) -> Self {
        let mut config = Self::default();
        if let Some(dir) = data_dir {
            config.data_dir = dir;
        }
        config.verbose = verbose;
        config
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("shot.db")
    }
}
