use super::{Config, CONFIG_FILE_NAME};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Resolves and reads the configuration file, then layers the environment on top.
pub struct ConfigLoader {
    working_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    /// Load with the process environment.
    pub async fn load(&self, explicit_path: Option<&Path>) -> Result<Config> {
        let mut config = self.load_file(explicit_path).await?;
        config.merge_env_vars()?;
        Ok(config)
    }

    /// Load the file layer only.
    ///
    /// An explicit path must exist; the default `counterparty-max.toml` in the
    /// working directory is optional.
    pub async fn load_file(&self, explicit_path: Option<&Path>) -> Result<Config> {
        let path = match explicit_path {
            Some(path) => {
                let path = self.resolve(path);
                if !fs::try_exists(&path).await? {
                    return Err(Error::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                path
            }
            None => {
                let path = self.working_dir.join(CONFIG_FILE_NAME);
                if !fs::try_exists(&path).await? {
                    debug!("No {} in {}, using defaults", CONFIG_FILE_NAME, self.working_dir.display());
                    return Ok(Config::default());
                }
                path
            }
        };

        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(&path).await?;
        Config::from_toml(&content)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}
