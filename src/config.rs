use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    cli::Backend,
    models::{
        baseline::BaselineFactory,
        command::{self, CommandFactory},
        ModelFactory, ModelRegistry,
    },
};

/// Configuration for a comparison run. Every field has a default, so a config file only
/// needs to name what it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Fraction of sentences held out for evaluation
    pub test_size: f64,

    /// Seed for the train/test shuffle
    pub seed: u64,

    /// Stop at the first model that fails instead of moving on
    pub fail_fast: bool,

    /// Models to compare, by short name
    pub models: ModelRegistry,

    /// Label names indexed by class id, for datasets that store tags as integers
    pub label_names: Option<Vec<String>>,

    /// The training backend to use
    pub backend: Backend,

    /// Settings for the command backend
    pub command: command::Config,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            seed: 42,
            fail_fast: false,
            models: ModelRegistry::default(),
            label_names: None,
            backend: Backend::default(),
            command: command::Config::default(),
        }
    }
}

impl ComparisonConfig {
    /// Load configuration from a YAML file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build the model factory for the configured backend
    pub fn factory(&self) -> Box<dyn ModelFactory> {
        match self.backend {
            Backend::Command => Box::new(CommandFactory::new(
                self.command.clone(),
                self.label_names.clone(),
            )),
            Backend::Baseline => Box::new(BaselineFactory::new(self.label_names.clone())),
        }
    }
}

/// Config Error
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("unable to read config {}: {source}", .path.display())]
    Read {
        /// The config path
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// The config file is not valid YAML for a [`ComparisonConfig`]
    #[error("unable to parse config {}: {source}", .path.display())]
    Parse {
        /// The config path
        path: PathBuf,
        /// The underlying parse error
        source: serde_yaml::Error,
    },
}
