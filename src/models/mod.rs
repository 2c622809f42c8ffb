use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{
    datasets::Dataset,
    metrics::{MetricsError, MetricsRecord},
};

/// The registry of models to compare
pub mod registry;

/// Fine-tuning through an external training command
pub mod command;

/// In-process most-frequent-tag baseline
pub mod baseline;

pub use registry::ModelRegistry;

/// A model that can be fine-tuned for token classification
#[async_trait]
pub trait NerModel: Send + Sync {
    /// The pretrained model identifier this instance is bound to
    fn identifier(&self) -> &str;

    /// Fine-tune on `train`, validating against `eval`, writing artifacts to `output_dir`
    async fn train(
        &self,
        train: &Dataset,
        eval: &Dataset,
        output_dir: &Path,
    ) -> Result<Box<dyn Trainer>, TrainingError>;
}

/// A handle to a finished training run
#[async_trait]
pub trait Trainer: Send + Sync {
    /// Evaluate the trained model. The record must contain `eval_f1`.
    async fn evaluate(&self) -> Result<MetricsRecord, TrainingError>;
}

/// Constructs models from pretrained identifiers
pub trait ModelFactory: Send + Sync {
    /// Create a model bound to the given identifier
    fn create(&self, identifier: &str) -> Result<Box<dyn NerModel>, TrainingError>;
}

impl<F: ModelFactory + ?Sized> ModelFactory for Box<F> {
    fn create(&self, identifier: &str) -> Result<Box<dyn NerModel>, TrainingError> {
        (**self).create(identifier)
    }
}

/// Training Error
#[derive(thiserror::Error, Debug)]
pub enum TrainingError {
    /// Reading or writing training files failed
    #[error("io error at {}: {source}", .path.display())]
    Io {
        /// The file or directory involved
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// The training command could not be rendered
    #[error("invalid training command template: {0}")]
    Template(#[from] liquid::Error),

    /// The training command could not be started
    #[error("unable to launch {program}: {source}")]
    Launch {
        /// The program that was run
        program: String,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// The training command exited unsuccessfully
    #[error("training {model} failed with exit code {}", .code.map_or("none".to_string(), |c| c.to_string()))]
    ProcessFailed {
        /// The model identifier
        model: String,
        /// The exit code, if the process was not killed by a signal
        code: Option<i32>,
    },

    /// Training finished without leaving metrics or predictions behind
    #[error("no evaluation output found in {}", .0.display())]
    MissingOutput(PathBuf),

    /// The evaluation did not report an F1 score
    #[error("evaluation metrics for {0} do not contain eval_f1")]
    MissingF1(String),

    /// There was nothing to train on
    #[error("cannot train {0} on an empty dataset")]
    EmptyDataset(String),

    /// Predictions did not line up with the evaluation set
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

impl TrainingError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| TrainingError::Io { path, source }
    }
}
