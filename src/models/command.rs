use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::{
    datasets::{Dataset, Tag},
    metrics::{self, MetricsRecord, EVAL_F1},
    utils::files,
};

use super::{ModelFactory, NerModel, Trainer, TrainingError};

/// File the train split is written to, inside each model's output directory
pub static TRAIN_FILE: &str = "train.json";

/// File the evaluation split is written to, inside each model's output directory
pub static EVAL_FILE: &str = "eval.json";

fn default_program() -> String {
    "python".to_string()
}

fn default_args() -> Vec<String> {
    [
        "train_ner.py",
        "--model",
        "{{ model }}",
        "--train-file",
        "{{ train_file }}",
        "--eval-file",
        "{{ eval_file }}",
        "--output-dir",
        "{{ output_dir }}",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_metrics_file() -> String {
    "eval_results.json".to_string()
}

fn default_predictions_file() -> String {
    "predictions.json".to_string()
}

/// How to launch the external fine-tuning program
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// The program to run (e.g., "python")
    #[serde(default = "default_program")]
    pub program: String,

    /// Argument templates. `{{ model }}`, `{{ train_file }}`, `{{ eval_file }}` and
    /// `{{ output_dir }}` are filled in per model.
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Metrics file the program leaves in the output directory
    #[serde(default = "default_metrics_file")]
    pub metrics_file: String,

    /// Predicted tags for the evaluation split, read when no metrics file is written
    #[serde(default = "default_predictions_file")]
    pub predictions_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            metrics_file: default_metrics_file(),
            predictions_file: default_predictions_file(),
        }
    }
}

/// Creates [`CommandModel`]s sharing one command configuration
#[derive(Clone, Debug)]
pub struct CommandFactory {
    config: Config,
    label_names: Option<Vec<String>>,
}

impl CommandFactory {
    /// Create a new factory
    pub fn new(config: Config, label_names: Option<Vec<String>>) -> Self {
        Self {
            config,
            label_names,
        }
    }
}

impl ModelFactory for CommandFactory {
    fn create(&self, identifier: &str) -> Result<Box<dyn NerModel>, TrainingError> {
        Ok(Box::new(CommandModel::new(
            identifier,
            self.config.clone(),
            self.label_names.clone(),
        )?))
    }
}

/// A pretrained model fine-tuned by an external program
pub struct CommandModel {
    identifier: String,
    config: Config,
    label_names: Option<Vec<String>>,
    templates: Vec<liquid::Template>,
}

impl CommandModel {
    /// Bind a command configuration to a model identifier, parsing the argument templates
    pub fn new(
        identifier: &str,
        config: Config,
        label_names: Option<Vec<String>>,
    ) -> Result<Self, TrainingError> {
        let parser = liquid::ParserBuilder::with_stdlib().build()?;
        let templates = config
            .args
            .iter()
            .map(|arg| parser.parse(arg))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            identifier: identifier.to_string(),
            config,
            label_names,
            templates,
        })
    }

    /// Render the argument list for one training run
    pub fn render_args(
        &self,
        train_file: &Path,
        eval_file: &Path,
        output_dir: &Path,
    ) -> Result<Vec<String>, TrainingError> {
        let globals = liquid::object!({
            "model": self.identifier,
            "train_file": train_file.display().to_string(),
            "eval_file": eval_file.display().to_string(),
            "output_dir": output_dir.display().to_string(),
        });

        Ok(self
            .templates
            .iter()
            .map(|template| template.render(&globals))
            .collect::<Result<Vec<_>, _>>()?)
    }
}

#[async_trait]
impl NerModel for CommandModel {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn train(
        &self,
        train: &Dataset,
        eval: &Dataset,
        output_dir: &Path,
    ) -> Result<Box<dyn Trainer>, TrainingError> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(TrainingError::io(output_dir))?;

        let metrics_path = output_dir.join(&self.config.metrics_file);
        let predictions_path = output_dir.join(&self.config.predictions_file);

        // Output left by an earlier run must not be read back as this run's
        remove_stale(&metrics_path).await?;
        remove_stale(&predictions_path).await?;

        let train_file = output_dir.join(TRAIN_FILE);
        let eval_file = output_dir.join(EVAL_FILE);

        train
            .save(&train_file)
            .await
            .map_err(TrainingError::io(&train_file))?;
        eval.save(&eval_file)
            .await
            .map_err(TrainingError::io(&eval_file))?;

        let args = self.render_args(&train_file, &eval_file, output_dir)?;

        info!("Running {} {}", self.config.program, args.join(" "));

        let status = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|source| TrainingError::Launch {
                program: self.config.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(TrainingError::ProcessFailed {
                model: self.identifier.clone(),
                code: status.code(),
            });
        }

        Ok(Box::new(CommandTrainer {
            identifier: self.identifier.clone(),
            metrics_path,
            predictions_path,
            gold: eval.labels(self.label_names.as_deref()),
            label_names: self.label_names.clone(),
        }))
    }
}

async fn remove_stale(path: &Path) -> Result<(), TrainingError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed stale {}", path.display());
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(TrainingError::io(path)(err)),
    }
}

async fn exists(path: &Path) -> Result<bool, TrainingError> {
    tokio::fs::try_exists(path)
        .await
        .map_err(TrainingError::io(path))
}

/// Reads the evaluation output an external training run left on disk
pub struct CommandTrainer {
    identifier: String,
    metrics_path: PathBuf,
    predictions_path: PathBuf,
    gold: Vec<Vec<String>>,
    label_names: Option<Vec<String>>,
}

#[async_trait]
impl Trainer for CommandTrainer {
    async fn evaluate(&self) -> Result<MetricsRecord, TrainingError> {
        let metrics = if exists(&self.metrics_path).await? {
            files::read_json::<MetricsRecord>(&self.metrics_path)
                .await
                .map_err(TrainingError::io(&self.metrics_path))?
        } else if exists(&self.predictions_path).await? {
            debug!(
                "No metrics file for {}, scoring {}",
                self.identifier,
                self.predictions_path.display()
            );

            let predictions: Vec<Vec<Tag>> = files::read_json(&self.predictions_path)
                .await
                .map_err(TrainingError::io(&self.predictions_path))?;

            let label_names = self.label_names.as_deref();
            let predicted: Vec<Vec<_>> = predictions
                .iter()
                .map(|tags| tags.iter().map(|t| t.resolve(label_names)).collect())
                .collect();

            metrics::evaluate(&self.gold, &predicted)?.to_record()
        } else {
            return Err(TrainingError::MissingOutput(
                self.metrics_path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default(),
            ));
        };

        if !metrics.contains_key(EVAL_F1) {
            return Err(TrainingError::MissingF1(self.identifier.clone()));
        }

        Ok(metrics)
    }
}
