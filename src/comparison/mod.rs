use std::path::{Path, PathBuf};

use crate::{
    config::ComparisonConfig,
    datasets::{DataFormatError, Dataset},
    metrics::{MetricsRecord, EVAL_F1},
    models::{ModelFactory, ModelRegistry, TrainingError},
};

/// Per-model results
pub mod results;

/// CSV summaries
pub mod report;

pub use results::ComparisonResults;

/// A model that failed during a comparison run
#[derive(Debug)]
pub struct ModelFailure {
    /// The short model name
    pub name: String,

    /// The pretrained identifier
    pub identifier: String,

    /// What went wrong
    pub error: TrainingError,
}

/// Which models finished and which failed in one run
#[derive(Debug, Default)]
pub struct ComparisonSummary {
    /// Names of models that were trained and evaluated, in run order
    pub succeeded: Vec<String>,

    /// Models that failed, in run order
    pub failed: Vec<ModelFailure>,
}

impl ComparisonSummary {
    /// Whether every model finished
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fine-tunes each registered model on one dataset and keeps their evaluation metrics
pub struct ModelComparator<F: ModelFactory> {
    registry: ModelRegistry,
    factory: F,
    test_size: f64,
    seed: u64,
    fail_fast: bool,
    results: ComparisonResults,
}

impl<F: ModelFactory> ModelComparator<F> {
    /// Create a comparator with an 80/20 split seeded with 42
    pub fn new(registry: ModelRegistry, factory: F) -> Self {
        Self {
            registry,
            factory,
            test_size: 0.2,
            seed: 42,
            fail_fast: false,
            results: ComparisonResults::new(),
        }
    }

    /// Create a comparator from a loaded configuration
    pub fn from_config(config: &ComparisonConfig, factory: F) -> Self {
        Self::new(config.models.clone(), factory)
            .with_test_size(config.test_size)
            .with_seed(config.seed)
            .with_fail_fast(config.fail_fast)
    }

    /// Set the fraction of sentences held out for evaluation
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Set the split seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Abort on the first failing model instead of continuing
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// The models being compared
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Metrics collected so far
    pub fn results(&self) -> &ComparisonResults {
        &self.results
    }

    /// Load a token/tag dataset
    pub async fn load_dataset(&self, path: impl AsRef<Path>) -> Result<Dataset, DataFormatError> {
        Dataset::load(path).await
    }

    /// Load the dataset at `dataset_path` and compare every registered model on it, writing
    /// model artifacts under `output_dir/{name}`
    pub async fn compare_models(
        &mut self,
        dataset_path: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> Result<ComparisonSummary, ComparisonError> {
        let dataset = self.load_dataset(dataset_path).await?;

        self.compare_dataset(&dataset, output_dir).await
    }

    /// Split an already loaded dataset and compare every registered model on it.
    ///
    /// Models run one at a time in registry order. Unless fail-fast is set, a model that
    /// fails is recorded in the summary and the run moves on to the next one.
    pub async fn compare_dataset(
        &mut self,
        dataset: &Dataset,
        output_dir: impl AsRef<Path>,
    ) -> Result<ComparisonSummary, ComparisonError> {
        let output_dir = output_dir.as_ref();
        let (train, eval) = dataset.train_test_split(self.test_size, self.seed)?;

        info!(
            "Split {} sentences into {} train and {} eval (seed {})",
            dataset.len(),
            train.len(),
            eval.len(),
            self.seed
        );

        let mut summary = ComparisonSummary::default();

        for (name, identifier) in self.registry.iter() {
            println!("\nTraining {}...", name);

            let model_dir = output_dir.join(name);
            let outcome = run_model(&self.factory, identifier, &train, &eval, &model_dir).await;

            match outcome {
                Ok(metrics) => {
                    println!("{} results:", name);
                    println!("{}", format_metrics(&metrics));

                    if self.results.insert(name, metrics).is_some() {
                        debug!("Replaced earlier results for {}", name);
                    }
                    summary.succeeded.push(name.to_string());
                }
                Err(error) if self.fail_fast => {
                    return Err(ComparisonError::Training {
                        model: name.to_string(),
                        source: error,
                    });
                }
                Err(error) => {
                    error!("{} ({}) failed: {}", name, identifier, error);
                    summary.failed.push(ModelFailure {
                        name: name.to_string(),
                        identifier: identifier.clone(),
                        error,
                    });
                }
            }
        }

        Ok(summary)
    }

    /// The model with the highest `eval_f1` above zero, or `None` when no model scored above
    /// zero. Ties keep the model that ran first.
    pub fn get_best_model(&self) -> Option<&str> {
        self.results.best_above(0.0)
    }

    /// Like [`ModelComparator::get_best_model`], with a caller-chosen starting threshold.
    /// Pass `f64::NEG_INFINITY` to always pick a model when any has an F1 score.
    pub fn get_best_model_above(&self, threshold: f64) -> Option<&str> {
        self.results.best_above(threshold)
    }

    /// Write the collected results as JSON
    pub async fn save_comparison_results(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<(), ComparisonError> {
        let path = path.as_ref();

        self.results
            .save(path)
            .await
            .map_err(|source| ComparisonError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        info!("Saved comparison results to {}", path.display());

        Ok(())
    }

    /// Write a CSV table of the headline metrics
    pub fn save_summary_csv(&self, path: impl AsRef<Path>) -> Result<(), ComparisonError> {
        report::write_summary_csv(path.as_ref(), &self.registry, &self.results)?;

        Ok(())
    }
}

/// Pretty JSON for a metrics record. Non-finite values print as `null`.
fn format_metrics(metrics: &MetricsRecord) -> String {
    format!("{:#}", serde_json::json!(metrics))
}

async fn run_model<F: ModelFactory>(
    factory: &F,
    identifier: &str,
    train: &Dataset,
    eval: &Dataset,
    output_dir: &Path,
) -> Result<MetricsRecord, TrainingError> {
    let model = factory.create(identifier)?;
    let trainer = model.train(train, eval, output_dir).await?;
    let metrics = trainer.evaluate().await?;

    if !metrics.contains_key(EVAL_F1) {
        return Err(TrainingError::MissingF1(identifier.to_string()));
    }

    Ok(metrics)
}

/// Read results written by [`ModelComparator::save_comparison_results`]
pub async fn load_comparison_results(
    path: impl AsRef<Path>,
) -> Result<ComparisonResults, ComparisonError> {
    let path = path.as_ref();

    ComparisonResults::load(path)
        .await
        .map_err(|source| ComparisonError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Comparison Error
#[derive(thiserror::Error, Debug)]
pub enum ComparisonError {
    /// The dataset could not be loaded or split
    #[error(transparent)]
    DataFormat(#[from] DataFormatError),

    /// A model failed while fail-fast was set
    #[error("{model} failed: {source}")]
    Training {
        /// The short model name
        model: String,
        /// The backend error
        source: TrainingError,
    },

    /// Results could not be written or read
    #[error("io error at {}: {source}", .path.display())]
    Io {
        /// The results path
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// The CSV summary could not be written
    #[error("unable to write summary: {0}")]
    Csv(#[from] csv::Error),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::models::baseline::BaselineFactory;

    use super::*;

    fn comparator(scores: &[(&str, f64)]) -> ModelComparator<BaselineFactory> {
        let mut comparator =
            ModelComparator::new(ModelRegistry::default(), BaselineFactory::default());
        comparator.results = scores
            .iter()
            .map(|&(name, f1)| (name, MetricsRecord::from([(EVAL_F1.to_string(), f1)])))
            .collect();
        comparator
    }

    #[test]
    fn best_model_of_no_results_is_none() {
        assert_eq!(comparator(&[]).get_best_model(), None);
    }

    #[test]
    fn best_model_is_first_strict_maximum() {
        let comparator = comparator(&[("a", 0.7), ("b", 0.9), ("c", 0.9)]);

        assert_eq!(comparator.get_best_model(), Some("b"));
    }

    #[test]
    fn negative_scores_yield_no_best_model() {
        let comparator = comparator(&[("a", -1.0), ("b", -2.0)]);

        assert_eq!(comparator.get_best_model(), None);
        assert_eq!(comparator.get_best_model_above(f64::NEG_INFINITY), Some("a"));
    }

    #[test]
    fn metrics_print_as_pretty_json() {
        let metrics = MetricsRecord::from([
            (EVAL_F1.to_string(), 0.5),
            ("eval_loss".to_string(), f64::NAN),
        ]);

        assert_eq!(
            format_metrics(&metrics),
            "{\n  \"eval_f1\": 0.5,\n  \"eval_loss\": null\n}"
        );
    }

    #[tokio::test]
    async fn unwritable_results_path_is_an_io_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let blocker = dir.path().join("file");
        tokio::fs::write(&blocker, "not a directory").await?;

        let err = comparator(&[("a", 0.5)])
            .save_comparison_results(blocker.join("results.json"))
            .await
            .unwrap_err();

        assert!(matches!(err, ComparisonError::Io { .. }));

        Ok(())
    }
}
