use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    datasets::Dataset,
    metrics::{self, MetricsRecord},
    utils::files,
};

use super::{ModelFactory, NerModel, Trainer, TrainingError};

/// Name of the artifact a baseline run writes to its output directory
pub static MODEL_FILE: &str = "model.json";

/// Creates [`Baseline`] models
#[derive(Clone, Debug, Default)]
pub struct BaselineFactory {
    label_names: Option<Vec<String>>,
}

impl BaselineFactory {
    /// Create a new factory
    pub fn new(label_names: Option<Vec<String>>) -> Self {
        Self { label_names }
    }
}

impl ModelFactory for BaselineFactory {
    fn create(&self, identifier: &str) -> Result<Box<dyn NerModel>, TrainingError> {
        Ok(Box::new(Baseline::new(identifier, self.label_names.clone())))
    }
}

/// Tags each token with the tag it carried most often in training.
///
/// Loads no pretrained weights: the identifier is only recorded in the saved artifact. Useful
/// for smoke runs of a comparison and as a floor for the real models.
pub struct Baseline {
    identifier: String,
    label_names: Option<Vec<String>>,
}

impl Baseline {
    /// Create a baseline bound to an identifier
    pub fn new(identifier: &str, label_names: Option<Vec<String>>) -> Self {
        Self {
            identifier: identifier.to_string(),
            label_names,
        }
    }
}

/// The fitted lexicon
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tagger {
    /// The identifier the tagger was trained under
    pub identifier: String,

    /// Tag used for tokens never seen in training
    pub fallback: String,

    /// Most frequent tag per lowercased token
    pub lexicon: BTreeMap<String, String>,
}

impl Tagger {
    /// Count tag frequencies per token. Ties go to the lexicographically smallest tag.
    pub fn fit(identifier: &str, tokens: &[Vec<String>], labels: &[Vec<String>]) -> Self {
        let mut per_token: HashMap<String, HashMap<&str, usize>> = HashMap::new();
        let mut overall: HashMap<&str, usize> = HashMap::new();

        for (words, tags) in tokens.iter().zip(labels) {
            for (word, tag) in words.iter().zip(tags) {
                *per_token
                    .entry(word.to_lowercase())
                    .or_default()
                    .entry(tag.as_str())
                    .or_default() += 1;
                *overall.entry(tag.as_str()).or_default() += 1;
            }
        }

        let lexicon = per_token
            .into_iter()
            .filter_map(|(word, counts)| Some((word, most_frequent(&counts)?)))
            .collect();

        Self {
            identifier: identifier.to_string(),
            fallback: most_frequent(&overall).unwrap_or_else(|| "O".to_string()),
            lexicon,
        }
    }

    /// Tag every token of every sentence
    pub fn predict(&self, tokens: &[Vec<String>]) -> Vec<Vec<String>> {
        tokens
            .iter()
            .map(|words| {
                words
                    .iter()
                    .map(|word| {
                        self.lexicon
                            .get(&word.to_lowercase())
                            .unwrap_or(&self.fallback)
                            .clone()
                    })
                    .collect()
            })
            .collect()
    }
}

fn most_frequent(counts: &HashMap<&str, usize>) -> Option<String> {
    counts
        .iter()
        .max_by(|(a_tag, a), (b_tag, b)| a.cmp(b).then_with(|| b_tag.cmp(a_tag)))
        .map(|(tag, _)| tag.to_string())
}

#[async_trait]
impl NerModel for Baseline {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn train(
        &self,
        train: &Dataset,
        eval: &Dataset,
        output_dir: &Path,
    ) -> Result<Box<dyn Trainer>, TrainingError> {
        if train.is_empty() {
            return Err(TrainingError::EmptyDataset(self.identifier.clone()));
        }

        let label_names = self.label_names.as_deref();
        let tagger = Tagger::fit(&self.identifier, train.tokens(), &train.labels(label_names));

        info!(
            "Fitted baseline for {} with {} known tokens",
            self.identifier,
            tagger.lexicon.len()
        );

        let model_file = output_dir.join(MODEL_FILE);
        files::write_json(&model_file, &tagger)
            .await
            .map_err(TrainingError::io(&model_file))?;

        Ok(Box::new(BaselineTrainer {
            tagger,
            tokens: eval.tokens().to_vec(),
            gold: eval.labels(label_names),
        }))
    }
}

/// Scores a fitted [`Tagger`] on the evaluation split
pub struct BaselineTrainer {
    tagger: Tagger,
    tokens: Vec<Vec<String>>,
    gold: Vec<Vec<String>>,
}

#[async_trait]
impl Trainer for BaselineTrainer {
    async fn evaluate(&self) -> Result<MetricsRecord, TrainingError> {
        let predicted = self.tagger.predict(&self.tokens);
        let mut record = metrics::evaluate(&self.gold, &predicted)?.to_record();

        record.insert("eval_samples".to_string(), self.tokens.len() as f64);

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{datasets::Item, metrics::EVAL_F1};

    use super::*;

    fn item(words: &str, tags: &str) -> Item {
        Item::new(
            words.split(' ').map(String::from).collect(),
            tags.split(' ').map(Into::into).collect(),
        )
    }

    #[test]
    fn fit_prefers_most_frequent_tag() {
        let tokens = vec![
            vec!["Paris".to_string(), "Paris".to_string(), "paris".to_string()],
            vec!["is".to_string()],
        ];
        let labels = vec![
            vec!["B-LOC".to_string(), "B-PER".to_string(), "B-LOC".to_string()],
            vec!["O".to_string()],
        ];

        let tagger = Tagger::fit("baseline", &tokens, &labels);

        assert_eq!(tagger.lexicon["paris"], "B-LOC");
        assert_eq!(tagger.fallback, "B-LOC");
        assert_eq!(
            tagger.predict(&[vec!["PARIS".to_string(), "unseen".to_string()]]),
            vec![vec!["B-LOC".to_string(), "B-LOC".to_string()]]
        );
    }

    #[tokio::test]
    async fn trains_writes_artifact_and_evaluates() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let train = Dataset::from_items(vec![
            item("Abebe lives in Addis", "B-PER O O B-LOC"),
            item("Abebe is here", "B-PER O O"),
            item("in Addis today", "O B-LOC O"),
        ])?;
        let eval = Dataset::from_items(vec![item("Abebe in Addis", "B-PER O B-LOC")])?;

        let model = Baseline::new("baseline", None);
        let trainer = model.train(&train, &eval, dir.path()).await?;
        let metrics = trainer.evaluate().await?;

        assert_eq!(metrics[EVAL_F1], 1.0);
        assert_eq!(metrics["eval_samples"], 1.0);

        let saved: Tagger = files::read_json(&dir.path().join(MODEL_FILE)).await?;
        assert_eq!(saved.identifier, "baseline");

        Ok(())
    }

    #[tokio::test]
    async fn empty_training_set_is_rejected() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let model = Baseline::new("baseline", None);

        let result = model
            .train(&Dataset::default(), &Dataset::default(), dir.path())
            .await;

        assert!(matches!(result, Err(TrainingError::EmptyDataset(_))));

        Ok(())
    }
}
