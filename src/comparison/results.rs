use std::{ops::Deref, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    metrics::{MetricsRecord, EVAL_F1},
    utils::OrderedMap,
};

/// Metrics per model name, in the order the models were run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComparisonResults(OrderedMap<MetricsRecord>);

impl ComparisonResults {
    /// Create empty results
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a model's metrics, replacing any earlier record for the same name
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        metrics: MetricsRecord,
    ) -> Option<MetricsRecord> {
        self.0.insert(name, metrics)
    }

    /// The model whose `eval_f1` is strictly greater than `threshold` and than every model
    /// before it. Ties keep the earlier model.
    pub fn best_above(&self, threshold: f64) -> Option<&str> {
        let mut best = None;
        let mut best_f1 = threshold;

        for (name, metrics) in self.iter() {
            if let Some(&f1) = metrics.get(EVAL_F1) {
                if f1 > best_f1 {
                    best_f1 = f1;
                    best = Some(name);
                }
            }
        }

        best
    }

    /// Read results previously written with [`ComparisonResults::save`]
    pub async fn load(path: &Path) -> std::io::Result<Self> {
        crate::utils::files::read_json(path).await
    }

    /// Write results as pretty-printed JSON
    pub async fn save(&self, path: &Path) -> std::io::Result<()> {
        crate::utils::files::write_json(path, self).await
    }
}

impl<N: Into<String>> FromIterator<(N, MetricsRecord)> for ComparisonResults {
    fn from_iter<T: IntoIterator<Item = (N, MetricsRecord)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Deref for ComparisonResults {
    type Target = OrderedMap<MetricsRecord>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn f1(value: f64) -> MetricsRecord {
        MetricsRecord::from([(EVAL_F1.to_string(), value)])
    }

    fn results(scores: &[(&str, f64)]) -> ComparisonResults {
        scores.iter().map(|&(name, score)| (name, f1(score))).collect()
    }

    #[test]
    fn best_keeps_first_of_equal_scores() {
        let results = results(&[("a", 0.7), ("b", 0.9), ("c", 0.9)]);

        assert_eq!(results.best_above(0.0), Some("b"));
    }

    #[test]
    fn best_of_empty_results_is_none() {
        assert_eq!(ComparisonResults::new().best_above(0.0), None);
    }

    #[test]
    fn non_positive_scores_need_a_lower_threshold() {
        let results = results(&[("a", -1.0), ("b", -2.0)]);

        assert_eq!(results.best_above(0.0), None);
        assert_eq!(results.best_above(f64::NEG_INFINITY), Some("a"));
    }

    #[tokio::test]
    async fn save_and_load_round_trip() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("results/comparison.json");

        let mut results = results(&[("xlm-roberta", 0.81), ("distilbert", 0.77)]);
        results.insert(
            "mbert",
            MetricsRecord::from([
                (EVAL_F1.to_string(), 0.79),
                ("eval_loss".to_string(), 0.21),
            ]),
        );

        results.save(&path).await?;
        let loaded = ComparisonResults::load(&path).await?;

        assert_eq!(loaded, results);
        assert_eq!(
            loaded.keys().collect::<Vec<_>>(),
            vec!["xlm-roberta", "distilbert", "mbert"]
        );

        Ok(())
    }
}
