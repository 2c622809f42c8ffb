use std::path::Path;

use serde::Serialize;

use crate::{
    metrics::{EVAL_ACCURACY, EVAL_F1, EVAL_PRECISION, EVAL_RECALL},
    models::ModelRegistry,
};

use super::ComparisonResults;

/// One CSV row per compared model
#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    model: &'a str,
    identifier: Option<&'a str>,
    eval_f1: Option<f64>,
    eval_precision: Option<f64>,
    eval_recall: Option<f64>,
    eval_accuracy: Option<f64>,
}

/// Write a flat CSV table of the headline metrics, in run order. Metrics a backend did not
/// report are left empty.
pub fn write_summary_csv(
    path: &Path,
    registry: &ModelRegistry,
    results: &ComparisonResults,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;

    for (name, metrics) in results.iter() {
        writer.serialize(SummaryRow {
            model: name,
            identifier: registry.identifier(name),
            eval_f1: metrics.get(EVAL_F1).copied(),
            eval_precision: metrics.get(EVAL_PRECISION).copied(),
            eval_recall: metrics.get(EVAL_RECALL).copied(),
            eval_accuracy: metrics.get(EVAL_ACCURACY).copied(),
        })?;
    }

    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::metrics::MetricsRecord;

    use super::*;

    #[test]
    fn writes_one_row_per_model() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("summary.csv");

        let registry = ModelRegistry::default();
        let results: ComparisonResults = [
            (
                "mbert",
                MetricsRecord::from([(EVAL_F1.to_string(), 0.5), (EVAL_RECALL.to_string(), 0.4)]),
            ),
            ("local", MetricsRecord::from([(EVAL_F1.to_string(), 0.25)])),
        ]
        .into_iter()
        .collect();

        write_summary_csv(&path, &registry, &results)?;

        let contents = std::fs::read_to_string(&path)?;
        assert_eq!(
            contents.lines().collect::<Vec<_>>(),
            vec![
                "model,identifier,eval_f1,eval_precision,eval_recall,eval_accuracy",
                "mbert,bert-base-multilingual-cased,0.5,,0.4,",
                "local,,0.25,,,",
            ]
        );

        Ok(())
    }
}
