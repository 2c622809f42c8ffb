use std::collections::{BTreeMap, HashSet};

/// Entity chunk extraction
pub mod entities;

pub use entities::{extract, Entity};

/// A metric name to value mapping produced by one model evaluation
pub type MetricsRecord = BTreeMap<String, f64>;

/// The metric that selects the best model
pub static EVAL_F1: &str = "eval_f1";

/// Entity-level precision
pub static EVAL_PRECISION: &str = "eval_precision";

/// Entity-level recall
pub static EVAL_RECALL: &str = "eval_recall";

/// Token-level accuracy
pub static EVAL_ACCURACY: &str = "eval_accuracy";

/// Gold and predicted tag sequences could not be compared
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum MetricsError {
    /// Different number of sentences
    #[error("expected predictions for {expected} sentences, found {found}")]
    SentenceCount {
        /// Gold sentence count
        expected: usize,
        /// Predicted sentence count
        found: usize,
    },

    /// Different number of tags within a sentence
    #[error("sentence {index} has {expected} gold tags but {found} predicted tags")]
    TagCount {
        /// Position of the sentence
        index: usize,
        /// Gold tag count
        expected: usize,
        /// Predicted tag count
        found: usize,
    },
}

/// Micro-averaged entity scores plus token accuracy
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Scores {
    /// Correct predicted entities over all predicted entities
    pub precision: f64,

    /// Correct predicted entities over all gold entities
    pub recall: f64,

    /// Harmonic mean of precision and recall
    pub f1: f64,

    /// Correct tags over all tags
    pub accuracy: f64,
}

impl Scores {
    /// Convert into the `eval_`-prefixed record shape that trainers report
    pub fn to_record(&self) -> MetricsRecord {
        BTreeMap::from([
            (EVAL_PRECISION.to_string(), self.precision),
            (EVAL_RECALL.to_string(), self.recall),
            (EVAL_F1.to_string(), self.f1),
            (EVAL_ACCURACY.to_string(), self.accuracy),
        ])
    }
}

/// Score predicted tag sequences against gold sequences.
///
/// An entity counts as correct only when its type and its exact span match a gold entity.
/// Ratios with a zero denominator are reported as 0.
pub fn evaluate<G, P>(gold: &[Vec<G>], predicted: &[Vec<P>]) -> Result<Scores, MetricsError>
where
    G: AsRef<str>,
    P: AsRef<str>,
{
    if gold.len() != predicted.len() {
        return Err(MetricsError::SentenceCount {
            expected: gold.len(),
            found: predicted.len(),
        });
    }

    let mut gold_entities = HashSet::new();
    let mut predicted_entities = HashSet::new();
    let mut correct_tags = 0usize;
    let mut total_tags = 0usize;

    for (index, (gold_tags, predicted_tags)) in gold.iter().zip(predicted).enumerate() {
        if gold_tags.len() != predicted_tags.len() {
            return Err(MetricsError::TagCount {
                index,
                expected: gold_tags.len(),
                found: predicted_tags.len(),
            });
        }

        correct_tags += gold_tags
            .iter()
            .zip(predicted_tags)
            .filter(|(g, p)| g.as_ref() == p.as_ref())
            .count();
        total_tags += gold_tags.len();

        gold_entities.extend(extract(gold_tags).into_iter().map(|e| (index, e)));
        predicted_entities.extend(extract(predicted_tags).into_iter().map(|e| (index, e)));
    }

    let true_positives = gold_entities.intersection(&predicted_entities).count();

    let precision = ratio(true_positives, predicted_entities.len());
    let recall = ratio(true_positives, gold_entities.len());
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Ok(Scores {
        precision,
        recall,
        f1,
        accuracy: ratio(correct_tags, total_tags),
    })
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
