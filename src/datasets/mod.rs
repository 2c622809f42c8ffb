use std::path::PathBuf;

/// CoNLL-style token/tag datasets
pub mod conll;

pub use conll::{Dataset, Item, Tag};

/// The dataset file could not be turned into a valid [`Dataset`]
#[derive(thiserror::Error, Debug)]
pub enum DataFormatError {
    /// The file could not be read
    #[error("unable to read dataset {}: {source}", .path.display())]
    Read {
        /// The dataset path
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// The file is not a JSON array of sentence records
    #[error("unable to parse dataset {}: {source}", .path.display())]
    Parse {
        /// The dataset path
        path: PathBuf,
        /// The underlying parse error
        source: serde_json::Error,
    },

    /// A sentence record lacks a required field
    #[error("sentence {index} is missing the `{field}` field")]
    MissingField {
        /// Position of the sentence in the file
        index: usize,
        /// Name of the missing field
        field: &'static str,
    },

    /// A sentence has a different number of tokens and tags
    #[error("sentence {index} has {tokens} tokens but {tags} tags")]
    LengthMismatch {
        /// Position of the sentence in the file
        index: usize,
        /// Number of tokens
        tokens: usize,
        /// Number of tags
        tags: usize,
    },

    /// The token and tag lists hold a different number of sentences
    #[error("found {tokens} token sentences but {tags} tag sentences")]
    SentenceCountMismatch {
        /// Number of token sentences
        tokens: usize,
        /// Number of tag sentences
        tags: usize,
    },

    /// The requested test fraction is not strictly between 0 and 1
    #[error("test size must be between 0 and 1, got {0}")]
    InvalidTestSize(f64),

    /// Not enough sentences to produce non-empty train and test partitions
    #[error("cannot split {sentences} sentences with test size {test_size}")]
    TooFewSentences {
        /// Number of sentences in the dataset
        sentences: usize,
        /// The requested test fraction
        test_size: f64,
    },
}
