use std::{borrow::Cow, fmt::Display, path::Path};

use derive_new::new;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::{fs, io};

use crate::utils::files;

use super::DataFormatError;

/// A single NER tag, either a label name (`"B-PER"`) or an integer class id
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tag {
    /// An integer class id, resolved through a label list
    Id(u32),

    /// A label name
    Label(String),
}

impl Tag {
    /// Resolve the tag to a label name. Ids without a matching entry in `label_names` are
    /// rendered as their number, which the entity metrics treat as outside any entity.
    pub fn resolve<'a>(&'a self, label_names: Option<&'a [String]>) -> Cow<'a, str> {
        match self {
            Tag::Label(label) => Cow::Borrowed(label.as_str()),
            Tag::Id(id) => match label_names.and_then(|names| names.get(*id as usize)) {
                Some(name) => Cow::Borrowed(name.as_str()),
                None => Cow::Owned(id.to_string()),
            },
        }
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tag::Id(id) => write!(f, "{}", id),
            Tag::Label(label) => write!(f, "{}", label),
        }
    }
}

impl From<&str> for Tag {
    fn from(label: &str) -> Self {
        Tag::Label(label.to_string())
    }
}

/// One sentence with its aligned tags
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, new)]
pub struct Item {
    /// The sentence tokens
    pub tokens: Vec<String>,

    /// One tag per token
    pub ner_tags: Vec<Tag>,
}

/// A sentence record as it appears on disk, before validation
#[derive(Deserialize)]
struct Record {
    tokens: Option<Vec<String>>,
    ner_tags: Option<Vec<Tag>>,
}

/// A token classification dataset held as two aligned, parallel lists
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    tokens: Vec<Vec<String>>,
    ner_tags: Vec<Vec<Tag>>,
}

impl Dataset {
    /// Build a dataset from parallel lists, checking that every sentence is aligned
    pub fn new(tokens: Vec<Vec<String>>, ner_tags: Vec<Vec<Tag>>) -> Result<Self, DataFormatError> {
        if tokens.len() != ner_tags.len() {
            return Err(DataFormatError::SentenceCountMismatch {
                tokens: tokens.len(),
                tags: ner_tags.len(),
            });
        }

        for (index, (words, tags)) in tokens.iter().zip(&ner_tags).enumerate() {
            if words.len() != tags.len() {
                return Err(DataFormatError::LengthMismatch {
                    index,
                    tokens: words.len(),
                    tags: tags.len(),
                });
            }
        }

        Ok(Self { tokens, ner_tags })
    }

    /// Build a dataset from sentence items
    pub fn from_items(items: Vec<Item>) -> Result<Self, DataFormatError> {
        let (tokens, ner_tags): (Vec<_>, Vec<_>) = items
            .into_iter()
            .map(|item| (item.tokens, item.ner_tags))
            .unzip();

        Self::new(tokens, ner_tags)
    }

    /// Load a dataset from a JSON array of `{"tokens": [...], "ner_tags": [...]}` records
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DataFormatError> {
        let path = path.as_ref();

        let bytes = fs::read(path).await.map_err(|source| DataFormatError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let records: Vec<Record> =
            serde_json::from_slice(&bytes).map_err(|source| DataFormatError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut tokens = Vec::with_capacity(records.len());
        let mut ner_tags = Vec::with_capacity(records.len());

        for (index, record) in records.into_iter().enumerate() {
            tokens.push(record.tokens.ok_or(DataFormatError::MissingField {
                index,
                field: "tokens",
            })?);
            ner_tags.push(record.ner_tags.ok_or(DataFormatError::MissingField {
                index,
                field: "ner_tags",
            })?);
        }

        let dataset = Self::new(tokens, ner_tags)?;

        debug!("Loaded {} sentences from {}", dataset.len(), path.display());

        Ok(dataset)
    }

    /// Save the dataset in the same record format that [`Dataset::load`] reads
    pub async fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        files::write_json(path.as_ref(), &self.items().collect::<Vec<_>>()).await
    }

    /// Returns a specific sentence from the dataset
    pub fn get(&self, index: usize) -> Option<Item> {
        Some(Item::new(
            self.tokens.get(index)?.clone(),
            self.ner_tags.get(index)?.clone(),
        ))
    }

    /// Returns the number of sentences
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the dataset has no sentences
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The token lists, one per sentence
    pub fn tokens(&self) -> &[Vec<String>] {
        &self.tokens
    }

    /// The tag lists, one per sentence
    pub fn ner_tags(&self) -> &[Vec<Tag>] {
        &self.ner_tags
    }

    /// Iterate over sentences as owned items
    pub fn items(&self) -> impl Iterator<Item = Item> + '_ {
        self.tokens
            .iter()
            .zip(&self.ner_tags)
            .map(|(tokens, tags)| Item::new(tokens.clone(), tags.clone()))
    }

    /// Resolve every tag to its label name
    pub fn labels(&self, label_names: Option<&[String]>) -> Vec<Vec<String>> {
        self.ner_tags
            .iter()
            .map(|tags| {
                tags.iter()
                    .map(|tag| tag.resolve(label_names).into_owned())
                    .collect()
            })
            .collect()
    }

    /// Split into train and test partitions.
    ///
    /// Sentence indices are shuffled once with a generator seeded from `seed`, and the same
    /// permutation selects both tokens and tags, so every sentence keeps its tags. The test
    /// partition receives the first `ceil(len * test_size)` shuffled sentences, the train
    /// partition the rest.
    pub fn train_test_split(
        &self,
        test_size: f64,
        seed: u64,
    ) -> Result<(Dataset, Dataset), DataFormatError> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(DataFormatError::InvalidTestSize(test_size));
        }

        let n_samples = self.len();
        let n_test = (n_samples as f64 * test_size).ceil() as usize;

        if n_test == 0 || n_test >= n_samples {
            return Err(DataFormatError::TooFewSentences {
                sentences: n_samples,
                test_size,
            });
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let (test_indices, train_indices) = indices.split_at(n_test);

        Ok((self.select(train_indices), self.select(test_indices)))
    }

    fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            tokens: indices.iter().map(|&i| self.tokens[i].clone()).collect(),
            ner_tags: indices.iter().map(|&i| self.ner_tags[i].clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn sentence(words: &[&str], tags: &[&str]) -> Item {
        Item::new(
            words.iter().map(|w| w.to_string()).collect(),
            tags.iter().map(|&t| Tag::from(t)).collect(),
        )
    }

    fn numbered(n: usize) -> Dataset {
        let items = (0..n)
            .map(|i| {
                let word = format!("w{}", i);
                let tag = format!("B-T{}", i);
                sentence(&[word.as_str(), "x"], &[tag.as_str(), "O"])
            })
            .collect();

        Dataset::from_items(items).unwrap()
    }

    async fn write(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("dataset.json");
        fs::write(&path, contents).await.unwrap();
        path
    }

    #[tokio::test]
    async fn loads_parallel_lists_in_order() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write(
            &dir,
            r#"[
                {"id": "0", "tokens": ["Abebe", "went", "home"], "ner_tags": ["B-PER", "O", "O"]},
                {"id": "1", "tokens": ["Addis", "Ababa"], "ner_tags": [5, 6]}
            ]"#,
        )
        .await;

        let dataset = Dataset::load(&path).await?;

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.tokens().len(), dataset.ner_tags().len());
        for (words, tags) in dataset.tokens().iter().zip(dataset.ner_tags()) {
            assert_eq!(words.len(), tags.len());
        }
        assert_eq!(dataset.tokens()[0][0], "Abebe");
        assert_eq!(dataset.ner_tags()[1], vec![Tag::Id(5), Tag::Id(6)]);

        Ok(())
    }

    #[tokio::test]
    async fn missing_ner_tags_is_a_format_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write(
            &dir,
            r#"[
                {"tokens": ["a"], "ner_tags": ["O"]},
                {"tokens": ["b"]}
            ]"#,
        )
        .await;

        let err = Dataset::load(&path).await.unwrap_err();
        assert!(matches!(
            err,
            DataFormatError::MissingField {
                index: 1,
                field: "ner_tags"
            }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn misaligned_sentence_is_rejected() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write(&dir, r#"[{"tokens": ["a", "b"], "ner_tags": ["O"]}]"#).await;

        let err = Dataset::load(&path).await.unwrap_err();
        assert!(matches!(
            err,
            DataFormatError::LengthMismatch {
                index: 0,
                tokens: 2,
                tags: 1
            }
        ));

        Ok(())
    }

    #[test]
    fn unequal_sentence_counts_are_rejected() {
        let err = Dataset::new(
            vec![vec!["a".to_string()], vec!["b".to_string()]],
            vec![vec![Tag::from("O")]],
        )
        .unwrap_err();

        assert!(matches!(
            err,
            DataFormatError::SentenceCountMismatch { tokens: 2, tags: 1 }
        ));
        assert_eq!(err.to_string(), "found 2 token sentences but 1 tag sentences");
    }

    #[tokio::test]
    async fn missing_or_malformed_files_are_format_errors() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;

        let missing = Dataset::load(dir.path().join("nope.json")).await.unwrap_err();
        assert!(matches!(missing, DataFormatError::Read { .. }));

        let path = write(&dir, r#"{"tokens": []}"#).await;
        let malformed = Dataset::load(&path).await.unwrap_err();
        assert!(matches!(malformed, DataFormatError::Parse { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn save_writes_loadable_records() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("splits/train.json");
        let dataset = numbered(3);

        dataset.save(&path).await?;

        assert_eq!(Dataset::load(&path).await?, dataset);

        Ok(())
    }

    #[test]
    fn split_sizes_follow_test_fraction() {
        let dataset = numbered(10);

        let (train, test) = dataset.train_test_split(0.2, 42).unwrap();
        assert_eq!((train.len(), test.len()), (8, 2));

        let dataset = numbered(11);
        let (train, test) = dataset.train_test_split(0.2, 42).unwrap();
        assert_eq!((train.len(), test.len()), (8, 3));
    }

    #[test]
    fn split_is_reproducible_for_a_seed() {
        let dataset = numbered(25);

        let first = dataset.train_test_split(0.2, 42).unwrap();
        let second = dataset.train_test_split(0.2, 42).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn split_keeps_tokens_and_tags_aligned() {
        let dataset = numbered(30);
        let expected: HashMap<String, Tag> = dataset
            .items()
            .map(|item| (item.tokens[0].clone(), item.ner_tags[0].clone()))
            .collect();

        let (train, test) = dataset.train_test_split(0.2, 7).unwrap();

        let mut seen = Vec::new();
        for part in [&train, &test] {
            for item in part.items() {
                assert_eq!(item.tokens.len(), item.ner_tags.len());
                assert_eq!(expected[&item.tokens[0]], item.ner_tags[0]);
                seen.push(item.tokens[0].clone());
            }
        }

        seen.sort();
        let mut all: Vec<_> = expected.keys().cloned().collect();
        all.sort();
        assert_eq!(seen, all);
    }

    #[test]
    fn split_rejects_degenerate_inputs() {
        assert!(matches!(
            numbered(1).train_test_split(0.2, 42),
            Err(DataFormatError::TooFewSentences { .. })
        ));
        assert!(matches!(
            numbered(10).train_test_split(1.0, 42),
            Err(DataFormatError::InvalidTestSize(_))
        ));
    }

    #[test]
    fn ids_resolve_through_label_names() {
        let names = vec!["O".to_string(), "B-LOC".to_string()];

        assert_eq!(Tag::Id(1).resolve(Some(names.as_slice())), "B-LOC");
        assert_eq!(Tag::Id(9).resolve(Some(names.as_slice())), "9");
        assert_eq!(Tag::from("I-PER").resolve(None), "I-PER");
    }
}
