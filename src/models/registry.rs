use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::utils::OrderedMap;

/// xlm-roberta-base
pub static XLM_ROBERTA_BASE: &str = "xlm-roberta-base";

/// distilbert-base-multilingual-cased
pub static DISTILBERT_MULTILINGUAL_CASED: &str = "distilbert-base-multilingual-cased";

/// bert-base-multilingual-cased
pub static BERT_MULTILINGUAL_CASED: &str = "bert-base-multilingual-cased";

/// The models compared when no registry is configured, as (name, identifier) pairs
pub static DEFAULT_MODELS: &[(&str, &str); 3] = &[
    ("xlm-roberta", XLM_ROBERTA_BASE),
    ("distilbert", DISTILBERT_MULTILINGUAL_CASED),
    ("mbert", BERT_MULTILINGUAL_CASED),
];

/// Short model names mapped to pretrained model identifiers, in comparison order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelRegistry(OrderedMap<String>);

impl ModelRegistry {
    /// The pretrained identifier registered under `name`
    pub fn identifier(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        DEFAULT_MODELS.iter().copied().collect()
    }
}

impl<N: Into<String>, I: Into<String>> FromIterator<(N, I)> for ModelRegistry {
    fn from_iter<T: IntoIterator<Item = (N, I)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(n, i)| (n, i.into())).collect())
    }
}

impl Deref for ModelRegistry {
    type Target = OrderedMap<String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
