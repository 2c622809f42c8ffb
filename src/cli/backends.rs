use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The unique string token that identifies the external command backend
pub static COMMAND: &str = "command";

/// The unique string token that identifies the in-process baseline backend
pub static BASELINE: &str = "baseline";

/// Available training backends
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Fine-tune by running an external program per model
    #[default]
    Command,

    /// Most-frequent-tag tagger trained in process
    Baseline,
}

impl TryFrom<&str> for Backend {
    type Error = BackendError;

    /// Try to convert a string to a Backend
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            v if v == COMMAND => Ok(Backend::Command),
            v if v == BASELINE => Ok(Backend::Baseline),
            _ => Err(BackendError::Unknown(value.to_string())),
        }
    }
}

impl Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Backend::Command => COMMAND,
            Backend::Baseline => BASELINE,
        };

        write!(f, "{}", name)
    }
}

/// Backend Error
#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    /// No backend found for the given string
    #[error("no backend found for {0}")]
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_known_backends_case_insensitively() {
        assert_eq!(Backend::try_from("Baseline").unwrap(), Backend::Baseline);
        assert_eq!(Backend::try_from("command").unwrap(), Backend::Command);
        assert!(Backend::try_from("tch").is_err());
    }

    #[test]
    fn display_round_trips() {
        for backend in [Backend::Command, Backend::Baseline] {
            assert_eq!(Backend::try_from(backend.to_string().as_str()).unwrap(), backend);
        }
    }
}
