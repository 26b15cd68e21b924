use std::fmt;

use thiserror::Error;

/// Modes that the option surface recognises but training does not implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Cbow,
    HierarchicalSoftmax,
    Classes,
    VocabularyReduction,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Feature::Cbow => "the continuous bag of words architecture",
            Feature::HierarchicalSoftmax => "hierarchical softmax",
            Feature::Classes => "word class (k-means) output",
            Feature::VocabularyReduction => "vocabulary reduction",
        })
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("no output file specified")]
    MissingOutputFile,

    #[error("{0} is not supported")]
    Unsupported(Feature),

    #[error("invalid value for --{name}: {reason}")]
    InvalidOption {
        name: &'static str,
        reason: &'static str,
    },

    #[error("vocabulary file syntax error on line {line}: {reason}")]
    MalformedVocabLine { line: usize, reason: String },

    #[error("vocabulary file lists {word:?} twice (line {line})")]
    DuplicateVocabWord { line: usize, word: String },
}
