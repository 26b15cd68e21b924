use std::path::PathBuf;

use crate::error::{Error, Feature};
use crate::real;

/// How the context is combined when predicting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    SkipGram,
    /// Continuous bag of words. Not implemented.
    Cbow,
}

/// How the output layer is trained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    NegativeSampling,
    /// Not implemented.
    HierarchicalSoftmax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorFormat {
    /// `word v0 v1 ...` lines, preceded by a `vocab_size size` header.
    Text,
    /// Like `Text`, but each vector is written as raw little-endian `f32`s on every platform.
    Binary,
    /// A bincode [`ModelSnapshot`](crate::ModelSnapshot) holding both matrices.
    Bincode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Vectors(VectorFormat),
    /// K-means word classes. Not implemented.
    Classes(usize),
}

/// Everything needed for one training run.
#[derive(Debug, Clone)]
pub struct Config {
    pub train_file: PathBuf,
    pub output_file: Option<PathBuf>,
    pub save_vocab_file: Option<PathBuf>,
    pub read_vocab_file: Option<PathBuf>,
    pub architecture: Architecture,
    pub objective: Objective,
    pub output_mode: OutputMode,
    /// Size of word vectors.
    pub layer1_size: usize,
    /// Max skip length between words.
    pub window: usize,
    /// Threshold for occurrence of words; 0 disables subsampling.
    pub sample: real,
    /// Number of negative examples per positive pair.
    pub negative: usize,
    /// Starting learning rate.
    pub alpha: real,
    pub iter: usize,
    pub num_threads: usize,
    /// Words occurring fewer times are discarded.
    pub min_count: u64,
    pub debug_mode: usize,
    /// Seeds embedding initialization and the per-thread random streams.
    pub seed: u64,
}

impl Config {
    /// A configuration with the usual word2vec defaults.
    pub fn new(train_file: impl Into<PathBuf>, output_file: impl Into<PathBuf>) -> Self {
        Config {
            train_file: train_file.into(),
            output_file: Some(output_file.into()),
            save_vocab_file: None,
            read_vocab_file: None,
            architecture: Architecture::SkipGram,
            objective: Objective::NegativeSampling,
            output_mode: OutputMode::Vectors(VectorFormat::Text),
            layer1_size: 100,
            window: 5,
            sample: 1e-3,
            negative: 5,
            alpha: 0.025,
            iter: 5,
            num_threads: 12,
            min_count: 5,
            debug_mode: 2,
            seed: 0,
        }
    }

    /// Rejects configurations that can't be trained, before any work is done.
    pub fn validate(&self) -> Result<(), Error> {
        if self.output_file.is_none() {
            return Err(Error::MissingOutputFile);
        }
        if self.architecture == Architecture::Cbow {
            return Err(Error::Unsupported(Feature::Cbow));
        }
        if self.objective == Objective::HierarchicalSoftmax {
            return Err(Error::Unsupported(Feature::HierarchicalSoftmax));
        }
        if let OutputMode::Classes(_) = self.output_mode {
            return Err(Error::Unsupported(Feature::Classes));
        }
        if self.layer1_size == 0 {
            return Err(Error::InvalidOption {
                name: "size",
                reason: "vectors must have at least one dimension",
            });
        }
        if self.window == 0 {
            return Err(Error::InvalidOption {
                name: "window",
                reason: "must be at least 1",
            });
        }
        if self.num_threads == 0 {
            return Err(Error::InvalidOption {
                name: "threads",
                reason: "must be at least 1",
            });
        }
        if self.iter == 0 {
            return Err(Error::InvalidOption {
                name: "iter",
                reason: "must be at least 1",
            });
        }
        if !(self.sample >= 0.0) {
            return Err(Error::InvalidOption {
                name: "sample",
                reason: "must not be negative",
            });
        }
        Ok(())
    }

    pub fn vector_format(&self) -> VectorFormat {
        match self.output_mode {
            OutputMode::Vectors(format) => format,
            OutputMode::Classes(_) => VectorFormat::Text,
        }
    }
}
