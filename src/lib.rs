//! Skip-gram word embeddings trained with negative sampling.
//!
//! The pipeline is: build a [`Vocab`] from the corpus (or load a saved one),
//! allocate the embedding matrices, then let [`Word2Vec::train`] run one
//! worker thread per corpus partition. Workers share the matrices without
//! locks; see [`shared`] for how that is made sound.

mod config;
mod error;
mod output;
mod query;
mod reader;
mod rng;
pub mod shared;
mod tables;
mod train;
mod vectors;
mod vocab;

pub use config::{Architecture, Config, Objective, OutputMode, VectorFormat};
pub use error::{Error, Feature};
pub use output::{save_vectors, ModelSnapshot};
pub use query::{run_queries, QueryError, QueryKind};
pub use reader::{WordReader, MAX_STRING};
pub use rng::Rng;
pub use tables::{SigmoidTable, UnigramTable, EXP_TABLE_SIZE, MAX_EXP, TABLE_SIZE};
pub use train::{train_model, Word2Vec, MAX_SENTENCE_LENGTH};
pub use vectors::{dot, norm, normalize, Vectors};
pub use vocab::{Vocab, VocabWord, SENTENCE_END, VOCAB_HASH_SIZE};

#[allow(non_camel_case_types)]
pub type real = f32; // Precision of float numbers
