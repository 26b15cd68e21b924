use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::VectorFormat;
use crate::shared::SharedMatrix;
use crate::vocab::{Vocab, VocabWord};
use crate::real;

/// Everything a trained model knows, in a form bincode can store.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelSnapshot {
    /// Embedding vector length.
    pub size: usize,
    pub vocab: Vec<VocabWord>,
    /// `embeddings[k * size..(k+1) * size]` is the vector for word `k`.
    pub embeddings: Vec<real>,
    /// Negative-sampling output weights, laid out like `embeddings`.
    pub weights: Vec<real>,
}

impl ModelSnapshot {
    pub fn load(filename: &Path) -> Result<Self> {
        let f = BufReader::new(
            File::open(filename)
                .with_context(|| format!("failed to open model file {filename:?}"))?,
        );
        bincode::deserialize_from(f)
            .with_context(|| format!("failed to load model from file {filename:?}"))
    }

    /// The embedding of word `k`.
    pub fn vector(&self, k: usize) -> &[real] {
        &self.embeddings[k * self.size..][..self.size]
    }
}

/// Writes the word vectors (`embeddings`) in `format`.
pub fn write_vectors<W: Write>(
    mut fo: W,
    vocab: &Vocab,
    embeddings: &SharedMatrix,
    weights: &SharedMatrix,
    format: VectorFormat,
) -> Result<()> {
    let layer1_size = embeddings.cols();
    match format {
        VectorFormat::Bincode => {
            let snapshot = ModelSnapshot {
                size: layer1_size,
                vocab: vocab.words().to_vec(),
                embeddings: embeddings.to_vec(),
                weights: weights.to_vec(),
            };
            bincode::serialize_into(&mut fo, &snapshot).context("error writing output file")?;
        }
        VectorFormat::Text | VectorFormat::Binary => {
            writeln!(fo, "{} {}", vocab.len(), layer1_size).context("error writing output file")?;
            for (a, vw) in vocab.words().iter().enumerate() {
                write!(fo, "{} ", vw.word).context("error writing output file")?;
                let mut word_vec = embeddings.row_values(a);
                if format == VectorFormat::Binary {
                    for x in &mut word_vec {
                        *x = real::from_bits(x.to_bits().to_le());
                    }
                    fo.write_all(bytemuck::cast_slice::<real, u8>(&word_vec))
                        .context("error writing output file")?;
                } else {
                    for f in word_vec {
                        write!(fo, "{} ", f).context("error writing output file")?;
                    }
                }
                writeln!(fo).context("error writing output file")?;
            }
        }
    }
    fo.flush().context("error writing output file")?;
    Ok(())
}

pub fn save_vectors(
    output_file: &Path,
    vocab: &Vocab,
    embeddings: &SharedMatrix,
    weights: &SharedMatrix,
    format: VectorFormat,
) -> Result<()> {
    let fo = BufWriter::new(File::create(output_file).context("error creating output file")?);
    write_vectors(fo, vocab, embeddings, weights, format)
}
