use std::cmp::Reverse;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::ops::Index;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use ordered_float::OrderedFloat;

use crate::vocab::is_separator;

/// Trained word vectors, loaded back from an output file and normalized to
/// unit length.
pub struct Vectors {
    /// Embedding vector length (number of dimensions).
    size: usize,

    /// The vocabulary.
    vocab: Vec<String>,

    /// `embeddings[k * size..(k+1) * size]` is the vector embedding for word `k`.
    embeddings: Vec<f32>,
}

pub fn norm(v: &[f32]) -> f32 {
    v.iter().copied().map(|e| e * e).sum::<f32>().sqrt()
}

/// Scales `v` to unit length. All-zero vectors are left alone.
pub fn normalize(v: &mut [f32]) {
    let len = norm(v);
    if len > 0.0 {
        for e in v {
            *e /= len;
        }
    }
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(&a, &b)| a * b).sum()
}

impl Index<usize> for Vectors {
    type Output = [f32];

    fn index(&self, i: usize) -> &[f32] {
        &self.embeddings[i * self.size..][..self.size]
    }
}

fn parse_header(line: &str) -> Result<(usize, usize)> {
    let mut fields = line.split_whitespace();
    let mut next_number = || -> Result<usize> {
        fields
            .next()
            .ok_or_else(|| anyhow!("invalid input file: missing header"))?
            .parse()
            .context("invalid input file: bad header")
    };
    let num_words = next_number()?;
    let size = next_number()?;
    Ok((num_words, size))
}

impl Vectors {
    /// Loads a vector file written in the text format, or in the binary
    /// format if `binary` is set.
    pub fn load(file_name: &Path, binary: bool) -> Result<Self> {
        let f = BufReader::new(File::open(file_name).context("error opening input file")?);
        Self::read(f, binary)
    }

    pub fn read<R: BufRead>(mut f: R, binary: bool) -> Result<Self> {
        let mut line = String::new();
        f.read_line(&mut line).context("error reading input file")?;
        let (num_words, size) = parse_header(&line)?;

        let mut vocab: Vec<String> = Vec::with_capacity(num_words);
        let mut m = vec![0.0; num_words * size];
        for b in 0..num_words {
            let row = &mut m[b * size..][..size];
            let word = if binary {
                let mut vocab_word = Vec::<u8>::new();
                let count = f
                    .read_until(b' ', &mut vocab_word)
                    .context("error reading input file")?;
                if count == 0 {
                    break;
                }
                if vocab_word.last() == Some(&b' ') {
                    vocab_word.pop();
                }
                vocab_word.retain(|c| *c != b'\n');
                f.read_exact(bytemuck::cast_slice_mut::<f32, u8>(row))
                    .context("error reading input file")?;
                for x in row.iter_mut() {
                    *x = f32::from_bits(u32::from_le(x.to_bits()));
                }
                String::from_utf8(vocab_word).context("invalid word in input file")?
            } else {
                line.clear();
                if f.read_line(&mut line).context("error reading input file")? == 0 {
                    break;
                }
                let mut fields = line
                    .trim_end_matches(|c: char| c == '\n' || c == '\r')
                    .split(is_separator)
                    .filter(|field| !field.is_empty());
                let word = fields
                    .next()
                    .ok_or_else(|| anyhow!("invalid input file: empty line {}", b + 2))?
                    .to_string();
                for x in row.iter_mut() {
                    *x = fields
                        .next()
                        .ok_or_else(|| anyhow!("invalid input file: short vector for {word:?}"))?
                        .parse()
                        .with_context(|| format!("invalid input file: bad number for {word:?}"))?;
                }
                word
            };
            normalize(row);
            vocab.push(word);
        }
        m.truncate(vocab.len() * size);

        Ok(Vectors {
            size,
            vocab,
            embeddings: m,
        })
    }

    pub fn num_words(&self) -> usize {
        self.vocab.len()
    }

    /// Returns the vector size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the index for a word as string. Exact match only, case-sensitive.
    pub fn lookup_word(&self, word: &str) -> Option<usize> {
        self.vocab.iter().position(|v| v == word)
    }

    /// Get the word for a word-index. Panics if `word` is out of range.
    pub fn word(&self, word: usize) -> &str {
        &self.vocab[word]
    }

    /// Indexes of the words in `text`, or the first word that isn't in the
    /// vocabulary.
    pub fn lookup_words<'t>(&self, text: &'t str) -> Result<Vec<usize>, &'t str> {
        text.split(is_separator)
            .filter(|word| !word.is_empty())
            .map(|word| self.lookup_word(word).ok_or(word))
            .collect()
    }

    /// The normalized sum of the vectors for `words`.
    pub fn phrase(&self, words: &[usize]) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.size];
        for &i in words {
            for (v, r) in vec.iter_mut().zip(&self[i]) {
                *v += r;
            }
        }
        normalize(&mut vec);
        vec
    }

    /// The normalized `b - a + c`: "a is to b as c is to ?".
    pub fn analogy(&self, a: usize, b: usize, c: usize) -> Vec<f32> {
        let mut vec = (0..self.size)
            .map(|i| self[b][i] - self[a][i] + self[c][i])
            .collect::<Vec<f32>>();
        normalize(&mut vec);
        vec
    }

    /// The `n` words closest to `query` by cosine similarity, best first,
    /// skipping the indexes in `exclude`. `query` should be normalized.
    pub fn nearest(&self, query: &[f32], exclude: &[usize], n: usize) -> Vec<(&str, f32)> {
        let mut best: Vec<(&str, f32)> = (0..self.num_words())
            .filter(|c| !exclude.contains(c))
            .map(|c| (self.word(c), dot(query, &self[c])))
            .collect();
        best.sort_by_key(|(_word, dist)| Reverse(OrderedFloat(*dist)));
        best.truncate(n);
        best
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const TEXT: &str = "4 2\n</s> 0.1 -0.1 \nking 3 4 \nqueen 4 3 \napple -1 0 \n";

    #[test]
    fn reads_text_format() {
        let v = Vectors::read(Cursor::new(TEXT), false).unwrap();
        assert_eq!(v.num_words(), 4);
        assert_eq!(v.size(), 2);
        assert_eq!(v.lookup_word("queen"), Some(2));
        assert_eq!(v.word(1), "king");
        assert!((v[1][0] - 0.6).abs() < 1e-6);
        assert!((norm(&v[3]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn reads_binary_format() {
        let mut data = b"2 2\n".to_vec();
        for (word, row) in [("a", [1.0f32, 0.0]), ("b", [0.0, 2.0])] {
            data.extend_from_slice(word.as_bytes());
            data.push(b' ');
            for x in row {
                data.extend_from_slice(&x.to_le_bytes());
            }
            data.push(b'\n');
        }
        let v = Vectors::read(Cursor::new(data), true).unwrap();
        assert_eq!(v.word(1), "b");
        assert_eq!(&v[1], [0.0, 1.0]);
    }

    #[test]
    fn nearest_ranks_by_cosine() {
        let v = Vectors::read(Cursor::new(TEXT), false).unwrap();
        let king = v.lookup_word("king").unwrap();
        let best = v.nearest(&v[king], &[king], 2);
        assert_eq!(best[0].0, "queen");
        assert!((best[0].1 - 0.96).abs() < 1e-5);
        assert_eq!(best.len(), 2);
    }

    #[test]
    fn text_words_may_contain_other_whitespace() {
        let text = "2 2\ncaf\u{a0}au\u{a0}lait 1 0 \nform\x0cfeed 0 1 \n";
        let v = Vectors::read(Cursor::new(text), false).unwrap();
        assert_eq!(v.lookup_word("caf\u{a0}au\u{a0}lait"), Some(0));
        assert_eq!(&v[1], [0.0, 1.0]);
        assert_eq!(v.lookup_words("form\x0cfeed"), Ok(vec![1]));
    }

    #[test]
    fn lookup_words_reports_unknown_word() {
        let v = Vectors::read(Cursor::new(TEXT), false).unwrap();
        assert_eq!(v.lookup_words(" king\tqueen "), Ok(vec![1, 2]));
        assert_eq!(v.lookup_words("king prince queen"), Err("prince"));
        assert_eq!(v.lookup_words(""), Ok(vec![]));
    }

    #[test]
    fn phrase_is_normalized_sum() {
        let v = Vectors::read(Cursor::new(TEXT), false).unwrap();
        let p = v.phrase(&[1, 2]);
        let s = 0.5f32.sqrt();
        assert!((p[0] - s).abs() < 1e-6 && (p[1] - s).abs() < 1e-6);
    }

    #[test]
    fn analogy_offsets_then_normalizes() {
        let v = Vectors::read(Cursor::new(TEXT), false).unwrap();
        // queen - king + queen = (1.0, 0.4) / |.|
        let q = v.analogy(1, 2, 2);
        let len = (1.0f32 + 0.16).sqrt();
        assert!((q[0] - 1.0 / len).abs() < 1e-5);
        assert!((q[1] - 0.4 / len).abs() < 1e-5);
        assert!((norm(&q) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_short_rows() {
        assert!(Vectors::read(Cursor::new("1 3\nword 1 2 \n"), false).is_err());
    }
}
