use std::cmp::Reverse;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::ops::Index;
use std::path::Path;

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Feature};
use crate::reader::WordReader;

/// The sentence-boundary token. It is always vocabulary entry 0.
pub const SENTENCE_END: &str = "</s>";

/// Word separators in corpus text, besides newline.
pub(crate) fn is_separator(c: char) -> bool {
    c == ' ' || c == '\t'
}

pub const VOCAB_HASH_SIZE: usize = 30_000_000; // Maximum 30 * 0.7 = 21M words in the vocabulary

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabWord {
    pub word: String,
    pub count: u64,
}

/// Words with their frequencies, plus a lookup table from word to index.
#[derive(Debug, Clone)]
pub struct Vocab {
    words: Vec<VocabWord>,
    index: HashMap<String, usize>,
    /// Total count of all words, as of the last `sort`.
    train_words: u64,
}

impl Default for Vocab {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<usize> for Vocab {
    type Output = VocabWord;

    fn index(&self, i: usize) -> &VocabWord {
        &self.words[i]
    }
}

impl Vocab {
    /// Creates a vocabulary holding only `</s>`, with count 0.
    pub fn new() -> Self {
        let mut vocab = Vocab {
            words: Vec::with_capacity(1000),
            index: HashMap::new(),
            train_words: 0,
        };
        vocab.add(SENTENCE_END.to_string());
        vocab
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Always false: the sentence-end token can't be removed.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[VocabWord] {
        &self.words
    }

    pub fn train_words(&self) -> u64 {
        self.train_words
    }

    /// Adds a word to the vocabulary with a count of 0.
    pub fn add(&mut self, word: String) -> usize {
        let n = self.words.len();
        self.index.insert(word.clone(), n);
        self.words.push(VocabWord { word, count: 0 });
        n
    }

    /// Returns position of a word in the vocabulary.
    pub fn find(&self, word: &str) -> Option<usize> {
        self.index.get(word).copied()
    }

    /// Sorts the vocabulary by frequency using word counts.
    ///
    /// `</s>` stays at index 0 whatever its count. Other words occurring
    /// less than `min_count` times are discarded.
    pub fn sort(&mut self, min_count: u64) {
        self.words[1..].sort_by_key(|vw| Reverse(vw.count));

        // Hash will be re-computed, as after the sorting it is not actual
        self.index.clear();
        self.train_words = 0;
        let mut i = 0;
        self.words.retain(|vw| {
            let keep = i == 0 || vw.count >= min_count;
            if keep {
                self.index.insert(vw.word.clone(), i);
                self.train_words += vw.count;
                i += 1;
            }
            keep
        });
    }

    /// Counts every word in `reader`, then sorts.
    pub fn learn<R: Read>(
        reader: &mut WordReader<R>,
        min_count: u64,
        progress: &ProgressBar,
    ) -> Result<Self> {
        let mut vocab = Vocab::new();
        let mut total: u64 = 0;
        for word in reader.words() {
            let word = word.context("error reading training data file")?;
            total += 1;
            if total % 100_000 == 0 {
                progress.set_position(total);
            }

            match vocab.find(&word) {
                Some(a) => vocab.words[a].count += 1,
                None => {
                    let a = vocab.add(word);
                    vocab.words[a].count = 1;
                }
            }

            if vocab.len() as f64 > VOCAB_HASH_SIZE as f64 * 0.7 {
                return Err(Error::Unsupported(Feature::VocabularyReduction).into());
            }
        }
        progress.set_position(total);
        vocab.sort(min_count);
        Ok(vocab)
    }

    pub fn learn_from_file(path: &Path, min_count: u64, progress: &ProgressBar) -> Result<Self> {
        let mut reader = WordReader::open(path).context("error opening training data file")?;
        Self::learn(&mut reader, min_count, progress)
    }

    /// Reads `word count` lines, then sorts.
    pub fn read<R: BufRead>(fin: R, min_count: u64) -> Result<Self> {
        let mut vocab = Vocab::new();
        let mut seen_sentence_end = false;
        for (line_num, line) in fin.lines().enumerate() {
            let line = line.context("error reading vocabulary file")?;
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let line_num = line_num + 1;
            let malformed = |reason: String| Error::MalformedVocabLine {
                line: line_num,
                reason,
            };

            // Words never contain the tokenizer's separators, but may contain
            // any other whitespace.
            let (word, count) = line
                .rsplit_once(is_separator)
                .ok_or_else(|| malformed("expected `word count`".to_string()))?;
            if word.is_empty() || word.contains(is_separator) {
                return Err(malformed(format!("expected `word count`, found {line:?}")).into());
            }
            let count = count
                .parse::<u64>()
                .map_err(|err| malformed(format!("unrecognized frequency number format: {err}")))?;

            let a = if word == SENTENCE_END && !seen_sentence_end {
                seen_sentence_end = true;
                0
            } else if word == SENTENCE_END || vocab.find(word).is_some() {
                return Err(Error::DuplicateVocabWord {
                    line: line_num,
                    word: word.to_string(),
                }
                .into());
            } else {
                vocab.add(word.to_string())
            };
            vocab.words[a].count = count;
        }
        vocab.sort(min_count);
        Ok(vocab)
    }

    pub fn read_from_file(path: &Path, min_count: u64) -> Result<Self> {
        let fin = BufReader::new(File::open(path).context("error opening vocabulary file")?);
        Self::read(fin, min_count)
    }

    pub fn write<W: Write>(&self, mut fo: W) -> Result<()> {
        for vw in &self.words {
            writeln!(fo, "{} {}", vw.word, vw.count).context("error writing vocab file")?;
        }
        fo.flush().context("error writing vocab file")?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let fo = BufWriter::new(File::create(path).context("error creating vocab file for write")?);
        self.write(fo)
    }
}
