use std::fs;
use std::io::{Read, Seek};
use std::path::Path;
use std::thread;

use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::output;
use crate::reader::WordReader;
use crate::rng::Rng;
use crate::shared::{self, SharedMatrix, TrainingProgress};
use crate::tables::{SigmoidTable, UnigramTable};
use crate::vocab::Vocab;
use crate::real;

/// Sentences are cut into chunks of at most this many words.
pub const MAX_SENTENCE_LENGTH: usize = 1000;

/// A skip-gram model being trained.
///
/// All training state that threads share lives here and is only accessed
/// through `&self`; see [`crate::shared`].
pub struct Word2Vec {
    config: Config,
    vocab: Vocab,
    file_size: u64,
    /// The learned word-vectors.
    syn0: SharedMatrix,
    /// Output weights for negative sampling.
    syn1neg: SharedMatrix,
    exp_table: SigmoidTable,
    table: Option<UnigramTable>,
    progress: TrainingProgress,
    progress_bar: ProgressBar,
}

impl Word2Vec {
    /// Allocates and initializes the network for `vocab`.
    ///
    /// `file_size` is the byte length of the training file, used to split it
    /// between threads.
    pub fn new(config: Config, vocab: Vocab, file_size: u64) -> Result<Self> {
        config.validate()?;
        let vocab_size = vocab.len();
        let layer1_size = config.layer1_size;

        let syn0 = SharedMatrix::zeros(vocab_size, layer1_size)?;
        let mut rng = Rng(config.seed);
        for a in 0..vocab_size {
            for x in syn0.row(a) {
                x.set((rng.rand_real() - 0.5) / layer1_size as real);
            }
        }
        let syn1neg = SharedMatrix::zeros(vocab_size, layer1_size)?;

        let table = (config.negative > 0).then(|| UnigramTable::new(&vocab));
        let progress = TrainingProgress::new(config.alpha, config.iter, vocab.train_words());
        let progress_bar = if config.debug_mode > 1 {
            let bar = ProgressBar::new(config.iter as u64 * vocab.train_words() + 1);
            bar.set_style(
                ProgressStyle::with_template("{msg} [{elapsed_precise}] {wide_bar} {percent}%")
                    .context("invalid progress bar template")?,
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        Ok(Word2Vec {
            config,
            vocab,
            file_size,
            syn0,
            syn1neg,
            exp_table: SigmoidTable::new(),
            table,
            progress,
            progress_bar,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    pub fn embeddings(&self) -> &SharedMatrix {
        &self.syn0
    }

    pub fn weights(&self) -> &SharedMatrix {
        &self.syn1neg
    }

    pub fn progress(&self) -> &TrainingProgress {
        &self.progress
    }

    /// Runs `num_threads` workers over the training file and waits for all of
    /// them.
    pub fn train(&self) -> Result<()> {
        let results = thread::scope(|s| {
            let threads = (0..self.config.num_threads)
                .map(|id| s.spawn(move || self.train_model_thread(id)))
                .collect::<Vec<_>>();
            threads
                .into_iter()
                .map(|thread| thread.join())
                .collect::<Vec<_>>()
        });
        self.progress_bar.finish_and_clear();

        for (id, result) in results.into_iter().enumerate() {
            match result {
                Ok(result) => result.with_context(|| format!("error in worker thread {id}"))?,
                Err(_) => return Err(anyhow!("worker thread {id} panicked")),
            }
        }
        Ok(())
    }

    fn train_model_thread(&self, id: usize) -> Result<()> {
        let mut fi =
            WordReader::open(&self.config.train_file).context("error opening training data file")?;
        self.train_partition(&mut fi, id)
    }

    /// Byte offset where thread `id` starts reading. Threads do not start on
    /// word boundaries.
    pub fn partition_start(&self, id: usize) -> u64 {
        self.file_size / self.config.num_threads as u64 * id as u64
    }

    /// The training loop for one thread: `iter` passes over this thread's
    /// share of `fi`.
    pub fn train_partition<R: Read + Seek>(&self, fi: &mut WordReader<R>, id: usize) -> Result<()> {
        let start = self.partition_start(id);
        fi.seek_to(start)?;
        debug!(id, start, "worker started");

        let mut neu1e: Vec<real> = vec![0.0; self.config.layer1_size];
        let mut rng = Rng(self.config.seed.wrapping_add(id as u64 + 1));
        let words_per_thread = self.vocab.train_words() / self.config.num_threads as u64;
        let mut local_iter = self.config.iter;
        let mut word_count: u64 = 0;
        let mut last_word_count: u64 = 0;
        let mut sen: Vec<usize> = Vec::with_capacity(MAX_SENTENCE_LENGTH);
        let mut sentence_position: usize = 0;
        loop {
            if word_count - last_word_count > 10000 {
                self.report_progress(word_count - last_word_count);
                last_word_count = word_count;
            }

            let mut at_end_of_file = false;
            if sen.is_empty() {
                at_end_of_file = self.read_sentence(fi, &mut rng, &mut word_count, &mut sen)?;
                sentence_position = 0;
            }

            if at_end_of_file || word_count > words_per_thread {
                self.progress.add_words(word_count - last_word_count);
                local_iter -= 1;
                debug!(id, remaining = local_iter, "worker finished a pass");
                if local_iter == 0 {
                    break;
                }
                word_count = 0;
                last_word_count = 0;
                sen.clear();
                fi.seek_to(start)
                    .context("error rewinding file for next iteration")?;
                continue;
            }

            // Only `</s>`, or every word subsampled away.
            if sen.is_empty() {
                continue;
            }

            let alpha = self.progress.alpha();
            self.train_skip_gram(&sen, sentence_position, alpha, &mut rng, &mut neu1e);

            sentence_position += 1;
            if sentence_position >= sen.len() {
                sen.clear();
            }
        }

        Ok(())
    }

    /// Fills `sen` with the indexes of the next sentence's words, after
    /// subsampling. Unknown words are skipped and not counted.
    ///
    /// Returns `true` if the end of the file was reached.
    pub fn read_sentence<R: Read>(
        &self,
        fi: &mut WordReader<R>,
        rng: &mut Rng,
        word_count: &mut u64,
        sen: &mut Vec<usize>,
    ) -> Result<bool> {
        loop {
            let word = match fi
                .read_word()
                .context("error reading a word from training data")?
            {
                None => return Ok(true),
                Some(word) => word,
            };
            let word = match self.vocab.find(&word) {
                None => continue,
                Some(i) => i,
            };
            *word_count += 1;
            if word == 0 {
                return Ok(false);
            }
            if !self.keep_word(word, rng) {
                continue;
            }
            sen.push(word);
            if sen.len() >= MAX_SENTENCE_LENGTH {
                return Ok(false);
            }
        }
    }

    /// The subsampling randomly discards frequent words while keeping the
    /// ranking same.
    fn keep_word(&self, word: usize, rng: &mut Rng) -> bool {
        let sample = self.config.sample;
        if sample <= 0.0 {
            return true;
        }
        // A saved vocabulary may list zero counts, making `ran` +inf or NaN.
        // Either way the word is kept.
        let f = self.vocab[word].count as real;
        let k = sample * self.vocab.train_words() as real;
        let ran = ((f / k).sqrt() + 1.0) * k / f;
        !(ran < rng.rand_real())
    }

    /// One step of skip-gram training: each word in a randomly shrunk window
    /// around `sen[sentence_position]` is trained to predict it.
    fn train_skip_gram(
        &self,
        sen: &[usize],
        sentence_position: usize,
        alpha: real,
        rng: &mut Rng,
        neu1e: &mut [real],
    ) {
        let window = self.config.window;
        let word = sen[sentence_position];
        let b = rng.rand_u64() as usize % window;

        for a in b..(window * 2 + 1 - b) {
            if a == window || sentence_position + a < window {
                continue;
            }
            let c = sentence_position + a - window;
            if c >= sen.len() {
                continue;
            }
            let last_word = sen[c];
            let l1 = self.syn0.row(last_word);
            neu1e.fill(0.0);

            // NEGATIVE SAMPLING
            if let Some(table) = &self.table {
                for d in 0..(self.config.negative + 1) {
                    let (target, label) = if d == 0 {
                        (word, 1.0)
                    } else {
                        let target = table.draw(rng);
                        if target == word {
                            continue;
                        }
                        (target, 0.0)
                    };
                    let l2 = self.syn1neg.row(target);
                    let f = shared::dot(l1, l2);
                    // 'g' is the gradient multiplied by the learning rate
                    let g = (label - self.exp_table.sigmoid(f)) * alpha;
                    for (e, w) in neu1e.iter_mut().zip(l2) {
                        *e += g * w.get();
                    }
                    for (w, x) in l2.iter().zip(l1) {
                        w.add(g * x.get());
                    }
                }
            }

            // Learn weights input -> hidden
            for (x, e) in l1.iter().zip(neu1e.iter()) {
                x.add(*e);
            }
        }
    }

    fn report_progress(&self, n: u64) {
        let alpha = self.progress.report(n);
        let word_count_actual = self.progress.word_count_actual();
        let secs = self.progress_bar.elapsed().as_secs_f64();
        self.progress_bar.set_position(word_count_actual);
        self.progress_bar.set_message(format!(
            "Alpha: {alpha:.6}  Words/sec: {:.2}k",
            word_count_actual as f64 / ((secs + 1.0) * 1000.0),
        ));
    }

    pub fn save_output(&self, output_file: &Path) -> Result<()> {
        output::save_vectors(
            output_file,
            &self.vocab,
            &self.syn0,
            &self.syn1neg,
            self.config.vector_format(),
        )
    }
}

fn vocab_spinner(debug_mode: usize) -> Result<ProgressBar> {
    if debug_mode <= 1 {
        return Ok(ProgressBar::hidden());
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {human_pos} words read")
            .context("invalid progress bar template")?,
    );
    Ok(spinner)
}

/// Builds the vocabulary, trains, and writes the vectors to
/// `config.output_file`.
pub fn train_model(config: &Config) -> Result<Word2Vec> {
    config.validate()?;
    let output_file = config
        .output_file
        .as_deref()
        .ok_or(Error::MissingOutputFile)?;
    info!("Starting training using file {}", config.train_file.display());

    let vocab = match &config.read_vocab_file {
        Some(f) => Vocab::read_from_file(f, config.min_count)?,
        None => {
            let spinner = vocab_spinner(config.debug_mode)?;
            let vocab = Vocab::learn_from_file(&config.train_file, config.min_count, &spinner)?;
            spinner.finish_and_clear();
            vocab
        }
    };
    info!("Vocab size: {}", vocab.len());
    info!("Words in train file: {}", vocab.train_words());

    if let Some(f) = &config.save_vocab_file {
        vocab.save(f)?;
        debug!("saved vocabulary to {}", f.display());
    }

    let file_size = fs::metadata(&config.train_file)
        .context("error checking training data file size")?
        .len();
    if config.negative == 0 {
        warn!("negative sampling is off and hierarchical softmax is not supported; vectors will keep their initial values");
    }

    let model = Word2Vec::new(config.clone(), vocab, file_size)?;
    model.train()?;
    info!(
        words = model.progress.word_count_actual(),
        "training finished, writing {}",
        output_file.display()
    );
    model.save_output(output_file)?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const CORPUS: &[u8] = b"the quick brown fox jumps over the lazy dog\n\
        the dog sleeps\nthe fox runs over the hill\n";

    fn model(config: Config, corpus: &[u8]) -> Word2Vec {
        let mut reader = WordReader::new(Cursor::new(corpus.to_vec()));
        let vocab =
            Vocab::learn(&mut reader, config.min_count, &ProgressBar::hidden()).unwrap();
        Word2Vec::new(config, vocab, corpus.len() as u64).unwrap()
    }

    fn small_config() -> Config {
        let mut config = Config::new("unused.txt", "unused.vec");
        config.min_count = 1;
        config.layer1_size = 8;
        config.window = 2;
        config.num_threads = 1;
        config.iter = 1;
        config.debug_mode = 0;
        config
    }

    #[test]
    fn init_net_shapes_and_ranges() {
        let m = model(small_config(), CORPUS);
        let vocab_size = m.vocab().len();
        assert_eq!(m.embeddings().rows(), vocab_size);
        assert_eq!(m.embeddings().cols(), 8);
        assert!(m.embeddings().to_vec().iter().all(|x| x.abs() <= 0.5 / 8.0));
        assert!(m.weights().to_vec().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn no_subsampling_keeps_every_known_word() {
        let mut config = small_config();
        config.sample = 0.0;
        let m = model(config, CORPUS);

        let mut fi = WordReader::new(Cursor::new(b"the unknown quick fox\nlazy".to_vec()));
        let mut rng = Rng(1);
        let mut word_count = 0;
        let mut sen = vec![];
        let eof = m.read_sentence(&mut fi, &mut rng, &mut word_count, &mut sen).unwrap();
        assert!(!eof);
        let words = sen.iter().map(|&i| m.vocab()[i].word.as_str()).collect::<Vec<_>>();
        assert_eq!(words, ["the", "quick", "fox"]);
        // three known words plus `</s>`
        assert_eq!(word_count, 4);

        sen.clear();
        let eof = m.read_sentence(&mut fi, &mut rng, &mut word_count, &mut sen).unwrap();
        assert!(eof);
        assert_eq!(sen.len(), 1);
    }

    #[test]
    fn subsampling_discards_frequent_words() {
        let mut corpus = Vec::new();
        for _ in 0..2000 {
            corpus.extend_from_slice(b"the ");
        }
        corpus.extend_from_slice(b"rare\n");
        let mut config = small_config();
        config.sample = 1e-4;
        let m = model(config, &corpus);

        let mut fi = WordReader::new(Cursor::new(corpus.clone()));
        let mut rng = Rng(1);
        let mut word_count = 0;
        let mut sen = vec![];
        m.read_sentence(&mut fi, &mut rng, &mut word_count, &mut sen).unwrap();
        assert_eq!(word_count, 2002);
        let kept_the = sen.iter().filter(|&&i| i == m.vocab().find("the").unwrap()).count();
        assert!(kept_the < 200, "kept {kept_the} of 2000");
    }

    #[test]
    fn zero_counts_are_never_subsampled() {
        let vocab = Vocab::read(Cursor::new("</s> 0\na 0\nb 0\n"), 0).unwrap();
        assert_eq!(vocab.train_words(), 0);
        let mut config = small_config();
        config.negative = 0;
        config.sample = 1e-3;
        let m = Word2Vec::new(config, vocab, 0).unwrap();

        let mut fi = WordReader::new(Cursor::new(b"a b a b\n".to_vec()));
        let mut rng = Rng(5);
        let mut word_count = 0;
        let mut sen = vec![];
        m.read_sentence(&mut fi, &mut rng, &mut word_count, &mut sen).unwrap();
        assert_eq!(sen.len(), 4);
    }

    #[test]
    fn long_sentences_are_split() {
        let mut corpus = Vec::new();
        for _ in 0..(MAX_SENTENCE_LENGTH + 10) {
            corpus.extend_from_slice(b"w ");
        }
        let mut config = small_config();
        config.sample = 0.0;
        let m = model(config, &corpus);

        let mut fi = WordReader::new(Cursor::new(corpus.clone()));
        let mut rng = Rng(1);
        let mut word_count = 0;
        let mut sen = vec![];
        let eof = m.read_sentence(&mut fi, &mut rng, &mut word_count, &mut sen).unwrap();
        assert!(!eof);
        assert_eq!(sen.len(), MAX_SENTENCE_LENGTH);
    }

    #[test]
    fn partitions_split_the_file_evenly() {
        let mut config = small_config();
        config.num_threads = 4;
        let m = model(config, CORPUS);
        let size = CORPUS.len() as u64;
        assert_eq!(m.partition_start(0), 0);
        assert_eq!(m.partition_start(2), size / 4 * 2);
    }

    #[test]
    fn training_moves_the_weights() {
        let mut config = small_config();
        config.sample = 0.0;
        config.iter = 3;
        let m = model(config, CORPUS);
        let before = m.embeddings().to_vec();

        let mut fi = WordReader::new(Cursor::new(CORPUS.to_vec()));
        m.train_partition(&mut fi, 0).unwrap();

        assert_ne!(m.embeddings().to_vec(), before);
        assert!(m.weights().to_vec().iter().any(|&x| x != 0.0));
        assert!(m.embeddings().to_vec().iter().all(|x| x.is_finite()));
        // three passes over every word, `</s>` included
        assert_eq!(m.progress().word_count_actual(), 3 * m.vocab().train_words());
    }

    #[test]
    fn negative_zero_trains_nothing() {
        let mut config = small_config();
        config.negative = 0;
        config.sample = 0.0;
        let m = model(config, CORPUS);
        let before = m.embeddings().to_vec();

        let mut fi = WordReader::new(Cursor::new(CORPUS.to_vec()));
        m.train_partition(&mut fi, 0).unwrap();
        assert_eq!(m.embeddings().to_vec(), before);
    }
}
