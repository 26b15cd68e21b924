use crate::rng::Rng;
use crate::vocab::Vocab;
use crate::real;

pub const EXP_TABLE_SIZE: usize = 1000;
pub const MAX_EXP: real = 6.0;

/// Unigram distribution table size.
pub const TABLE_SIZE: usize = 100_000;

/// Precomputed logistic function, `1 / (1 + e^-x)`, on `-MAX_EXP..MAX_EXP`.
#[derive(Debug, Clone)]
pub struct SigmoidTable {
    values: Vec<real>,
}

impl Default for SigmoidTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SigmoidTable {
    pub fn new() -> Self {
        let values = (0..EXP_TABLE_SIZE)
            .map(|i| {
                let e = ((i as real / EXP_TABLE_SIZE as real * 2.0 - 1.0) * MAX_EXP).exp(); // Precompute the exp() table
                e / (e + 1.0) // Precompute f(x) = x / (x + 1)
            })
            .collect();
        SigmoidTable { values }
    }

    pub fn values(&self) -> &[real] {
        &self.values
    }

    /// Approximate the logistic function. Saturates to exactly 0 or 1 outside
    /// `-MAX_EXP..=MAX_EXP`.
    pub fn sigmoid(&self, x: real) -> real {
        if x > MAX_EXP {
            1.0
        } else if x < -MAX_EXP {
            0.0
        } else {
            let i = ((x + MAX_EXP) * (EXP_TABLE_SIZE as real / MAX_EXP / 2.0)) as usize;
            self.values[i.min(EXP_TABLE_SIZE - 1)]
        }
    }
}

/// Negative-sampling table: a uniformly random slot holds word `i` with
/// probability proportional to `count(i)^0.75`.
#[derive(Debug, Clone)]
pub struct UnigramTable {
    table: Vec<usize>,
    vocab_size: usize,
}

impl UnigramTable {
    pub fn new(vocab: &Vocab) -> Self {
        Self::with_size(vocab, TABLE_SIZE)
    }

    pub fn with_size(vocab: &Vocab, table_size: usize) -> Self {
        let power: f64 = 0.75;
        let vocab_size = vocab.len();
        let weight = |i: usize| (vocab[i].count as f64).powf(power);
        let train_words_pow = (0..vocab_size).map(weight).sum::<f64>();

        let mut table = Vec::with_capacity(table_size);
        let mut i = 0;
        let mut d1 = weight(i) / train_words_pow;
        for a in 0..table_size {
            table.push(i);
            if (a as f64 / table_size as f64) > d1 {
                i += 1;
                if i < vocab_size {
                    d1 += weight(i) / train_words_pow;
                }
            }
            if i >= vocab_size {
                i = vocab_size - 1;
            }
        }
        UnigramTable { table, vocab_size }
    }

    pub fn entries(&self) -> &[usize] {
        &self.table
    }

    /// Draws a negative example. Never returns 0 (`</s>`) unless the
    /// vocabulary holds nothing else.
    pub fn draw(&self, rng: &mut Rng) -> usize {
        let next_random = rng.rand_u64();
        let target = self.table[(next_random >> 16) as usize % self.table.len()];
        if target == 0 && self.vocab_size > 1 {
            next_random as usize % (self.vocab_size - 1) + 1
        } else {
            target
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_midpoint_is_one_half() {
        let table = SigmoidTable::new();
        assert!((table.values()[EXP_TABLE_SIZE / 2] - 0.5).abs() < 1e-6);
        assert!((table.sigmoid(0.0) - 0.5).abs() < 0.01);
    }

    #[test]
    fn sigmoid_is_increasing() {
        let table = SigmoidTable::new();
        for pair in table.values().windows(2) {
            assert!(pair[0] < pair[1], "{} >= {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn sigmoid_saturates() {
        let table = SigmoidTable::new();
        assert_eq!(table.sigmoid(6.5), 1.0);
        assert_eq!(table.sigmoid(-6.5), 0.0);
        assert!(table.sigmoid(MAX_EXP) > 0.99);
        assert!(table.sigmoid(-MAX_EXP) < 0.01);
    }

    fn two_word_vocab() -> Vocab {
        let mut text = String::from("a\n");
        for _ in 0..1000 {
            text.push_str("b ");
        }
        let mut reader = crate::WordReader::new(std::io::Cursor::new(text.into_bytes()));
        Vocab::learn(&mut reader, 1, &indicatif::ProgressBar::hidden()).unwrap()
    }

    #[test]
    fn unigram_table_follows_frequency() {
        let raw = "</s> 0\nrare 1\ncommon 1000000\n";
        let vocab = Vocab::read(std::io::Cursor::new(raw), 1).unwrap();
        let rare = vocab.find("rare").unwrap();
        let common = vocab.find("common").unwrap();

        let table = UnigramTable::new(&vocab);
        assert_eq!(table.entries().len(), TABLE_SIZE);
        assert!(table.entries().iter().all(|&i| i < vocab.len()));
        let n_rare = table.entries().iter().filter(|&&i| i == rare).count();
        let n_common = table.entries().iter().filter(|&&i| i == common).count();
        assert!(n_common > 100 * n_rare.max(1), "common {n_common}, rare {n_rare}");
    }

    #[test]
    fn draw_never_returns_sentence_end() {
        let vocab = two_word_vocab();
        let table = UnigramTable::new(&vocab);
        let mut rng = Rng(3);
        for _ in 0..10_000 {
            let w = table.draw(&mut rng);
            assert!(w > 0 && w < vocab.len());
        }
    }
}
