//! State shared by all training threads.
//!
//! Training is "hogwild": threads read and update the embedding matrices
//! concurrently with no locks, and occasionally lose an update when two
//! threads touch the same row at once. The algorithm tolerates this.
//!
//! To keep that sound in Rust, every element is a [`Real`], an `f32` stored
//! in an `AtomicU32` and accessed with `Ordering::Relaxed`. Loads and stores
//! compile to plain moves; `Real::add` is a load followed by a store, not an
//! atomic read-modify-write, so concurrent adds may overwrite each other.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use aligned_box::AlignedBox;
use anyhow::{anyhow, Result};

use crate::real;

#[derive(Default)]
#[repr(transparent)]
pub struct Real {
    bits: AtomicU32,
}

impl Real {
    pub fn new(value: real) -> Self {
        Real {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    pub fn get(&self) -> real {
        real::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn set(&self, value: real) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn add(&self, x: real) {
        let a = self.get();
        self.set(a + x);
    }
}

/// Dot product of two rows.
pub fn dot(a: &[Real], b: &[Real]) -> real {
    a.iter().zip(b).map(|(a, b)| a.get() * b.get()).sum()
}

/// A row-major `rows x cols` matrix of [`Real`]s.
pub struct SharedMatrix {
    rows: usize,
    cols: usize,
    data: AlignedBox<[Real]>,
}

impl SharedMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        let data = AlignedBox::slice_from_default(128, rows * cols)
            .map_err(|err| anyhow!("memory allocation failed: {err:?}"))?;
        Ok(SharedMatrix { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> &[Real] {
        &self.data[i * self.cols..][..self.cols]
    }

    /// Copies row `i` out as plain floats.
    pub fn row_values(&self, i: usize) -> Vec<real> {
        self.row(i).iter().map(Real::get).collect()
    }

    /// Copies the whole matrix out as plain floats.
    pub fn to_vec(&self) -> Vec<real> {
        self.data.iter().map(Real::get).collect()
    }
}

/// Word counter and learning rate, shared between threads.
pub struct TrainingProgress {
    /// Words processed so far, summed over all threads and iterations.
    word_count_actual: AtomicU64,
    alpha: Real,
    starting_alpha: real,
    /// `iter * train_words + 1`: the word count at which alpha would reach 0.
    total_words: u64,
}

impl TrainingProgress {
    pub fn new(starting_alpha: real, iter: usize, train_words: u64) -> Self {
        TrainingProgress {
            word_count_actual: AtomicU64::new(0),
            alpha: Real::new(starting_alpha),
            starting_alpha,
            total_words: iter as u64 * train_words + 1,
        }
    }

    pub fn alpha(&self) -> real {
        self.alpha.get()
    }

    pub fn word_count_actual(&self) -> u64 {
        self.word_count_actual.load(Ordering::Relaxed)
    }

    /// Adds `n` words to the shared count without touching alpha.
    pub fn add_words(&self, n: u64) -> u64 {
        self.word_count_actual.fetch_add(n, Ordering::Relaxed) + n
    }

    /// Adds `n` words and lowers alpha linearly with the total, never below
    /// `starting_alpha * 1e-4`.
    pub fn report(&self, n: u64) -> real {
        let word_count_actual = self.add_words(n);
        let alpha = self.starting_alpha
            * (1.0 - word_count_actual as real / self.total_words as real)
                .max(0.0001);
        self.alpha.set(alpha);
        alpha
    }
}
