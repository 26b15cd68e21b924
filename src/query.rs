//! The interactive loop behind the `distance` and `word-analogy` tools.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::vectors::Vectors;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Words closest to the sum of one or more words.
    Distance,
    /// Given `a b c`, words closest to `b - a + c`.
    Analogy,
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Out of dictionary word: {0}")]
    UnknownWord(String),

    #[error("{0} words were entered.. three words are needed at the input to perform the calculation")]
    NeedThreeWords(usize),

    #[error("No words were entered")]
    Empty,
}

impl QueryKind {
    fn prompt(self) -> &'static str {
        match self {
            QueryKind::Distance => "Enter word or sentence",
            QueryKind::Analogy => "Enter three words",
        }
    }

    /// Looks up the words of `line` and builds the vector to search around.
    pub fn query_vector(
        self,
        vectors: &Vectors,
        line: &str,
    ) -> Result<(Vec<usize>, Vec<f32>), QueryError> {
        let words = vectors
            .lookup_words(line)
            .map_err(|word| QueryError::UnknownWord(word.to_string()))?;
        let vec = match (self, words.as_slice()) {
            (_, []) => return Err(QueryError::Empty),
            (QueryKind::Distance, _) => vectors.phrase(&words),
            (QueryKind::Analogy, &[a, b, c]) => vectors.analogy(a, b, c),
            (QueryKind::Analogy, _) => return Err(QueryError::NeedThreeWords(words.len())),
        };
        Ok((words, vec))
    }

    /// The `top` best answers to `line`; the query words themselves are
    /// never among them.
    pub fn answer<'v>(
        self,
        vectors: &'v Vectors,
        line: &str,
        top: usize,
    ) -> Result<Vec<(&'v str, f32)>, QueryError> {
        let (words, vec) = self.query_vector(vectors, line)?;
        Ok(vectors.nearest(&vec, &words, top))
    }
}

/// Answers queries read from `input` until end of input or `EXIT`.
pub fn run_queries<R: BufRead, W: Write>(
    vectors: &Vectors,
    kind: QueryKind,
    mut input: R,
    mut out: W,
    top: usize,
) -> Result<()> {
    let mut line = String::new();
    loop {
        write!(out, "{} (EXIT to break): ", kind.prompt())?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line).context("error reading query")? == 0 {
            break;
        }
        let query = line.trim();
        if query == "EXIT" {
            break;
        }

        match kind.answer(vectors, query, top) {
            Err(err) => writeln!(out, "\n{err}")?,
            Ok(best) => {
                writeln!(out)?;
                writeln!(out, "{:>50}       Cosine distance", "Word")?;
                writeln!(out, "{}", "-".repeat(72))?;
                for (word, dist) in best {
                    writeln!(out, "{:>50}\t\t{:8.6}", word, dist)?;
                }
            }
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const TEXT: &str = "5 2\n</s> 0.1 -0.1 \nking 3 4 \nqueen 4 3 \nman 1 0 \nwoman 0 1 \n";

    fn vectors() -> Vectors {
        Vectors::read(Cursor::new(TEXT), false).unwrap()
    }

    #[test]
    fn distance_excludes_query_words() {
        let v = vectors();
        let best = QueryKind::Distance.answer(&v, "king", 2).unwrap();
        assert_eq!(best[0].0, "queen");
        assert!(best.iter().all(|(word, _)| *word != "king"));
    }

    #[test]
    fn analogy_needs_three_known_words() {
        let v = vectors();
        assert_eq!(
            QueryKind::Analogy.answer(&v, "man woman", 3),
            Err(QueryError::NeedThreeWords(2))
        );
        assert_eq!(
            QueryKind::Analogy.answer(&v, "man prince king", 3),
            Err(QueryError::UnknownWord("prince".to_string()))
        );
        assert_eq!(QueryKind::Distance.answer(&v, "  ", 3), Err(QueryError::Empty));
    }

    #[test]
    fn analogy_searches_offset_vector() {
        let v = vectors();
        // woman - man + king points between king and woman, away from man.
        let (words, vec) = QueryKind::Analogy.query_vector(&v, "man woman king").unwrap();
        assert_eq!(words, [3, 4, 1]);
        assert!(vec[1] > vec[0]);
        let best = QueryKind::Analogy.answer(&v, "man woman king", 1).unwrap();
        assert_eq!(best[0].0, "queen");
    }

    #[test]
    fn loop_stops_at_exit() {
        let v = vectors();
        let mut out = vec![];
        run_queries(
            &v,
            QueryKind::Distance,
            Cursor::new("king\nprince\nEXIT\nqueen\n"),
            &mut out,
            1,
        )
        .unwrap();
        let out = String::from_utf8(out).unwrap();
        assert_eq!(out.matches("Enter word or sentence").count(), 3);
        assert!(out.contains("queen\t\t"));
        assert!(out.contains("Out of dictionary word: prince"));
        assert!(!out.contains("king\t\t"));
    }
}
