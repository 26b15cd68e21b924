use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use std::{io, iter, slice};

use anyhow::{Context, Result};

use crate::vocab::SENTENCE_END;

/// Words longer than `MAX_STRING - 1` bytes are truncated.
pub const MAX_STRING: usize = 100;

/// Splits a byte stream into words, assuming space + tab + EOL to be word
/// boundaries.
///
/// A newline is reported as the word `</s>`. When a newline terminates a
/// word, it is pushed back so the following call sees the sentence boundary.
pub struct WordReader<R> {
    inner: BufReader<R>,
    pushback: Option<u8>,
}

impl WordReader<File> {
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("error opening {}", path.display()))?;
        Ok(WordReader::new(file))
    }
}

impl<R: Read> WordReader<R> {
    pub fn new(inner: R) -> Self {
        WordReader {
            inner: BufReader::new(inner),
            pushback: None,
        }
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if let Some(byte) = self.pushback.take() {
            return Ok(Some(byte));
        }
        let mut byte = 0;
        loop {
            return match self.inner.read(slice::from_mut(&mut byte)) {
                Ok(0) => Ok(None),
                Ok(..) => Ok(Some(byte)),
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => Err(e),
            };
        }
    }

    fn unread_byte(&mut self, byte: u8) {
        debug_assert!(self.pushback.is_none());
        self.pushback = Some(byte);
    }

    /// Reads a single word. Returns `Ok(None)` at end of stream.
    pub fn read_word(&mut self) -> Result<Option<String>> {
        let mut word = Vec::<u8>::new();
        while let Some(b) = self.read_byte().context("error reading a word")? {
            match b {
                b'\r' => continue,
                b' ' | b'\t' | b'\n' => {
                    if !word.is_empty() {
                        if b == b'\n' {
                            self.unread_byte(b);
                        }
                        break;
                    }
                    if b == b'\n' {
                        return Ok(Some(SENTENCE_END.to_string()));
                    }
                }
                _ => {
                    if word.len() < MAX_STRING - 1 {
                        word.push(b); // Truncate too long words
                    }
                }
            }
        }
        Ok(if word.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&word).into_owned())
        })
    }

    /// Iterate over the remaining words in the stream.
    pub fn words(&mut self) -> impl Iterator<Item = Result<String>> + '_ {
        iter::from_fn(move || self.read_word().transpose())
    }
}

impl<R: Read + Seek> WordReader<R> {
    /// Moves to an absolute byte offset, forgetting any pushed-back byte.
    ///
    /// The offset need not be on a word boundary; the first word read may be
    /// the tail of a longer one.
    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.pushback = None;
        self.inner
            .seek(SeekFrom::Start(offset))
            .context("error seeking within training file")?;
        Ok(())
    }
}
