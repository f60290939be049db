//! Buffered byte source with lookahead.
//!
//! The parser dispatches on single bytes but needs two-byte lookahead for
//! `//` comments and `${…}` references, plus consume-to-end-of-line for
//! comment text. [`ByteReader`] wraps any [`Read`] and keeps the peeked
//! bytes in a small buffer so nothing is ever lost.

use std::io::{self, BufReader, Read};

pub(crate) struct ByteReader<R> {
    inner: BufReader<R>,
    lookahead: Vec<u8>,
}

impl<R: Read> ByteReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            lookahead: Vec::new(),
        }
    }

    /// Consume and return the next byte, or `None` at end of input.
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if !self.lookahead.is_empty() {
            return Ok(Some(self.lookahead.remove(0)));
        }
        self.fill_one()
    }

    /// Return up to `n` upcoming bytes without consuming them.
    ///
    /// Fewer than `n` bytes are returned only when the input ends first.
    pub fn peek(&mut self, n: usize) -> io::Result<&[u8]> {
        while self.lookahead.len() < n {
            match self.fill_one()? {
                Some(byte) => self.lookahead.push(byte),
                None => break,
            }
        }
        Ok(&self.lookahead[..self.lookahead.len().min(n)])
    }

    /// Consume bytes up to, but not including, the next `\n`.
    ///
    /// The newline itself is left in the stream so the caller's line
    /// accounting stays in one place.
    pub fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let next = match self.peek(1)? {
                [byte] => Some(*byte),
                _ => None,
            };
            match next {
                None | Some(b'\n') => return Ok(out),
                Some(byte) => {
                    self.lookahead.remove(0);
                    out.push(byte);
                }
            }
        }
    }

    fn fill_one(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}
