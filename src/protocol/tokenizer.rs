//! Stream tokenizer
//!
//! Carves an unbounded byte stream into discrete tokens.
//!
//! ## Contract
//! A [`Tokenizer`] inspects the bytes buffered so far and reports one of:
//! - `NeedMore`: no complete token yet, read more input
//! - `Token`: a complete token plus how many bytes it occupied
//! - `Final`: no further tokens follow (optionally carrying a last one)
//!
//! The [`TokenScanner`] owns the buffer: it grows it from
//! `initial_buffer_size()` up to `max_token_size()` and fails once a token
//! cannot fit.

use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};

use crate::error::{Error, Result};

/// Outcome of a single extraction attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction<'a> {
    /// Not enough data buffered yet
    NeedMore,

    /// A complete token; `consumed` includes any framing after it
    Token { consumed: usize, token: &'a [u8] },

    /// End of tokens, with the trailing token if there is one
    Final(Option<&'a [u8]>),
}

/// Splits buffered bytes into tokens
pub trait Tokenizer: Send + Sync {
    /// Size the read buffer starts at
    fn initial_buffer_size(&self) -> usize;

    /// Largest token the buffer may grow to hold
    fn max_token_size(&self) -> usize;

    /// Try to extract the next token from `buffered`
    ///
    /// `at_eof` is set once the underlying stream has no more bytes.
    fn extract_token<'a>(&self, buffered: &'a [u8], at_eof: bool) -> Result<Extraction<'a>>;
}

/// Drives a [`Tokenizer`] over a reader
///
/// The scanner does not own the reader, so the same stream can be written
/// to between tokens.
#[derive(Debug)]
pub struct TokenScanner {
    /// Unconsumed bytes
    buffer: BytesMut,

    /// Current buffer limit
    capacity: usize,

    /// Hard buffer limit
    max_token_size: usize,

    /// The reader returned 0 bytes
    eof: bool,

    /// A final token was delivered
    done: bool,
}

impl TokenScanner {
    /// Create a scanner sized for the given tokenizer
    pub fn new<T: Tokenizer + ?Sized>(tokenizer: &T) -> Self {
        let max_token_size = tokenizer.max_token_size().max(1);
        let capacity = tokenizer.initial_buffer_size().clamp(1, max_token_size);

        Self {
            buffer: BytesMut::with_capacity(capacity),
            capacity,
            max_token_size,
            eof: false,
            done: false,
        }
    }

    /// Read the next token
    ///
    /// Returns `Ok(None)` once the stream is exhausted.
    pub fn next_token<T, R>(&mut self, tokenizer: &T, reader: &mut R) -> Result<Option<Vec<u8>>>
    where
        T: Tokenizer + ?Sized,
        R: Read + ?Sized,
    {
        loop {
            if self.done {
                return Ok(None);
            }

            if !self.buffer.is_empty() || self.eof {
                match tokenizer.extract_token(&self.buffer, self.eof)? {
                    Extraction::Token { consumed, token } => {
                        if consumed > self.buffer.len() {
                            return Err(Error::Tokenizer(format!(
                                "consumed {} bytes but only {} are buffered",
                                consumed,
                                self.buffer.len()
                            )));
                        }
                        let token = token.to_vec();
                        self.buffer.advance(consumed);
                        return Ok(Some(token));
                    }
                    Extraction::Final(token) => {
                        let token = token.map(<[u8]>::to_vec);
                        self.buffer.clear();
                        self.done = true;
                        return Ok(token);
                    }
                    Extraction::NeedMore if self.eof => {
                        // Nothing more will arrive, so the leftovers never form a token
                        self.done = true;
                        return Ok(None);
                    }
                    Extraction::NeedMore => {}
                }
            }

            self.fill(reader)?;
        }
    }

    /// Bytes buffered but not yet consumed
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Read more input, growing the buffer when it is full
    fn fill<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<()> {
        if self.buffer.len() >= self.capacity {
            if self.capacity >= self.max_token_size {
                return Err(Error::TokenTooLong {
                    max: self.max_token_size,
                });
            }
            self.capacity = (self.capacity * 2).min(self.max_token_size);
            tracing::trace!("Token buffer grown to {} bytes", self.capacity);
        }

        let start = self.buffer.len();
        self.buffer.resize(self.capacity, 0);

        loop {
            match reader.read(&mut self.buffer[start..]) {
                Ok(0) => {
                    self.buffer.truncate(start);
                    self.eof = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.buffer.truncate(start + n);
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buffer.truncate(start);
                    return Err(e.into());
                }
            }
        }
    }
}
