//! Base protocol
//!
//! Glue between the message data model and a pluggable [`MessageFormat`].
//! Swapping the format swaps the byte encoding without touching the
//! request/response conversions here.

use crate::error::{Error, Result, ResultExt};
use super::request::Request;
use super::response::Response;
use super::MessageFormat;

/// Default initial token buffer size (4 KB)
pub const DEFAULT_INITIAL_BUFFER_SIZE: usize = 4 * 1024;

/// Default maximum token size (64 KB)
pub const DEFAULT_MAX_TOKEN_SIZE: usize = 64 * 1024;

/// Request/response conversions on top of a message format
#[derive(Debug, Clone)]
pub struct BaseProtocol<F> {
    format: F,
    initial_buffer_size: usize,
    max_token_size: usize,
}

impl<F: MessageFormat> BaseProtocol<F> {
    pub fn new(format: F) -> Self {
        Self {
            format,
            initial_buffer_size: DEFAULT_INITIAL_BUFFER_SIZE,
            max_token_size: DEFAULT_MAX_TOKEN_SIZE,
        }
    }

    pub fn with_buffer_sizes(
        format: F,
        initial_buffer_size: usize,
        max_token_size: usize,
    ) -> Result<Self> {
        if initial_buffer_size == 0 || max_token_size == 0 {
            return Err(Error::Config("buffer sizes must be positive".to_string()));
        }
        if initial_buffer_size > max_token_size {
            return Err(Error::Config(format!(
                "initial buffer size {} exceeds max token size {}",
                initial_buffer_size, max_token_size
            )));
        }

        Ok(Self {
            format,
            initial_buffer_size,
            max_token_size,
        })
    }

    pub fn format(&self) -> &F {
        &self.format
    }

    pub fn initial_buffer_size(&self) -> usize {
        self.initial_buffer_size
    }

    pub fn max_token_size(&self) -> usize {
        self.max_token_size
    }

    pub fn parse_request(&self, data: &[u8]) -> Result<Request> {
        let message = self
            .format
            .parse_message(data)
            .wrap_err("unable to parse the message")?;
        Request::from_message(message).wrap_err("unable to construct the request")
    }

    pub fn parse_response(&self, data: &[u8]) -> Result<Response> {
        let message = self
            .format
            .parse_message(data)
            .wrap_err("unable to parse the message")?;
        Response::from_message(message).wrap_err("unable to construct the response")
    }

    pub fn marshal_request(&self, request: &Request) -> Result<Vec<u8>> {
        let message = request
            .to_message()
            .wrap_err("unable to convert the request to the message")?;
        self.format
            .marshal_message(&message)
            .wrap_err("unable to marshal the message")
    }

    pub fn marshal_response(&self, response: &Response) -> Result<Vec<u8>> {
        let message = response
            .to_message()
            .wrap_err("unable to convert the response to the message")?;
        self.format
            .marshal_message(&message)
            .wrap_err("unable to marshal the message")
    }
}
