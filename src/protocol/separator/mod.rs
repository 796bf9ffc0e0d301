//! Separator-based Protocol
//!
//! A concrete wire protocol where messages, message parts, header pairs and
//! header keys/values are delimited by operator-supplied byte sequences.
//!
//! ## Frame
//! ```text
//! <intro>|<key>=<value>&<key>=<value>|<body>\n
//! ```
//! (shown with `\n`, `|`, `&`, `=`; every separator is configurable)

mod escaping;
mod format;

pub use escaping::{escape_separators, is_escape_byte, unescape_separators, ESCAPE_MARKER};
pub use format::{SeparatorFormat, MESSAGE_PART_COUNT};

use crate::error::{Error, Result};
use super::base::BaseProtocol;
use super::request::Request;
use super::response::Response;
use super::tokenizer::{Extraction, Tokenizer};
use super::{ClientProtocol, ServerProtocol};

/// The four separators of the wire format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparationParams {
    /// Between successive messages on the stream
    pub message_separator: Vec<u8>,

    /// Between introduction, headers and body
    pub message_part_separator: Vec<u8>,

    /// Between header entries
    pub header_separator: Vec<u8>,

    /// Between a header key and its value
    pub header_key_value_separator: Vec<u8>,
}

impl SeparationParams {
    pub fn new(
        message_separator: impl Into<Vec<u8>>,
        message_part_separator: impl Into<Vec<u8>>,
        header_separator: impl Into<Vec<u8>>,
        header_key_value_separator: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            message_separator: message_separator.into(),
            message_part_separator: message_part_separator.into(),
            header_separator: header_separator.into(),
            header_key_value_separator: header_key_value_separator.into(),
        }
    }

    /// All separators, in escaping order
    pub fn all(&self) -> [&[u8]; 4] {
        [
            &self.message_separator,
            &self.message_part_separator,
            &self.header_separator,
            &self.header_key_value_separator,
        ]
    }

    /// Reject separators the format cannot work with
    pub fn validate(&self) -> Result<()> {
        let names = [
            "message separator",
            "message part separator",
            "header separator",
            "header key-value separator",
        ];
        for (name, separator) in names.iter().zip(self.all()) {
            if separator.is_empty() {
                return Err(Error::Config(format!("{} cannot be empty", name)));
            }
            if let Some(&byte) = separator.iter().find(|&&b| is_escape_byte(b)) {
                return Err(Error::Config(format!(
                    "{} cannot contain {:?}: '%' and lowercase hex digits are reserved for escaping",
                    name, byte as char
                )));
            }
        }
        Ok(())
    }
}

/// Split a stream on `separator`
///
/// Bytes after the last separator at end of stream form a final token.
pub fn extract_separated<'a>(
    buffered: &'a [u8],
    separator: &[u8],
    at_eof: bool,
) -> Extraction<'a> {
    match format::find(buffered, separator) {
        Some(index) => Extraction::Token {
            consumed: index + separator.len(),
            token: &buffered[..index],
        },
        None if !at_eof => Extraction::NeedMore,
        None if buffered.is_empty() => Extraction::Final(None),
        None => Extraction::Final(Some(buffered)),
    }
}

/// Separator-based protocol for both server and client
#[derive(Debug, Clone)]
pub struct SeparatorProtocol {
    base: BaseProtocol<SeparatorFormat>,
    params: SeparationParams,
}

impl SeparatorProtocol {
    /// Create a protocol with the default buffer sizes
    pub fn new(params: SeparationParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            base: BaseProtocol::new(SeparatorFormat::new(params.clone())),
            params,
        })
    }

    /// Create a protocol with explicit buffer sizes
    pub fn with_buffer_sizes(
        params: SeparationParams,
        initial_buffer_size: usize,
        max_token_size: usize,
    ) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            base: BaseProtocol::with_buffer_sizes(
                SeparatorFormat::new(params.clone()),
                initial_buffer_size,
                max_token_size,
            )?,
            params,
        })
    }

    pub fn params(&self) -> &SeparationParams {
        &self.params
    }

    /// Terminate a marshalled message with the message separator
    fn frame(&self, mut marshalled: Vec<u8>) -> Vec<u8> {
        marshalled.extend_from_slice(&self.params.message_separator);
        marshalled
    }
}

impl Tokenizer for SeparatorProtocol {
    fn initial_buffer_size(&self) -> usize {
        self.base.initial_buffer_size()
    }

    fn max_token_size(&self) -> usize {
        self.base.max_token_size()
    }

    fn extract_token<'a>(&self, buffered: &'a [u8], at_eof: bool) -> Result<Extraction<'a>> {
        Ok(extract_separated(buffered, &self.params.message_separator, at_eof))
    }
}

impl ServerProtocol for SeparatorProtocol {
    type Request = Request;
    type Response = Response;

    fn parse_request(&self, token: &[u8]) -> Result<Request> {
        self.base.parse_request(token)
    }

    fn marshal_response(&self, response: &Response) -> Result<Vec<u8>> {
        self.base.marshal_response(response).map(|m| self.frame(m))
    }
}

impl ClientProtocol for SeparatorProtocol {
    type Request = Request;
    type Response = Response;

    fn marshal_request(&self, request: &Request) -> Result<Vec<u8>> {
        self.base.marshal_request(request).map(|m| self.frame(m))
    }

    fn parse_response(&self, token: &[u8]) -> Result<Response> {
        self.base.parse_response(token)
    }
}
