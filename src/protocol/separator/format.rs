//! Separator-based message format
//!
//! ## Wire Format
//! ```text
//! <intro><part-sep><key1><kv-sep><val1><pair-sep>...<part-sep><body>
//! ```
//! Every field is escaped against all four separators, so payload bytes
//! never collide with framing.

use bytes::Bytes;

use crate::error::{Error, Result, ResultExt};
use crate::protocol::message::{HeaderKey, HeaderValue, Headers, Message};
use crate::protocol::MessageFormat;
use super::escaping::{escape_separators, unescape_separators};
use super::SeparationParams;

/// Number of parts in a message: introduction, headers, body
pub const MESSAGE_PART_COUNT: usize = 3;

/// Split `data` on `separator`, producing at most `limit` parts
fn split_n<'a>(data: &'a [u8], separator: &[u8], limit: usize) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();
    let mut rest = data;
    while parts.len() + 1 < limit {
        match find(rest, separator) {
            Some(index) => {
                parts.push(&rest[..index]);
                rest = &rest[index + separator.len()..];
            }
            None => break,
        }
    }
    parts.push(rest);
    parts
}

/// Split `data` on every occurrence of `separator`
fn split_all<'a>(data: &'a [u8], separator: &[u8]) -> Vec<&'a [u8]> {
    split_n(data, separator, usize::MAX)
}

/// Index of the first occurrence of `needle` in `haystack`
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Parses and marshals messages using [`SeparationParams`]
#[derive(Debug, Clone)]
pub struct SeparatorFormat {
    params: SeparationParams,
}

impl SeparatorFormat {
    pub fn new(params: SeparationParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SeparationParams {
        &self.params
    }

    fn parse_headers(&self, marshalled: &[u8]) -> Result<Headers> {
        let mut headers = Headers::new();
        for (index, pair) in split_all(marshalled, &self.params.header_separator)
            .into_iter()
            .enumerate()
        {
            let kv_separator = &self.params.header_key_value_separator;
            let separator_index =
                find(pair, kv_separator).ok_or(Error::MissingKeyValueSeparator { index })?;

            let escaped_key = &pair[..separator_index];
            if escaped_key.is_empty() {
                return Err(Error::EmptyField("header key"));
            }
            let key = unescape_separators(escaped_key)
                .wrap_err("unable to unescape separators in the header key")?;

            let escaped_value = &pair[separator_index + kv_separator.len()..];
            if escaped_value.is_empty() {
                return Err(Error::EmptyField("header value"));
            }
            let value = unescape_separators(escaped_value)
                .wrap_err("unable to unescape separators in the header value")?;

            // Last occurrence of a key wins
            headers.insert(HeaderKey::new(key)?, HeaderValue::new(value)?);
        }
        Ok(headers)
    }
}

impl MessageFormat for SeparatorFormat {
    fn parse_message(&self, data: &[u8]) -> Result<Message> {
        let parts = split_n(data, &self.params.message_part_separator, MESSAGE_PART_COUNT);
        if parts.len() < MESSAGE_PART_COUNT {
            return Err(Error::InvalidPartCount(parts.len()));
        }

        let escaped_introduction = parts[0];
        if escaped_introduction.is_empty() {
            return Err(Error::EmptyField("introduction"));
        }
        let introduction = unescape_separators(escaped_introduction)
            .wrap_err("unable to unescape separators in the introduction")?;

        let headers = if parts[1].is_empty() {
            None
        } else {
            Some(self.parse_headers(parts[1])?)
        };

        let body = unescape_separators(parts[2])
            .wrap_err("unable to unescape separators in the body")?;

        Message::new(introduction, headers, Some(Bytes::from(body)))
    }

    fn marshal_message(&self, message: &Message) -> Result<Vec<u8>> {
        let separators = self.params.all();

        let mut marshalled_headers: Vec<Vec<u8>> = message
            .headers()
            .map(|headers| {
                headers
                    .iter()
                    .map(|(key, value)| {
                        let mut pair = escape_separators(key.as_bytes(), &separators[..]);
                        pair.extend_from_slice(&self.params.header_key_value_separator);
                        pair.extend_from_slice(&escape_separators(value.as_bytes(), &separators[..]));
                        pair
                    })
                    .collect()
            })
            .unwrap_or_default();
        // HashMap order is arbitrary; sorting keeps the output deterministic
        marshalled_headers.sort();

        let body = message.body().map(|b| &b[..]).unwrap_or(&[]);

        let mut marshalled = escape_separators(message.introduction(), &separators[..]);
        marshalled.extend_from_slice(&self.params.message_part_separator);
        marshalled.extend_from_slice(&marshalled_headers.join(&self.params.header_separator[..]));
        marshalled.extend_from_slice(&self.params.message_part_separator);
        marshalled.extend_from_slice(&escape_separators(body, &separators[..]));

        Ok(marshalled)
    }
}
