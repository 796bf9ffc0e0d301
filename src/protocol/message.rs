//! Message definitions
//!
//! The format-agnostic three-part message: introduction, headers, body.

use std::borrow::Borrow;
use std::collections::HashMap;

use bytes::Bytes;

use crate::error::{Error, Result};

/// Non-empty header key
///
/// Backed by `Bytes`, so it is immutable and hashable while the public
/// contract stays byte-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeaderKey(Bytes);

impl HeaderKey {
    pub fn new(raw: impl Into<Bytes>) -> Result<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(Error::EmptyField("header key"));
        }
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

// Hash and Eq of HeaderKey match those of the underlying slice.
impl Borrow<[u8]> for HeaderKey {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

/// Non-empty header value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeaderValue(Bytes);

impl HeaderValue {
    pub fn new(raw: impl Into<Bytes>) -> Result<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(Error::EmptyField("header value"));
        }
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Header map
///
/// Inserting an existing key overwrites the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(HashMap<HeaderKey, HeaderValue>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: HeaderKey, value: HeaderValue) -> Option<HeaderValue> {
        self.0.insert(key, value)
    }

    /// Validate and insert a raw key/value pair
    pub fn insert_raw(&mut self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Result<()> {
        self.insert(HeaderKey::new(key)?, HeaderValue::new(value)?);
        Ok(())
    }

    /// Look up a value by its raw key bytes
    pub fn get(&self, key: &[u8]) -> Option<&HeaderValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderKey, &HeaderValue)> {
        self.0.iter()
    }
}

impl FromIterator<(HeaderKey, HeaderValue)> for Headers {
    fn from_iter<I: IntoIterator<Item = (HeaderKey, HeaderValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Drop present-but-empty headers
pub(crate) fn normalize_headers(headers: Option<Headers>) -> Option<Headers> {
    headers.filter(|h| !h.is_empty())
}

/// Drop a present-but-empty body
pub(crate) fn normalize_body(body: Option<Bytes>) -> Option<Bytes> {
    body.filter(|b| !b.is_empty())
}

/// A wire message
///
/// The introduction is never empty; empty headers or body are stored as
/// absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    introduction: Bytes,
    headers: Option<Headers>,
    body: Option<Bytes>,
}

impl Message {
    pub fn new(
        introduction: impl Into<Bytes>,
        headers: Option<Headers>,
        body: Option<Bytes>,
    ) -> Result<Self> {
        let introduction = introduction.into();
        if introduction.is_empty() {
            return Err(Error::EmptyField("introduction"));
        }

        Ok(Self {
            introduction,
            headers: normalize_headers(headers),
            body: normalize_body(body),
        })
    }

    pub fn builder() -> MessageBuilder {
        MessageBuilder::default()
    }

    pub fn introduction(&self) -> &Bytes {
        &self.introduction
    }

    pub fn headers(&self) -> Option<&Headers> {
        self.headers.as_ref()
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn into_parts(self) -> (Bytes, Option<Headers>, Option<Bytes>) {
        (self.introduction, self.headers, self.body)
    }
}

/// Builder for Message
#[derive(Debug, Default)]
pub struct MessageBuilder {
    introduction: Option<Bytes>,
    headers: Option<Headers>,
    body: Option<Bytes>,
}

impl MessageBuilder {
    pub fn introduction(mut self, introduction: impl Into<Bytes>) -> Self {
        self.introduction = Some(introduction.into());
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn build(self) -> Result<Message> {
        let introduction = self.introduction.ok_or(Error::MissingField("introduction"))?;
        Message::new(introduction, self.headers, self.body)
    }
}
