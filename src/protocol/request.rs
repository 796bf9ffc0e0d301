//! Request definitions
//!
//! A message whose introduction is the requested action.

use bytes::Bytes;

use crate::error::{Error, Result};
use super::message::{normalize_body, normalize_headers, Headers, Message};

/// A parsed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// What the client asks for (never empty)
    action: Bytes,

    /// Optional headers (never present-but-empty)
    headers: Option<Headers>,

    /// Optional body (never present-but-empty)
    body: Option<Bytes>,
}

impl Request {
    /// Create a request with only an action
    pub fn new(action: impl Into<Bytes>) -> Result<Self> {
        Self::builder().action(action).build()
    }

    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// Build a request from a wire message
    pub fn from_message(message: Message) -> Result<Self> {
        let (introduction, headers, body) = message.into_parts();
        if introduction.is_empty() {
            return Err(Error::EmptyField("action"));
        }

        Ok(Self {
            action: introduction,
            headers,
            body,
        })
    }

    /// Convert to a wire message
    pub fn to_message(&self) -> Result<Message> {
        Message::new(self.action.clone(), self.headers.clone(), self.body.clone())
    }

    pub fn action(&self) -> &Bytes {
        &self.action
    }

    pub fn headers(&self) -> Option<&Headers> {
        self.headers.as_ref()
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}

/// Builder for Request
#[derive(Debug, Default)]
pub struct RequestBuilder {
    action: Option<Bytes>,
    headers: Option<Headers>,
    body: Option<Bytes>,
}

impl RequestBuilder {
    pub fn action(mut self, action: impl Into<Bytes>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Add a single header, validating key and value
    pub fn header(mut self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Result<Self> {
        self.headers
            .get_or_insert_with(Headers::new)
            .insert_raw(key, value)?;
        Ok(self)
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn build(self) -> Result<Request> {
        let action = self.action.ok_or(Error::MissingField("action"))?;
        if action.is_empty() {
            return Err(Error::EmptyField("action"));
        }

        Ok(Request {
            action,
            headers: normalize_headers(self.headers),
            body: normalize_body(self.body),
        })
    }
}
