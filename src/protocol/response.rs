//! Response definitions
//!
//! A message whose introduction is the reply status.

use bytes::Bytes;

use crate::error::{Error, Result};
use super::message::{normalize_body, normalize_headers, Headers, Message};

/// A response to send to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Reply status (never empty)
    status: Bytes,

    /// Optional headers (never present-but-empty)
    headers: Option<Headers>,

    /// Optional body (never present-but-empty)
    body: Option<Bytes>,
}

impl Response {
    /// Create a response with only a status
    pub fn new(status: impl Into<Bytes>) -> Result<Self> {
        Self::builder().status(status).build()
    }

    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::default()
    }

    /// Build a response from a wire message
    pub fn from_message(message: Message) -> Result<Self> {
        let (introduction, headers, body) = message.into_parts();
        if introduction.is_empty() {
            return Err(Error::EmptyField("status"));
        }

        Ok(Self {
            status: introduction,
            headers,
            body,
        })
    }

    /// Convert to a wire message
    pub fn to_message(&self) -> Result<Message> {
        Message::new(self.status.clone(), self.headers.clone(), self.body.clone())
    }

    pub fn status(&self) -> &Bytes {
        &self.status
    }

    pub fn headers(&self) -> Option<&Headers> {
        self.headers.as_ref()
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}

/// Builder for Response
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    status: Option<Bytes>,
    headers: Option<Headers>,
    body: Option<Bytes>,
}

impl ResponseBuilder {
    pub fn status(mut self, status: impl Into<Bytes>) -> Self {
        self.status = Some(status.into());
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

    pub fn build(self) -> Result<Response> {
        let status = self.status.ok_or(Error::MissingField("status"))?;
        if status.is_empty() {
            return Err(Error::EmptyField("status"));
        }

        Ok(Response {
            status,
            headers: normalize_headers(self.headers),
            body: normalize_body(self.body),
        })
    }
}
