//! Protocol Module
//!
//! Defines how requests and responses travel over a byte stream.
//!
//! ## Layers
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │  ServerProtocol / ClientProtocol  (parse + marshal)        │
//! ├──────────────────────────────┬────────────────────────────┤
//! │  BaseProtocol                │  Tokenizer                  │
//! │  Request/Response ⇄ Message  │  stream → tokens            │
//! ├──────────────────────────────┴────────────────────────────┤
//! │  MessageFormat  (Message ⇄ bytes, e.g. SeparatorFormat)    │
//! └───────────────────────────────────────────────────────────┘
//! ```

mod base;
mod message;
mod request;
mod response;
mod tokenizer;

pub mod separator;

pub use base::{BaseProtocol, DEFAULT_INITIAL_BUFFER_SIZE, DEFAULT_MAX_TOKEN_SIZE};
pub use message::{HeaderKey, HeaderValue, Headers, Message, MessageBuilder};
pub use request::{Request, RequestBuilder};
pub use response::{Response, ResponseBuilder};
pub use tokenizer::{Extraction, TokenScanner, Tokenizer};

use crate::error::Result;

/// Byte-level encoding of a [`Message`]
pub trait MessageFormat: Send + Sync {
    fn parse_message(&self, data: &[u8]) -> Result<Message>;
    fn marshal_message(&self, message: &Message) -> Result<Vec<u8>>;
}

/// What a server needs: read requests, write responses
pub trait ServerProtocol: Tokenizer {
    type Request: Send;
    type Response: Send;

    fn parse_request(&self, token: &[u8]) -> Result<Self::Request>;
    fn marshal_response(&self, response: &Self::Response) -> Result<Vec<u8>>;
}

/// What a client needs: write requests, read responses
pub trait ClientProtocol: Tokenizer {
    type Request;
    type Response;

    fn marshal_request(&self, request: &Self::Request) -> Result<Vec<u8>>;
    fn parse_response(&self, token: &[u8]) -> Result<Self::Response>;
}
