//! # tcpwire
//!
//! A pluggable TCP request/response framework with:
//! - Incremental stream tokenizing with bounded buffers
//! - Per-connection request cycles with read/write/handling timeouts
//! - Thread-per-connection server with cooperative shutdown
//! - A symmetric blocking client
//! - An escape-safe, separator-based wire protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │             (accept loop, worker per connection)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ ConnectionHandler
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │              DefaultConnectionHandler                        │
//! │      (read token → parse → handle → marshal → write)         │
//! └──────────┬───────────────────────────────────┬──────────────┘
//!            │                                   │
//!            ▼                                   ▼
//!   ┌─────────────────┐                 ┌─────────────────┐
//!   │ ServerProtocol  │                 │ RequestHandler  │
//!   │ (tokenizer +    │                 │ (router,        │
//!   │  message format)│                 │  middlewares)   │
//!   └─────────────────┘                 └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod context;

pub mod protocol;
pub mod handler;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ContextError, Error, Result, ResultExt};
pub use config::Config;
pub use context::Context;
pub use handler::{ConnectionHandler, Reply, RequestHandler, RequestRouter};
pub use network::{Client, ClientOptions, ConnectionHandlerOptions, DefaultConnectionHandler, Server, ServerOptions};
pub use protocol::{Request, Response};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of tcpwire
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
