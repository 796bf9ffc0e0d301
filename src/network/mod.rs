//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One worker thread per connection, unbounded
//! - Each worker runs a `ConnectionHandler` (usually `DefaultConnectionHandler`)
//! - Client: one connection, one request/response cycle at a time

mod client;
mod connection;
mod server;
mod stream;

pub use client::{Client, ClientOptions};
pub use connection::{ConnectionHandlerOptions, DefaultConnectionHandler};
pub use server::{ErrorHandler, Server, ServerOptions, ServerState};
pub use stream::{ByteStream, TcpConnection};
