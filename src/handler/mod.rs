//! Handler Module
//!
//! Application-facing seams of the server.
//!
//! - [`RequestHandler`]: turns one request into one reply
//! - [`ConnectionHandler`]: drives a whole connection
//! - middleware chains decorating either kind
//! - [`RequestRouter`]: dispatches requests by a route extracted from them

mod middleware;
mod router;

pub use middleware::{
    apply_connection_middlewares, apply_request_middlewares, connection_logging_middleware,
    request_logging_middleware, ConnectionMiddleware, RequestMiddleware,
};
pub use router::{action_route_extractor, RequestRouter, RouteExtractor};

use crate::context::Context;
use crate::error::Result;
use crate::network::ByteStream;

/// A handled request: the response to write and what to do afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<Resp> {
    /// Write the response and keep serving the connection
    Continue(Resp),

    /// Write the response, then end the connection gracefully
    Stop(Resp),
}

impl<Resp> Reply<Resp> {
    pub fn response(&self) -> &Resp {
        match self {
            Reply::Continue(response) | Reply::Stop(response) => response,
        }
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, Reply::Stop(_))
    }

    /// Split into the response and the stop flag
    pub fn into_parts(self) -> (Resp, bool) {
        match self {
            Reply::Continue(response) => (response, false),
            Reply::Stop(response) => (response, true),
        }
    }
}

/// Application request logic
///
/// Any error ends the connection without a reply. An error for which
/// [`Error::is_stop_required`](crate::Error::is_stop_required) holds ends it
/// gracefully instead.
pub trait RequestHandler<Req, Resp>: Send + Sync {
    fn handle_request(&self, ctx: &Context, request: Req) -> Result<Reply<Resp>>;
}

impl<Req, Resp, F> RequestHandler<Req, Resp> for F
where
    F: Fn(&Context, Req) -> Result<Reply<Resp>> + Send + Sync,
{
    fn handle_request(&self, ctx: &Context, request: Req) -> Result<Reply<Resp>> {
        self(ctx, request)
    }
}

/// Serves a single accepted connection until it ends
pub trait ConnectionHandler: Send + Sync {
    fn handle_connection(&self, ctx: &Context, connection: &mut dyn ByteStream) -> Result<()>;
}

impl<F> ConnectionHandler for F
where
    F: Fn(&Context, &mut dyn ByteStream) -> Result<()> + Send + Sync,
{
    fn handle_connection(&self, ctx: &Context, connection: &mut dyn ByteStream) -> Result<()> {
        self(ctx, connection)
    }
}
