//! Connection Handler
//!
//! Drives one connection through its request/response cycles.
//!
//! ## Cycle
//! 1. check the connection context (canceled → fail)
//! 2. read one token under the read deadline (end of stream → stop)
//! 3. parse it into a request
//! 4. run the request handler in a detached scope with its own timeout
//! 5. marshal and write the response under the write deadline
//!
//! Requests on one connection are handled strictly one after another.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::context::Context;
use crate::error::{Error, Result, ResultExt};
use crate::handler::{ConnectionHandler, RequestHandler};
use crate::protocol::{ServerProtocol, TokenScanner};
use super::ByteStream;

/// Timeouts applied per request cycle; `None` means unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionHandlerOptions {
    /// Budget for reading one request
    pub read_timeout: Option<Duration>,

    /// Budget for writing one response
    pub write_timeout: Option<Duration>,

    /// Budget the request handler sees through its context
    pub handling_timeout: Option<Duration>,
}

/// Request/response engine over a [`ServerProtocol`]
pub struct DefaultConnectionHandler<P: ServerProtocol> {
    options: ConnectionHandlerOptions,
    protocol: Arc<P>,
    request_handler: Arc<dyn RequestHandler<P::Request, P::Response>>,
}

impl<P: ServerProtocol> DefaultConnectionHandler<P> {
    pub fn new(
        options: ConnectionHandlerOptions,
        protocol: Arc<P>,
        request_handler: Arc<dyn RequestHandler<P::Request, P::Response>>,
    ) -> Self {
        Self {
            options,
            protocol,
            request_handler,
        }
    }

    pub fn options(&self) -> &ConnectionHandlerOptions {
        &self.options
    }

    /// Run a single request cycle
    ///
    /// Returns an error for which `is_stop_required()` holds when the
    /// connection should end gracefully: end of stream, or a handler asking
    /// to stop.
    pub fn handle_request(
        &self,
        ctx: &Context,
        connection: &mut dyn ByteStream,
        scanner: &mut TokenScanner,
    ) -> Result<()> {
        if let Some(read_timeout) = self.options.read_timeout {
            connection
                .set_read_deadline(Some(Instant::now() + read_timeout))
                .wrap_err("unable to set the read deadline")?;
        }

        let token = match scanner
            .next_token(&*self.protocol, connection)
            .wrap_err("unable to read the request")?
        {
            Some(token) => token,
            None => return Err(Error::StopRequired.wrap("scanner has no more tokens")),
        };

        let request = self
            .protocol
            .parse_request(&token)
            .wrap_err("unable to parse the request")?;

        // An admitted request finishes even if the connection context is
        // canceled; only the handling timeout bounds it.
        let handling_ctx = match self.options.handling_timeout {
            Some(timeout) => ctx.without_cancel().with_timeout(timeout),
            None => ctx.without_cancel(),
        };
        let handled = {
            let _scope = handling_ctx.cancel_on_drop();
            self.request_handler.handle_request(&handling_ctx, request)
        };

        let (response, stop) = match handled {
            Ok(reply) => reply.into_parts(),
            Err(e) if e.is_stop_required() => {
                return Err(e.wrap("request handler requested to stop handling"))
            }
            Err(e) => return Err(e.wrap("unable to handle the request")),
        };

        let marshalled = self
            .protocol
            .marshal_response(&response)
            .wrap_err("unable to marshal the response")?;

        if let Some(write_timeout) = self.options.write_timeout {
            connection
                .set_write_deadline(Some(Instant::now() + write_timeout))
                .wrap_err("unable to set the write deadline")?;
        }

        connection
            .write_all(&marshalled)
            .and_then(|()| connection.flush())
            .wrap_err("unable to write the response")?;
        tracing::trace!("Wrote {} byte response", marshalled.len());

        if stop {
            return Err(Error::StopRequired.wrap("request handler requested to stop handling"));
        }

        Ok(())
    }
}

impl<P: ServerProtocol> ConnectionHandler for DefaultConnectionHandler<P> {
    fn handle_connection(&self, ctx: &Context, connection: &mut dyn ByteStream) -> Result<()> {
        let peer_addr = connection
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        tracing::debug!("Connection established from {}", peer_addr);

        let mut scanner = TokenScanner::new(&*self.protocol);
        loop {
            ctx.check().wrap_err("context is done")?;

            match self.handle_request(ctx, connection, &mut scanner) {
                Ok(()) => {}
                Err(e) if e.is_stop_required() => {
                    tracing::debug!("Connection from {} finished: {}", peer_addr, e);
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!("Connection from {} failed: {}", peer_addr, e);
                    return Err(e.wrap("unable to handle the request"));
                }
            }
        }
    }
}
