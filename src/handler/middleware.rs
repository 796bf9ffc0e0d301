//! Middleware chains
//!
//! A middleware takes a handler and returns a decorated one. Chains are
//! applied in registration order, so the last registered middleware ends up
//! outermost and runs first.

use std::sync::Arc;
use std::time::Instant;

use crate::context::Context;
use crate::error::Result;
use crate::network::ByteStream;
use super::{ConnectionHandler, Reply, RequestHandler};

/// Decorates a request handler
pub type RequestMiddleware<Req, Resp> =
    Box<dyn Fn(Arc<dyn RequestHandler<Req, Resp>>) -> Arc<dyn RequestHandler<Req, Resp>> + Send + Sync>;

/// Decorates a connection handler
pub type ConnectionMiddleware =
    Box<dyn Fn(Arc<dyn ConnectionHandler>) -> Arc<dyn ConnectionHandler> + Send + Sync>;

/// Wrap `handler` with each middleware in turn
pub fn apply_request_middlewares<Req, Resp>(
    handler: Arc<dyn RequestHandler<Req, Resp>>,
    middlewares: &[RequestMiddleware<Req, Resp>],
) -> Arc<dyn RequestHandler<Req, Resp>> {
    middlewares
        .iter()
        .fold(handler, |handler, middleware| middleware(handler))
}

/// Wrap `handler` with each middleware in turn
pub fn apply_connection_middlewares(
    handler: Arc<dyn ConnectionHandler>,
    middlewares: &[ConnectionMiddleware],
) -> Arc<dyn ConnectionHandler> {
    middlewares
        .iter()
        .fold(handler, |handler, middleware| middleware(handler))
}

/// Traces every request with its outcome and latency
pub fn request_logging_middleware<Req, Resp>() -> RequestMiddleware<Req, Resp>
where
    Req: std::fmt::Debug + 'static,
    Resp: 'static,
{
    Box::new(|next: Arc<dyn RequestHandler<Req, Resp>>| {
        let logged = move |ctx: &Context, request: Req| -> Result<Reply<Resp>> {
            let started = Instant::now();
            tracing::trace!("Handling request {:?}", request);

            let result = next.handle_request(ctx, request);
            match &result {
                Ok(reply) => tracing::debug!(
                    "Request handled in {:?} (stop: {})",
                    started.elapsed(),
                    reply.is_stop()
                ),
                Err(e) => tracing::debug!("Request failed after {:?}: {}", started.elapsed(), e),
            }
            result
        };
        Arc::new(logged) as Arc<dyn RequestHandler<Req, Resp>>
    })
}

/// Traces connection lifetimes
pub fn connection_logging_middleware() -> ConnectionMiddleware {
    Box::new(|next: Arc<dyn ConnectionHandler>| {
        let logged = move |ctx: &Context, connection: &mut dyn ByteStream| -> Result<()> {
            let peer = connection
                .peer_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let started = Instant::now();
            tracing::debug!("Connection from {} opened", peer);

            let result = next.handle_connection(ctx, connection);
            match &result {
                Ok(()) => tracing::debug!("Connection from {} closed after {:?}", peer, started.elapsed()),
                Err(e) => tracing::debug!("Connection from {} failed: {}", peer, e),
            }
            result
        };
        Arc::new(logged) as Arc<dyn ConnectionHandler>
    })
}
