//! Request router
//!
//! Dispatches requests to handlers by a route token extracted from each
//! request. Routes match by exact byte equality.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::context::Context;
use crate::error::{Error, Result, ResultExt};
use crate::protocol::{Request, Response};
use super::{Reply, RequestHandler};

/// Pulls the route out of a request
pub type RouteExtractor<Req> = Box<dyn Fn(&Context, &Req) -> Result<Bytes> + Send + Sync>;

/// Routes by the request action
pub fn action_route_extractor() -> RouteExtractor<Request> {
    Box::new(|_ctx: &Context, request: &Request| Ok(request.action().clone()))
}

/// Route → handler map with an optional fallback
pub struct RequestRouter<Req, Resp> {
    route_extractor: RouteExtractor<Req>,
    handlers: HashMap<Bytes, Arc<dyn RequestHandler<Req, Resp>>>,
    not_found_handler: Option<Arc<dyn RequestHandler<Req, Resp>>>,
}

impl<Req, Resp> RequestRouter<Req, Resp> {
    pub fn new(route_extractor: RouteExtractor<Req>) -> Self {
        Self {
            route_extractor,
            handlers: HashMap::new(),
            not_found_handler: None,
        }
    }

    /// Register `handler` for `route`, replacing any earlier one
    pub fn set_route_handler(
        &mut self,
        route: impl Into<Bytes>,
        handler: Arc<dyn RequestHandler<Req, Resp>>,
    ) -> &mut Self {
        self.handlers.insert(route.into(), handler);
        self
    }

    /// Handler for requests whose route has no registration
    pub fn set_not_found_handler(&mut self, handler: Arc<dyn RequestHandler<Req, Resp>>) -> &mut Self {
        self.not_found_handler = Some(handler);
        self
    }

    pub fn route_count(&self) -> usize {
        self.handlers.len()
    }
}

impl RequestRouter<Request, Response> {
    /// Router keyed by the request action
    pub fn by_action() -> Self {
        Self::new(action_route_extractor())
    }
}

impl<Req, Resp> RequestHandler<Req, Resp> for RequestRouter<Req, Resp>
where
    Req: Send + Sync,
    Resp: Send + Sync,
{
    fn handle_request(&self, ctx: &Context, request: Req) -> Result<Reply<Resp>> {
        let route = (self.route_extractor)(ctx, &request)
            .wrap_err("unable to extract the request route")?;

        let handler = match self.handlers.get(&route) {
            Some(handler) => handler,
            None => {
                tracing::trace!("No handler for route {:?}", String::from_utf8_lossy(&route));
                self.not_found_handler.as_ref().ok_or(Error::RouteNotFound)?
            }
        };

        handler.handle_request(ctx, request)
    }
}
