//! Router Tests
//!
//! Tests for route-based request dispatch.

use std::sync::Arc;

use bytes::Bytes;
use tcpwire::handler::RequestHandler;
use tcpwire::{Context, Error, Reply, Request, RequestRouter, Response, Result};

// =============================================================================
// Test Helpers
// =============================================================================

/// Handler that always answers with `status`
fn answer(status: &'static str) -> Arc<dyn RequestHandler<Request, Response>> {
    Arc::new(move |_ctx: &Context, _request: Request| -> Result<Reply<Response>> {
        Ok(Reply::Continue(Response::new(status)?))
    })
}

fn route(router: &RequestRouter<Request, Response>, action: &'static str) -> Result<Response> {
    router
        .handle_request(&Context::background(), Request::new(action)?)
        .map(|reply| reply.into_parts().0)
}

// =============================================================================
// Dispatch Tests
// =============================================================================

#[test]
fn test_routes_by_action() {
    let mut router = RequestRouter::by_action();
    router
        .set_route_handler("get", answer("got"))
        .set_route_handler("put", answer("stored"));

    assert_eq!(router.route_count(), 2);
    assert_eq!(&route(&router, "get").unwrap().status()[..], b"got");
    assert_eq!(&route(&router, "put").unwrap().status()[..], b"stored");
}

#[test]
fn test_route_match_is_exact() {
    let mut router = RequestRouter::by_action();
    router.set_route_handler("get", answer("got"));

    assert!(matches!(route(&router, "GET"), Err(Error::RouteNotFound)));
    assert!(matches!(route(&router, "gets"), Err(Error::RouteNotFound)));
}

#[test]
fn test_replacing_route_handler() {
    let mut router = RequestRouter::by_action();
    router
        .set_route_handler("get", answer("old"))
        .set_route_handler("get", answer("new"));

    assert_eq!(router.route_count(), 1);
    assert_eq!(&route(&router, "get").unwrap().status()[..], b"new");
}

#[test]
fn test_not_found_handler() {
    let mut router = RequestRouter::by_action();
    router
        .set_route_handler("get", answer("got"))
        .set_not_found_handler(answer("not_found"));

    assert_eq!(&route(&router, "delete").unwrap().status()[..], b"not_found");
}

#[test]
fn test_missing_route_without_not_found_handler() {
    let router = RequestRouter::by_action();
    assert!(matches!(route(&router, "anything"), Err(Error::RouteNotFound)));
}

#[test]
fn test_stop_reply_passes_through() {
    let mut router = RequestRouter::by_action();
    router.set_route_handler(
        "quit",
        Arc::new(|_ctx: &Context, _request: Request| -> Result<Reply<Response>> {
            Ok(Reply::Stop(Response::new("bye")?))
        }),
    );

    let reply = router
        .handle_request(&Context::background(), Request::new("quit").unwrap())
        .unwrap();
    assert!(reply.is_stop());
}

// =============================================================================
// Extractor Tests
// =============================================================================

#[test]
fn test_custom_route_extractor() {
    let mut router: RequestRouter<Request, Response> =
        RequestRouter::new(Box::new(|_ctx: &Context, request: &Request| -> Result<Bytes> {
            let route = request
                .headers()
                .and_then(|h| h.get(b"route"))
                .ok_or(Error::MissingField("route header"))?;
            Ok(Bytes::copy_from_slice(route.as_bytes()))
        }));
    router.set_route_handler("users", answer("user list"));

    let request = Request::builder()
        .action("get")
        .header("route", "users")
        .unwrap()
        .build()
        .unwrap();
    let reply = router
        .handle_request(&Context::background(), request)
        .unwrap();
    assert_eq!(&reply.response().status()[..], b"user list");
}

#[test]
fn test_route_extractor_error_is_wrapped() {
    let router: RequestRouter<Request, Response> =
        RequestRouter::new(Box::new(|_ctx: &Context, _request: &Request| -> Result<Bytes> {
            Err(Error::MissingField("route"))
        }));

    let err = route(&router, "get").unwrap_err();

    assert!(matches!(err.root(), Error::MissingField("route")));
    assert!(err.to_string().starts_with("unable to extract the request route"));
}
