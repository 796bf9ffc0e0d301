//! Middleware Tests
//!
//! Tests for request and connection middleware chains.

use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tcpwire::handler::{
    apply_connection_middlewares, apply_request_middlewares, connection_logging_middleware,
    request_logging_middleware, ConnectionHandler, ConnectionMiddleware, RequestHandler,
    RequestMiddleware,
};
use tcpwire::network::ByteStream;
use tcpwire::{Context, Error, Reply, Request, Response, Result};

// =============================================================================
// Test Helpers
// =============================================================================

type Trace = Arc<Mutex<Vec<String>>>;

/// Request middleware that records entry and exit under `name`
fn tracing_request_middleware(name: &'static str, trace: Trace) -> RequestMiddleware<Request, Response> {
    Box::new(move |next: Arc<dyn RequestHandler<Request, Response>>| {
        let trace = trace.clone();
        Arc::new(move |ctx: &Context, request: Request| -> Result<Reply<Response>> {
            trace.lock().push(format!("{} before", name));
            let reply = next.handle_request(ctx, request);
            trace.lock().push(format!("{} after", name));
            reply
        }) as Arc<dyn RequestHandler<Request, Response>>
    })
}

/// Connection middleware that records entry under `name`
fn tracing_connection_middleware(name: &'static str, trace: Trace) -> ConnectionMiddleware {
    Box::new(move |next: Arc<dyn ConnectionHandler>| {
        let trace = trace.clone();
        Arc::new(move |ctx: &Context, connection: &mut dyn ByteStream| -> Result<()> {
            trace.lock().push(name.to_string());
            next.handle_connection(ctx, connection)
        }) as Arc<dyn ConnectionHandler>
    })
}

fn recording_handler(trace: Trace) -> Arc<dyn RequestHandler<Request, Response>> {
    Arc::new(move |_ctx: &Context, _request: Request| -> Result<Reply<Response>> {
        trace.lock().push("handler".to_string());
        Ok(Reply::Continue(Response::new("ok")?))
    })
}

struct NullStream(Cursor<Vec<u8>>);

impl Read for NullStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Write for NullStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ByteStream for NullStream {
    fn set_read_deadline(&mut self, _deadline: Option<Instant>) -> io::Result<()> {
        Ok(())
    }

    fn set_write_deadline(&mut self, _deadline: Option<Instant>) -> io::Result<()> {
        Ok(())
    }
}

// =============================================================================
// Request Middleware Tests
// =============================================================================

#[test]
fn test_request_middlewares_last_registered_runs_first() {
    let trace: Trace = Arc::default();
    let handler = apply_request_middlewares(
        recording_handler(trace.clone()),
        &[
            tracing_request_middleware("first", trace.clone()),
            tracing_request_middleware("second", trace.clone()),
        ],
    );

    handler
        .handle_request(&Context::background(), Request::new("ping").unwrap())
        .unwrap();

    assert_eq!(
        *trace.lock(),
        vec![
            "second before",
            "first before",
            "handler",
            "first after",
            "second after"
        ]
    );
}

#[test]
fn test_no_request_middlewares_is_identity() {
    let trace: Trace = Arc::default();
    let handler = apply_request_middlewares(recording_handler(trace.clone()), &[]);

    let reply = handler
        .handle_request(&Context::background(), Request::new("ping").unwrap())
        .unwrap();

    assert_eq!(&reply.response().status()[..], b"ok");
    assert_eq!(*trace.lock(), vec!["handler"]);
}

#[test]
fn test_request_logging_middleware_passes_through() {
    let handler = apply_request_middlewares(
        Arc::new(|_ctx: &Context, request: Request| -> Result<Reply<Response>> {
            if &request.action()[..] == b"fail" {
                return Err(Error::handler("boom"));
            }
            Ok(Reply::Stop(Response::new("bye")?))
        }) as Arc<dyn RequestHandler<Request, Response>>,
        &[request_logging_middleware()],
    );
    let ctx = Context::background();

    let reply = handler
        .handle_request(&ctx, Request::new("quit").unwrap())
        .unwrap();
    assert!(reply.is_stop());

    let err = handler
        .handle_request(&ctx, Request::new("fail").unwrap())
        .unwrap_err();
    assert!(matches!(err, Error::Handler(_)));
}

// =============================================================================
// Connection Middleware Tests
// =============================================================================

#[test]
fn test_connection_middlewares_last_registered_runs_first() {
    let trace: Trace = Arc::default();
    let inner_trace = trace.clone();
    let inner: Arc<dyn ConnectionHandler> = Arc::new(
        move |_ctx: &Context, _connection: &mut dyn ByteStream| -> Result<()> {
            inner_trace.lock().push("handler".to_string());
            Ok(())
        },
    );

    let handler = apply_connection_middlewares(
        inner,
        &[
            tracing_connection_middleware("first", trace.clone()),
            tracing_connection_middleware("second", trace.clone()),
            connection_logging_middleware(),
        ],
    );

    let mut stream = NullStream(Cursor::new(Vec::new()));
    handler
        .handle_connection(&Context::background(), &mut stream)
        .unwrap();

    assert_eq!(*trace.lock(), vec!["second", "first", "handler"]);
}

#[test]
fn test_connection_logging_middleware_keeps_errors() {
    let inner: Arc<dyn ConnectionHandler> = Arc::new(
        |_ctx: &Context, _connection: &mut dyn ByteStream| -> Result<()> {
            Err(Error::handler("refused"))
        },
    );
    let handler = apply_connection_middlewares(inner, &[connection_logging_middleware()]);

    let mut stream = NullStream(Cursor::new(Vec::new()));
    let err = handler
        .handle_connection(&Context::background(), &mut stream)
        .unwrap_err();

    assert_eq!(err.to_string(), "handler error: refused");
}
