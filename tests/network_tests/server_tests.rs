//! Server Tests
//!
//! Tests for the accept loop, connection workers and shutdown over real
//! loopback sockets.

use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel;
use parking_lot::Mutex;
use tcpwire::handler::{ConnectionHandler, RequestHandler};
use tcpwire::network::{ByteStream, ErrorHandler, ServerState};
use tcpwire::protocol::separator::{SeparationParams, SeparatorProtocol};
use tcpwire::{
    Client, ClientOptions, ConnectionHandlerOptions, Context, DefaultConnectionHandler, Error,
    Reply, Request, Response, Result, Server, ServerOptions,
};

// =============================================================================
// Test Helpers
// =============================================================================

fn protocol() -> Arc<SeparatorProtocol> {
    Arc::new(SeparatorProtocol::new(SeparationParams::new("\n", "|", "&", "=")).unwrap())
}

fn client_options() -> ClientOptions {
    ClientOptions {
        read_timeout: Some(Duration::from_secs(5)),
        write_timeout: Some(Duration::from_secs(5)),
        connect_timeout: Some(Duration::from_secs(5)),
    }
}

/// Collects every reported error except the expected shutdown signal
fn collecting_error_handler() -> (ErrorHandler, Arc<Mutex<Vec<String>>>) {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();
    let handler: ErrorHandler = Arc::new(move |e: Error| {
        if !e.is_listener_closed() {
            sink.lock().push(e.to_string());
        }
    });
    (handler, errors)
}

fn serve_requests(
    request_handler: Arc<dyn RequestHandler<Request, Response>>,
) -> (Arc<Server>, JoinHandle<Result<()>>, Arc<Mutex<Vec<String>>>) {
    let connection_handler = DefaultConnectionHandler::new(
        ConnectionHandlerOptions::default(),
        protocol(),
        request_handler,
    );
    serve_connections(Arc::new(connection_handler))
}

fn serve_connections(
    connection_handler: Arc<dyn ConnectionHandler>,
) -> (Arc<Server>, JoinHandle<Result<()>>, Arc<Mutex<Vec<String>>>) {
    let (error_handler, errors) = collecting_error_handler();
    let server = Arc::new(
        Server::bind(ServerOptions {
            address: "127.0.0.1:0".to_string(),
            connection_handler,
            error_handler,
        })
        .unwrap(),
    );

    let runner = server.clone();
    let handle = thread::spawn(move || runner.run(&Context::background()));
    wait_for_state(&server, ServerState::Running);

    (server, handle, errors)
}

fn wait_for_state(server: &Server, state: ServerState) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while server.state() != state {
        assert!(Instant::now() < deadline, "server never reached {:?}", state);
        thread::sleep(Duration::from_millis(5));
    }
}

fn echo_handler() -> Arc<dyn RequestHandler<Request, Response>> {
    Arc::new(|_ctx: &Context, request: Request| -> Result<Reply<Response>> {
        let mut response = Response::builder().status("ok");
        if let Some(body) = request.body() {
            response = response.body(body.clone());
        }
        Ok(Reply::Continue(response.build()?))
    })
}

fn connect(server: &Server) -> Client<SeparatorProtocol> {
    Client::connect(&server.local_addr().to_string(), protocol(), client_options()).unwrap()
}

// =============================================================================
// Serving Tests
// =============================================================================

#[test]
fn test_serves_single_client() {
    let (server, handle, errors) = serve_requests(echo_handler());

    let mut client = connect(&server);
    let request = Request::builder().action("echo").body("hello").build().unwrap();
    let response = client.send_request(&request).unwrap();
    assert_eq!(&response.status()[..], b"ok");
    assert_eq!(response.body().map(|b| &b[..]), Some(&b"hello"[..]));
    client.close().unwrap();

    server.stop();
    handle.join().unwrap().unwrap();
    assert!(errors.lock().is_empty(), "unexpected errors: {:?}", errors.lock());
}

#[test]
fn test_serves_concurrent_clients() {
    const CLIENTS: usize = 16;
    const REQUESTS: usize = 10;

    let (server, handle, errors) = serve_requests(echo_handler());
    let address = server.local_addr().to_string();

    let workers: Vec<_> = (0..CLIENTS)
        .map(|i| {
            let address = address.clone();
            thread::spawn(move || {
                let mut client = Client::connect(&address, protocol(), client_options()).unwrap();
                for j in 0..REQUESTS {
                    let body = format!("client {} request {}", i, j);
                    let request = Request::builder()
                        .action("echo")
                        .body(body.clone())
                        .build()
                        .unwrap();
                    let response = client.send_request(&request).unwrap();
                    assert_eq!(response.body().map(|b| b.to_vec()), Some(body.into_bytes()));
                }
                client.close().unwrap();
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    server.stop();
    handle.join().unwrap().unwrap();
    assert!(errors.lock().is_empty(), "unexpected errors: {:?}", errors.lock());
}

#[test]
fn test_connection_errors_are_reported() {
    let (server, handle, errors) = serve_connections(Arc::new(
        |_ctx: &Context, _connection: &mut dyn ByteStream| -> Result<()> {
            Err(Error::handler("rejected"))
        },
    ));

    let stream = TcpStream::connect(server.local_addr()).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while errors.lock().is_empty() {
        assert!(Instant::now() < deadline, "error never reported");
        thread::sleep(Duration::from_millis(5));
    }
    drop(stream);

    server.stop();
    handle.join().unwrap().unwrap();

    let errors = errors.lock();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("unable to handle the connection"));
    assert!(errors[0].contains("rejected"));
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_stop_waits_for_in_flight_requests() {
    let (entered_tx, entered_rx) = channel::bounded(1);
    let finished = Arc::new(AtomicBool::new(false));
    let handler_finished = finished.clone();

    let (server, handle, _errors) = serve_requests(Arc::new(
        move |_ctx: &Context, _request: Request| -> Result<Reply<Response>> {
            entered_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(200));
            handler_finished.store(true, Ordering::SeqCst);
            Ok(Reply::Stop(Response::new("done")?))
        },
    ));

    let address = server.local_addr().to_string();
    let client = thread::spawn(move || {
        let mut client = Client::connect(&address, protocol(), client_options()).unwrap();
        let response = client.send_request(&Request::new("slow").unwrap()).unwrap();
        assert_eq!(&response.status()[..], b"done");
    });

    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    server.stop();

    assert!(finished.load(Ordering::SeqCst));
    assert_eq!(server.state(), ServerState::Stopped);

    client.join().unwrap();
    handle.join().unwrap().unwrap();
}

#[test]
fn test_stop_refuses_new_connections() {
    let (server, handle, _errors) = serve_requests(echo_handler());
    let address = server.local_addr();

    server.stop();
    handle.join().unwrap().unwrap();

    assert!(server.is_stopped());
    assert!(TcpStream::connect_timeout(&address, Duration::from_secs(1)).is_err());
}

#[test]
fn test_stop_twice_is_noop() {
    let (server, handle, _errors) = serve_requests(echo_handler());

    server.stop();
    server.stop();

    handle.join().unwrap().unwrap();
    assert_eq!(server.state(), ServerState::Stopped);
}

#[test]
fn test_stop_before_run() {
    let (error_handler, _errors) = collecting_error_handler();
    let server = Server::bind(ServerOptions {
        address: "127.0.0.1:0".to_string(),
        connection_handler: Arc::new(
            |_ctx: &Context, _connection: &mut dyn ByteStream| -> Result<()> { Ok(()) },
        ),
        error_handler,
    })
    .unwrap();
    assert_eq!(server.state(), ServerState::Created);

    server.stop();

    assert_eq!(server.state(), ServerState::Stopped);
    assert!(matches!(
        server.run(&Context::background()),
        Err(Error::ServerState(_))
    ));
}

#[test]
fn test_run_twice_fails() {
    let (server, handle, _errors) = serve_requests(echo_handler());

    assert!(matches!(
        server.run(&Context::background()),
        Err(Error::ServerState(_))
    ));

    server.stop();
    handle.join().unwrap().unwrap();
}

#[test]
fn test_bind_address_in_use() {
    let taken = TcpListener::bind("127.0.0.1:0").unwrap();
    let (error_handler, _errors) = collecting_error_handler();

    let result = Server::bind(ServerOptions {
        address: taken.local_addr().unwrap().to_string(),
        connection_handler: Arc::new(
            |_ctx: &Context, _connection: &mut dyn ByteStream| -> Result<()> { Ok(()) },
        ),
        error_handler,
    });

    let err = result.err().unwrap();
    assert!(matches!(err.root(), Error::Io(_)));
    assert!(err.to_string().contains("unable to listen on address"));
}
