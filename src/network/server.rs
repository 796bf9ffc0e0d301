//! TCP Server
//!
//! Accepts connections and dispatches each one to its own worker thread.
//!
//! ## Lifecycle
//! ```text
//! Created ──run()──▶ Running ──stop()──▶ Stopping ──workers joined──▶ Stopped
//!    └──────────────────────stop()───────────────────────────────────────▲
//! ```
//!
//! `stop()` sets the stop flag and wakes the blocked `accept` with a
//! connection to the listener's own address. The accept loop then exits,
//! closes the listener, cancels the connection context and waits for every
//! worker to finish.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::sync::WaitGroup;
use parking_lot::{Condvar, Mutex};

use crate::context::Context;
use crate::error::{Error, Result, ResultExt};
use crate::handler::ConnectionHandler;
use super::TcpConnection;

/// Receives accept failures and connection handler failures
///
/// Called concurrently from worker threads.
pub type ErrorHandler = Arc<dyn Fn(Error) + Send + Sync>;

/// How long `stop()` waits for the wake-up connection
const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// Server lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Created,
    Running,
    Stopping,
    Stopped,
}

/// Everything a server needs to start
pub struct ServerOptions {
    /// Address to bind (`host:port`, port 0 picks a free one)
    pub address: String,

    /// Serves each accepted connection
    pub connection_handler: Arc<dyn ConnectionHandler>,

    /// Sink for operational failures
    pub error_handler: ErrorHandler,
}

struct Lifecycle {
    state: ServerState,

    /// Taken by `run`, dropped (closed) exactly once
    listener: Option<TcpListener>,
}

/// TCP server
pub struct Server {
    connection_handler: Arc<dyn ConnectionHandler>,
    error_handler: ErrorHandler,
    local_addr: SocketAddr,
    stopped: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
    state_changed: Condvar,
}

impl Server {
    /// Bind the listener
    pub fn bind(options: ServerOptions) -> Result<Self> {
        let listener = TcpListener::bind(&options.address)
            .wrap_err(&format!("unable to listen on address {:?}", options.address))?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Listening on {}", local_addr);

        Ok(Self {
            connection_handler: options.connection_handler,
            error_handler: options.error_handler,
            local_addr,
            stopped: AtomicBool::new(false),
            lifecycle: Mutex::new(Lifecycle {
                state: ServerState::Created,
                listener: Some(listener),
            }),
            state_changed: Condvar::new(),
        })
    }

    /// The bound address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> ServerState {
        self.lifecycle.lock().state
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Accept and serve connections until [`stop`](Self::stop) is called
    ///
    /// Blocks; returns once the listener is closed and every connection
    /// worker has finished.
    pub fn run(&self, ctx: &Context) -> Result<()> {
        let listener = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.state != ServerState::Created {
                return Err(Error::ServerState(format!(
                    "cannot run a server in state {:?}",
                    lifecycle.state
                )));
            }
            lifecycle.state = ServerState::Running;
            lifecycle
                .listener
                .take()
                .ok_or_else(|| Error::ServerState("listener already taken".to_string()))?
        };

        let ctx = ctx.with_cancel();
        let workers = WaitGroup::new();

        while !self.is_stopped() {
            match listener.accept() {
                Ok((stream, peer)) => {
                    if self.is_stopped() {
                        // The wake-up connection, or a client that lost the race with stop()
                        tracing::debug!("Dropping connection from {} accepted during shutdown", peer);
                        (self.error_handler)(Error::ListenerClosed.wrap("unable to accept the connection"));
                        continue;
                    }
                    tracing::debug!("Accepted connection from {}", peer);
                    self.spawn_worker(&ctx, stream, peer, workers.clone());
                }
                Err(e) => {
                    (self.error_handler)(Error::from(e).wrap("unable to accept the connection"));
                }
            }
        }

        drop(listener);
        tracing::info!("Listener on {} closed, waiting for connections to finish", self.local_addr);

        ctx.cancel();
        workers.wait();

        self.set_state(ServerState::Stopped);
        tracing::info!("Server on {} stopped", self.local_addr);
        Ok(())
    }

    /// Stop accepting and wait for in-flight connections
    ///
    /// Must not be called from a connection handler: it waits for all of
    /// them, including the caller.
    ///
    /// If the wake-up connection fails, the failure goes to the error
    /// handler and `stop()` returns without waiting. The server stays
    /// `Stopping` until `run` accepts its next connection.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);

        let mut lifecycle = self.lifecycle.lock();
        let state = lifecycle.state;
        match state {
            ServerState::Created => {
                // Never ran: just close the listener
                lifecycle.listener = None;
                lifecycle.state = ServerState::Stopped;
                self.state_changed.notify_all();
                return;
            }
            ServerState::Running => {
                lifecycle.state = ServerState::Stopping;
                if let Err(e) = self.wake_accept() {
                    drop(lifecycle);
                    tracing::warn!("Accept loop on {} not woken, not waiting for shutdown", self.local_addr);
                    (self.error_handler)(e.wrap("unable to wake the accept loop"));
                    return;
                }
            }
            ServerState::Stopping | ServerState::Stopped => {}
        }

        while lifecycle.state != ServerState::Stopped {
            self.state_changed.wait(&mut lifecycle);
        }
    }

    fn set_state(&self, state: ServerState) {
        self.lifecycle.lock().state = state;
        self.state_changed.notify_all();
    }

    /// Unblock a pending `accept` by connecting to ourselves
    fn wake_accept(&self) -> Result<()> {
        let mut addr = self.local_addr;
        if addr.ip().is_unspecified() {
            let loopback = match addr.ip() {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
            };
            addr.set_ip(loopback);
        }

        TcpStream::connect_timeout(&addr, WAKE_TIMEOUT)
            .map(drop)
            .wrap_err(&format!("unable to connect to {}", addr))
    }

    fn spawn_worker(&self, ctx: &Context, stream: TcpStream, peer: SocketAddr, done: WaitGroup) {
        let ctx = ctx.clone();
        let handler = Arc::clone(&self.connection_handler);
        let error_handler = Arc::clone(&self.error_handler);

        let spawned = thread::Builder::new()
            .name(format!("conn-{}", peer))
            .spawn(move || {
                let _done = done;

                let mut connection = match TcpConnection::new(stream) {
                    Ok(connection) => connection,
                    Err(e) => {
                        error_handler(e.wrap("unable to set up the connection"));
                        return;
                    }
                };

                let result = handler.handle_connection(&ctx, &mut connection);
                if let Err(e) = connection.close() {
                    tracing::trace!("Closing connection from {} failed: {}", peer, e);
                }
                if let Err(e) = result {
                    error_handler(e.wrap("unable to handle the connection"));
                }
            });

        if let Err(e) = spawned {
            (self.error_handler)(Error::from(e).wrap("unable to spawn a connection worker"));
        }
    }
}
