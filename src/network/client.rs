//! TCP Client
//!
//! One persistent connection performing write-then-read request cycles.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result, ResultExt};
use crate::protocol::{ClientProtocol, TokenScanner};
use super::{ByteStream, TcpConnection};

/// Client timeouts; `None` means unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientOptions {
    /// Budget for reading one response
    pub read_timeout: Option<Duration>,

    /// Budget for writing one request
    pub write_timeout: Option<Duration>,

    /// Budget for establishing the connection
    pub connect_timeout: Option<Duration>,
}

/// Request/response client over a [`ClientProtocol`]
///
/// `send_request` takes `&mut self`: the token scanner is shared between
/// cycles, so one client serves one caller at a time.
pub struct Client<P: ClientProtocol, S: ByteStream = TcpConnection> {
    options: ClientOptions,
    protocol: Arc<P>,
    connection: S,
    scanner: TokenScanner,
}

impl<P: ClientProtocol> Client<P, TcpConnection> {
    /// Dial `address`
    pub fn connect(address: &str, protocol: Arc<P>, options: ClientOptions) -> Result<Self> {
        let connection = TcpConnection::connect(address, options.connect_timeout)
            .wrap_err(&format!("unable to connect to address {:?}", address))?;
        tracing::debug!("Connected to {}", address);
        Ok(Self::from_connection(connection, protocol, options))
    }

    /// Shut the connection down
    pub fn close(self) -> Result<()> {
        self.connection
            .close()
            .wrap_err("unable to close the connection")
    }
}

impl<P: ClientProtocol, S: ByteStream> Client<P, S> {
    /// Use an already established stream
    pub fn from_connection(connection: S, protocol: Arc<P>, options: ClientOptions) -> Self {
        let scanner = TokenScanner::new(&*protocol);
        Self {
            options,
            protocol,
            connection,
            scanner,
        }
    }

    /// Send one request and wait for its response
    pub fn send_request(&mut self, request: &P::Request) -> Result<P::Response> {
        let marshalled = self
            .protocol
            .marshal_request(request)
            .wrap_err("unable to marshal the request")?;

        if let Some(write_timeout) = self.options.write_timeout {
            self.connection
                .set_write_deadline(Some(Instant::now() + write_timeout))
                .wrap_err("unable to set the write deadline")?;
        }

        self.connection
            .write_all(&marshalled)
            .and_then(|()| self.connection.flush())
            .wrap_err("unable to write the request")?;

        if let Some(read_timeout) = self.options.read_timeout {
            self.connection
                .set_read_deadline(Some(Instant::now() + read_timeout))
                .wrap_err("unable to set the read deadline")?;
        }

        // A client always expects a reply, so end of stream is an error here
        let token = self
            .scanner
            .next_token(&*self.protocol, &mut self.connection)
            .wrap_err("unable to read the response")?
            .ok_or(Error::NoMoreData)
            .wrap_err("scanner has no more tokens")?;

        self.protocol
            .parse_response(&token)
            .wrap_err("unable to parse the response")
    }

    /// The underlying stream
    pub fn connection(&self) -> &S {
        &self.connection
    }

    /// Give back the underlying stream
    pub fn into_connection(self) -> S {
        self.connection
    }
}
