//! Byte streams
//!
//! Bidirectional streams with absolute read/write deadlines.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// A connection as seen by handlers
///
/// Deadlines are absolute: once passed, every read or write fails with
/// `TimedOut` until a new deadline is set. `None` clears the deadline.
pub trait ByteStream: Read + Write + Send {
    fn set_read_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()>;

    fn set_write_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()>;

    /// Remote address, if the stream has one
    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}

/// Time left until `deadline`
fn remaining(deadline: Option<Instant>) -> io::Result<Option<Duration>> {
    match deadline {
        None => Ok(None),
        Some(deadline) => {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                Err(io::Error::new(io::ErrorKind::TimedOut, "i/o deadline exceeded"))
            } else {
                Ok(Some(left))
            }
        }
    }
}

/// TCP implementation of [`ByteStream`]
///
/// Translates absolute deadlines into the per-call socket timeouts std
/// offers, right before each read or write.
#[derive(Debug)]
pub struct TcpConnection {
    /// Underlying socket
    stream: TcpStream,

    /// Peer address for logging
    peer_addr: Option<SocketAddr>,

    read_deadline: Option<Instant>,
    write_deadline: Option<Instant>,
}

impl TcpConnection {
    /// Wrap an accepted or dialed socket
    pub fn new(stream: TcpStream) -> Result<Self> {
        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr().ok();

        Ok(Self {
            stream,
            peer_addr,
            read_deadline: None,
            write_deadline: None,
        })
    }

    /// Dial `address`, optionally bounding the dial time
    pub fn connect(address: &str, timeout: Option<Duration>) -> Result<Self> {
        let stream = match timeout {
            None => TcpStream::connect(address)?,
            Some(timeout) => {
                let mut last_err = None;
                let mut connected = None;
                for addr in address.to_socket_addrs()? {
                    match TcpStream::connect_timeout(&addr, timeout) {
                        Ok(stream) => {
                            connected = Some(stream);
                            break;
                        }
                        Err(e) => last_err = Some(e),
                    }
                }
                match (connected, last_err) {
                    (Some(stream), _) => stream,
                    (None, Some(e)) => return Err(e.into()),
                    (None, None) => {
                        return Err(Error::Config(format!(
                            "address {:?} resolved to nothing",
                            address
                        )))
                    }
                }
            }
        };
        Self::new(stream)
    }

    /// Shut down both directions
    ///
    /// A peer that already went away is not an error.
    pub fn close(&self) -> Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_ref(&self) -> &TcpStream {
        &self.stream
    }
}

impl Read for TcpConnection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let timeout = remaining(self.read_deadline)?;
        self.stream.set_read_timeout(timeout)?;
        self.stream.read(buf)
    }
}

impl Write for TcpConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let timeout = remaining(self.write_deadline)?;
        self.stream.set_write_timeout(timeout)?;
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl ByteStream for TcpConnection {
    fn set_read_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()> {
        self.read_deadline = deadline;
        Ok(())
    }

    fn set_write_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()> {
        self.write_deadline = deadline;
        Ok(())
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }
}
