//! Configuration for tcpwire
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::network::{ClientOptions, ConnectionHandlerOptions};
use crate::protocol::separator::{SeparationParams, SeparatorProtocol};
use crate::protocol::{DEFAULT_INITIAL_BUFFER_SIZE, DEFAULT_MAX_TOKEN_SIZE};

/// Main configuration for a tcpwire server or client
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address (server) or remote address (client)
    pub listen_addr: String,

    /// Per-request read timeout
    pub read_timeout: Option<Duration>,

    /// Per-response write timeout
    pub write_timeout: Option<Duration>,

    /// Time a request handler may take (server only)
    pub handling_timeout: Option<Duration>,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Wire format separators
    pub separation: SeparationParams,

    /// Token buffer starting size (in bytes)
    pub initial_buffer_size: usize,

    /// Largest accepted message (in bytes)
    pub max_token_size: usize,
}

impl Config {
    /// Create a config with default sizes and no timeouts
    ///
    /// Separators have no default and must always be supplied.
    pub fn new(separation: SeparationParams) -> Self {
        Self {
            listen_addr: "127.0.0.1:7878".to_string(),
            read_timeout: None,
            write_timeout: None,
            handling_timeout: None,
            separation,
            initial_buffer_size: DEFAULT_INITIAL_BUFFER_SIZE, // 4 KB
            max_token_size: DEFAULT_MAX_TOKEN_SIZE,           // 64 KB
        }
    }

    /// Create a new config builder
    pub fn builder(separation: SeparationParams) -> ConfigBuilder {
        ConfigBuilder {
            config: Config::new(separation),
        }
    }

    /// Check that the config describes a usable protocol
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.is_empty() {
            return Err(Error::Config("listen address cannot be empty".to_string()));
        }
        self.separation.validate()?;
        if self.initial_buffer_size == 0 || self.initial_buffer_size > self.max_token_size {
            return Err(Error::Config(format!(
                "initial buffer size must be in 1..={} bytes, got {}",
                self.max_token_size, self.initial_buffer_size
            )));
        }
        Ok(())
    }

    /// Build the separator protocol this config describes
    pub fn protocol(&self) -> Result<SeparatorProtocol> {
        self.validate()?;
        SeparatorProtocol::with_buffer_sizes(
            self.separation.clone(),
            self.initial_buffer_size,
            self.max_token_size,
        )
    }

    pub fn connection_options(&self) -> ConnectionHandlerOptions {
        ConnectionHandlerOptions {
            read_timeout: self.read_timeout,
            write_timeout: self.write_timeout,
            handling_timeout: self.handling_timeout,
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            read_timeout: self.read_timeout,
            write_timeout: self.write_timeout,
            connect_timeout: None,
        }
    }
}

/// Builder for Config
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the read timeout
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = Some(timeout);
        self
    }

    /// Set the write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = Some(timeout);
        self
    }

    /// Set the request handling timeout
    pub fn handling_timeout(mut self, timeout: Duration) -> Self {
        self.config.handling_timeout = Some(timeout);
        self
    }

    /// Set the initial token buffer size (in bytes)
    pub fn initial_buffer_size(mut self, size: usize) -> Self {
        self.config.initial_buffer_size = size;
        self
    }

    /// Set the maximum token size (in bytes)
    pub fn max_token_size(mut self, size: usize) -> Self {
        self.config.max_token_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
