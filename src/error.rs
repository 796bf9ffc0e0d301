//! Error types for tcpwire
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using tcpwire's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Why a [`Context`](crate::context::Context) is done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Unified error type for tcpwire operations
#[derive(Debug, Error)]
pub enum Error {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Framing Errors
    // -------------------------------------------------------------------------
    #[error("token too long: no complete token within {max} bytes")]
    TokenTooLong { max: usize },

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("unable to unescape at position {position}: {reason}")]
    Escape { position: usize, reason: String },

    // -------------------------------------------------------------------------
    // Grammar Errors
    // -------------------------------------------------------------------------
    #[error("invalid message part count: {0}")]
    InvalidPartCount(usize),

    #[error("header #{index} has no key-value separator")]
    MissingKeyValueSeparator { index: usize },

    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    #[error("{0} is required")]
    MissingField(&'static str),

    // -------------------------------------------------------------------------
    // Control Flow
    // -------------------------------------------------------------------------
    #[error("handling stop is required")]
    StopRequired,

    #[error("no more data")]
    NoMoreData,

    #[error("listener is closed")]
    ListenerClosed,

    #[error("route not found and `Not Found` handler isn't set")]
    RouteNotFound,

    #[error(transparent)]
    Context(#[from] ContextError),

    // -------------------------------------------------------------------------
    // Lifecycle / Configuration Errors
    // -------------------------------------------------------------------------
    #[error("server state error: {0}")]
    ServerState(String),

    #[error("configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Application Errors
    // -------------------------------------------------------------------------
    #[error("handler error: {0}")]
    Handler(Box<dyn std::error::Error + Send + Sync>),

    #[error("{context}: {cause}")]
    Wrapped { context: String, cause: Box<Error> },
}

impl Error {
    /// Wrap an application error
    pub fn handler<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Handler(err.into())
    }

    /// Add a context message on top of this error
    pub fn wrap(self, context: impl Into<String>) -> Self {
        Error::Wrapped {
            context: context.into(),
            cause: Box::new(self),
        }
    }

    /// The innermost error under any `Wrapped` layers
    pub fn root(&self) -> &Error {
        match self {
            Error::Wrapped { cause, .. } => cause.root(),
            other => other,
        }
    }

    /// Whether this error is, or wraps, [`Error::StopRequired`]
    ///
    /// Looks through `Wrapped` layers and into boxed handler errors, including
    /// their `source()` chains.
    pub fn is_stop_required(&self) -> bool {
        match self {
            Error::StopRequired => true,
            Error::Wrapped { cause, .. } => cause.is_stop_required(),
            Error::Handler(inner) => {
                let first: &(dyn std::error::Error + 'static) = inner.as_ref();
                let mut current = Some(first);
                while let Some(err) = current {
                    if let Some(own) = err.downcast_ref::<Error>() {
                        return own.is_stop_required();
                    }
                    current = err.source();
                }
                false
            }
            _ => false,
        }
    }

    /// Whether this error reports an accept after the listener was closed
    pub fn is_listener_closed(&self) -> bool {
        matches!(self.root(), Error::ListenerClosed)
    }
}

/// Extension for attaching context to fallible results
pub trait ResultExt<T> {
    fn wrap_err(self, context: &str) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn wrap_err(self, context: &str) -> Result<T> {
        self.map_err(|e| e.into().wrap(context))
    }
}
