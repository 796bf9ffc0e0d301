//! Cancellation Context
//!
//! Cancelable, deadline-carrying scopes passed to connection and request
//! handlers.
//!
//! ## Scopes
//! - `background()`: root scope, never done on its own
//! - `with_cancel()`: child that is done when it or any ancestor is canceled
//! - `with_timeout()`: child that is also done once its deadline passes
//! - `without_cancel()`: fresh root, detached from the parent's cancellation
//!
//! Cancellation is cooperative: nothing is interrupted, holders poll
//! [`Context::err`] or [`Context::check`] at convenient points.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{ContextError, Result};

/// A cancellation scope
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    canceled: AtomicBool,
    deadline: Option<Instant>,
    parent: Option<Context>,
}

impl Context {
    fn new(parent: Option<Context>, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner {
                canceled: AtomicBool::new(false),
                deadline,
                parent,
            }),
        }
    }

    /// Root scope with no deadline
    pub fn background() -> Self {
        Self::new(None, None)
    }

    /// Child scope that can be canceled independently of its parent
    pub fn with_cancel(&self) -> Self {
        Self::new(Some(self.clone()), None)
    }

    /// Child scope that is done after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Child scope that is done at `deadline`
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        Self::new(Some(self.clone()), Some(deadline))
    }

    /// Fresh root scope that ignores this scope's cancellation and deadline
    pub fn without_cancel(&self) -> Self {
        Self::background()
    }

    /// Cancel this scope and every scope derived from it
    pub fn cancel(&self) {
        self.inner.canceled.store(true, Ordering::Release);
    }

    /// Cancel this scope when the returned guard is dropped
    pub fn cancel_on_drop(&self) -> CancelGuard {
        CancelGuard {
            context: self.clone(),
        }
    }

    /// The earliest deadline of this scope and its ancestors
    pub fn deadline(&self) -> Option<Instant> {
        let parent = self.inner.parent.as_ref().and_then(Context::deadline);
        match (self.inner.deadline, parent) {
            (Some(own), Some(parent)) => Some(own.min(parent)),
            (own, parent) => own.or(parent),
        }
    }

    /// Why this scope is done, if it is
    pub fn err(&self) -> Option<ContextError> {
        if self.inner.canceled.load(Ordering::Acquire) {
            return Some(ContextError::Canceled);
        }
        if let Some(deadline) = self.inner.deadline {
            if Instant::now() >= deadline {
                return Some(ContextError::DeadlineExceeded);
            }
        }
        self.inner.parent.as_ref().and_then(Context::err)
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// `Ok(())` while the scope is live
    pub fn check(&self) -> Result<()> {
        match self.err() {
            Some(reason) => Err(reason.into()),
            None => Ok(()),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

/// Cancels its scope on drop
#[must_use = "the scope is canceled as soon as the guard is dropped"]
#[derive(Debug)]
pub struct CancelGuard {
    context: Context,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.context.cancel();
    }
}
