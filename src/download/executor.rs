//! Runtime access for blocking consumption of a download.

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::{Handle, Runtime};

/// Tokio runtime handle used to drive a download body from blocking code.
///
/// When built with [`Executor::owned`], the executor keeps the runtime alive
/// for as long as any handle or reader refers to it. The runtime must have
/// IO and time drivers enabled, and must be multi-threaded unless another
/// thread is driving it.
#[derive(Debug, Clone)]
pub struct Executor {
    handle: Handle,
    _runtime: Option<Arc<Runtime>>,
}

impl Executor {
    /// Uses a handle to a runtime owned elsewhere.
    #[must_use]
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            _runtime: None,
        }
    }

    /// Shares ownership of `runtime`.
    #[must_use]
    pub fn owned(runtime: Arc<Runtime>) -> Self {
        Self {
            handle: runtime.handle().clone(),
            _runtime: Some(runtime),
        }
    }

    /// Captures the runtime the caller is running on, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::from_handle)
    }

    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Runs `future` to completion on the calling thread.
    ///
    /// # Panics
    ///
    /// Panics if called from inside an async execution context.
    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.handle.block_on(future)
    }

    /// True when the calling thread has entered a tokio runtime context.
    ///
    /// This includes `spawn_blocking` threads, where blocking is allowed, so
    /// it only selects a non-blocking path; it does not predict a panic.
    pub(crate) fn in_async_context() -> bool {
        Handle::try_current().is_ok()
    }
}
