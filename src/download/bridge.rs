//! Stream-to-blocking bridge.
//!
//! One dedicated thread pulls the async chunk stream and relays it, split into
//! segments of at most `relay_capacity` bytes, through a bounded channel of
//! depth one. A full relay blocks the pump, so the upstream is only polled as
//! fast as the blocking reader consumes.
//!
//! Upstream errors are recorded before the relay's sender is dropped, so a
//! reader that observes the disconnect always sees the error rather than EOF.

use std::fmt;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::{Buf, Bytes};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use futures_util::StreamExt;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::error::DownloadError;
use super::executor::Executor;
use super::state::{ConsumptionState, DownloadState};
use crate::config::DownloadSettings;
use crate::constants::{DEFAULT_CLOSE_TIMEOUT, DEFAULT_RELAY_CAPACITY};
use crate::transport::ChunkStream;

const BRIDGE_THREAD_NAME: &str = "download-stream-bridge";

/// Relay sizing and close behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BridgeSettings {
    pub relay_capacity: usize,
    pub close_timeout: Duration,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            relay_capacity: DEFAULT_RELAY_CAPACITY,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

impl From<&DownloadSettings> for BridgeSettings {
    fn from(settings: &DownloadSettings) -> Self {
        Self {
            relay_capacity: settings.relay_capacity.max(1),
            close_timeout: settings.close_timeout(),
        }
    }
}

#[derive(Debug)]
struct RecordedError {
    kind: io::ErrorKind,
    message: String,
}

#[derive(Debug, Default)]
struct Shared {
    error: Mutex<Option<RecordedError>>,
    terminate: AtomicBool,
}

impl Shared {
    fn record(&self, error: &io::Error) {
        let mut slot = self.error.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(RecordedError {
                kind: error.kind(),
                message: error.to_string(),
            });
        }
    }

    fn error(&self) -> Option<io::Error> {
        let slot = self.error.lock().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().map(|recorded| {
            io::Error::from(DownloadError::stream(io::Error::new(
                recorded.kind,
                recorded.message.clone(),
            )))
        })
    }

    fn is_terminated(&self) -> bool {
        self.terminate.load(Ordering::Acquire)
    }
}

/// Blocking [`Read`] view over a streamed download body.
///
/// Dropping the reader closes it. See [`close`](Self::close).
pub struct BlockingBodyReader {
    relay: Option<Receiver<Bytes>>,
    current: Bytes,
    shared: Arc<Shared>,
    cancel: Option<oneshot::Sender<()>>,
    done: Receiver<()>,
    worker: Option<JoinHandle<()>>,
    state: ConsumptionState,
    close_timeout: Duration,
    closed: bool,
    _executor: Executor,
}

/// Starts the pump thread for `stream`.
pub(crate) fn start(
    stream: ChunkStream,
    executor: Executor,
    settings: BridgeSettings,
    state: ConsumptionState,
) -> Result<BlockingBodyReader, DownloadError> {
    let capacity = settings.relay_capacity.max(1);
    let (relay_tx, relay_rx) = crossbeam_channel::bounded::<Bytes>(1);
    let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);
    let (cancel_tx, cancel_rx) = oneshot::channel();
    let shared = Arc::new(Shared::default());

    let runtime = executor.handle().clone();
    let pump_shared = Arc::clone(&shared);
    let worker = thread::Builder::new()
        .name(BRIDGE_THREAD_NAME.to_string())
        .spawn(move || {
            runtime.block_on(pump(stream, relay_tx, cancel_rx, pump_shared, capacity));
            let _ = done_tx.send(());
        })
        .map_err(DownloadError::stream)?;
    debug!(relay_capacity = capacity, "download stream bridge started");

    Ok(BlockingBodyReader {
        relay: Some(relay_rx),
        current: Bytes::new(),
        shared,
        cancel: Some(cancel_tx),
        done: done_rx,
        worker: Some(worker),
        state,
        close_timeout: settings.close_timeout,
        closed: false,
        _executor: executor,
    })
}

async fn pump(
    mut stream: ChunkStream,
    relay: Sender<Bytes>,
    mut cancel: oneshot::Receiver<()>,
    shared: Arc<Shared>,
    capacity: usize,
) {
    'pump: loop {
        if shared.is_terminated() {
            break;
        }
        let next = tokio::select! {
            biased;
            _ = &mut cancel => break,
            next = stream.next() => next,
        };
        match next {
            Some(Ok(mut chunk)) => {
                while !chunk.is_empty() {
                    if shared.is_terminated() {
                        break 'pump;
                    }
                    let segment = chunk.split_to(capacity.min(chunk.len()));
                    if relay.send(segment).is_err() {
                        break 'pump;
                    }
                }
            }
            Some(Err(e)) => {
                warn!(error = %e, "download stream failed");
                shared.record(&e);
                break;
            }
            None => {
                debug!("download stream exhausted");
                break;
            }
        }
    }
    drop(stream);
    drop(relay);
}

impl BlockingBodyReader {
    /// Stops the transfer and releases the upstream.
    ///
    /// Drops the relay, signals the pump to cancel the upstream, and waits for
    /// it to acknowledge for at most the configured close timeout. If the pump
    /// does not answer in time it is detached (it is already marked to stop)
    /// and a warning is logged. Never fails; calling it again is a no-op.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.relay = None;
        self.current = Bytes::new();
        self.shared.terminate.store(true, Ordering::Release);
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }

        match self.done.recv_timeout(self.close_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(worker) = self.worker.take()
                    && worker.join().is_err()
                {
                    warn!("download stream bridge worker panicked");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    timeout_ms = u64::try_from(self.close_timeout.as_millis()).unwrap_or(u64::MAX),
                    "download stream bridge did not stop in time; detaching worker"
                );
                self.worker = None;
            }
        }
        self.state.close();
    }

    /// Whether [`close`](Self::close) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check_error(&self) -> io::Result<()> {
        match self.shared.error() {
            Some(error) => {
                self.state.finish(DownloadState::Failed);
                Err(error)
            }
            None => Ok(()),
        }
    }
}

impl Read for BlockingBodyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Err(DownloadError::Closed.into());
        }
        if buf.is_empty() {
            return Ok(0);
        }
        self.check_error()?;

        if self.current.is_empty() {
            let Some(relay) = &self.relay else {
                return Ok(0);
            };
            match relay.recv() {
                Ok(segment) => self.current = segment,
                Err(_) => {
                    self.check_error()?;
                    self.relay = None;
                    self.state.finish(DownloadState::Completed);
                    return Ok(0);
                }
            }
        }

        let n = buf.len().min(self.current.len());
        buf[..n].copy_from_slice(&self.current[..n]);
        self.current.advance(n);
        Ok(n)
    }
}

impl Drop for BlockingBodyReader {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for BlockingBodyReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingBodyReader")
            .field("buffered", &self.current.len())
            .field("closed", &self.closed)
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}
