//! One-shot download handles.

use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use futures_util::StreamExt;
use tracing::{debug, info, warn};

use super::bridge::{self, BlockingBodyReader, BridgeSettings};
use super::error::DownloadError;
use super::executor::Executor;
use super::metadata::DownloadMetadata;
use super::state::{ConsumptionState, DownloadState};
use crate::transport::ChunkStream;

/// Result of a document download request.
///
/// A handle is either a refused download ([`FailedDownload`], `code != 0`) or
/// a binary payload ([`StreamingDownload`], `code == 0`). Both expose the same
/// operations. A streaming body can be consumed exactly once, through either
/// [`acquire_blocking_input`](Self::acquire_blocking_input) or
/// [`write_to`](Self::write_to).
///
/// # Panics
///
/// The consuming methods and [`close`](Self::close) drive the runtime with
/// `block_on` and panic if called from inside an async execution context.
/// From async code, move the handle into `tokio::task::spawn_blocking`.
///
/// # Example
///
/// ```no_run
/// use ragflow_client::blocking::DocumentClient;
/// use ragflow_client::config::ClientProperties;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = DocumentClient::new(ClientProperties::load_default()?.unwrap_or_default())?;
/// let handle = client.download_document("global", "ds1", "doc1", Some("report.pdf"))?;
/// if handle.is_ok() {
///     let mut file = std::fs::File::create(handle.metadata().filename().unwrap_or("download"))?;
///     handle.write_to(&mut file)?;
/// } else {
///     eprintln!("refused: {}", handle.metadata().message());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub enum DownloadHandle {
    /// The service refused the download.
    Failed(FailedDownload),
    /// The service returned a binary payload.
    Streaming(StreamingDownload),
}

impl DownloadHandle {
    pub(crate) fn failed(metadata: DownloadMetadata) -> Self {
        Self::Failed(FailedDownload {
            metadata,
            closed: AtomicBool::new(false),
        })
    }

    pub(crate) fn streaming(
        metadata: DownloadMetadata,
        body: ChunkStream,
        executor: Executor,
        settings: BridgeSettings,
    ) -> Self {
        Self::Streaming(StreamingDownload {
            metadata,
            body: Mutex::new(Some(body)),
            state: ConsumptionState::new(DownloadState::Unconsumed),
            executor,
            settings,
        })
    }

    /// Classification result; may be read any number of times.
    #[must_use]
    pub fn metadata(&self) -> &DownloadMetadata {
        match self {
            Self::Failed(failed) => &failed.metadata,
            Self::Streaming(streaming) => &streaming.metadata,
        }
    }

    /// True for a binary payload.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.metadata().is_ok()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> DownloadState {
        match self {
            Self::Failed(failed) => failed.state(),
            Self::Streaming(streaming) => streaming.state.get(),
        }
    }

    /// Hands out a blocking reader over the body.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::Failed`] for a refused download (every call)
    /// - [`DownloadError::AlreadyConsumed`] if the body was already handed out
    /// - [`DownloadError::Closed`] after [`close`](Self::close)
    pub fn acquire_blocking_input(&self) -> Result<BlockingBodyReader, DownloadError> {
        match self {
            Self::Failed(failed) => Err(failed.error()),
            Self::Streaming(streaming) => streaming.acquire_blocking_input(),
        }
    }

    /// Writes the whole body to `sink` and returns the number of bytes written.
    ///
    /// Blocks until the body is exhausted or fails. The sink is neither
    /// flushed nor closed.
    ///
    /// # Errors
    ///
    /// The errors of [`acquire_blocking_input`](Self::acquire_blocking_input),
    /// plus [`DownloadError::Stream`] when the upstream fails and
    /// [`DownloadError::Sink`] when writing fails. Bytes written before the
    /// failure stay in the sink.
    pub fn write_to<W: Write + ?Sized>(&self, sink: &mut W) -> Result<u64, DownloadError> {
        match self {
            Self::Failed(failed) => Err(failed.error()),
            Self::Streaming(streaming) => streaming.write_to(sink),
        }
    }

    /// Collects the body into memory.
    ///
    /// # Errors
    ///
    /// Same as [`write_to`](Self::write_to).
    pub fn read_all_bytes(&self) -> Result<Vec<u8>, DownloadError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(buffer)
    }

    /// Releases the body if it was never consumed.
    ///
    /// An unconsumed body is drained and discarded for at most the close
    /// timeout, then dropped. Once consumption has started this is a no-op;
    /// close the reader instead. Idempotent and infallible.
    pub fn close(&self) {
        match self {
            Self::Failed(failed) => failed.closed.store(true, Ordering::Release),
            Self::Streaming(streaming) => streaming.close(),
        }
    }
}

/// A refused download. Never holds a body.
#[derive(Debug)]
pub struct FailedDownload {
    metadata: DownloadMetadata,
    closed: AtomicBool,
}

impl FailedDownload {
    fn error(&self) -> DownloadError {
        DownloadError::failed(self.metadata.code(), self.metadata.message())
    }

    fn state(&self) -> DownloadState {
        if self.closed.load(Ordering::Acquire) {
            DownloadState::Closed
        } else {
            DownloadState::Failed
        }
    }
}

/// A binary payload awaiting consumption.
///
/// Dropping it without consuming drops the body, which cancels the request.
pub struct StreamingDownload {
    metadata: DownloadMetadata,
    body: Mutex<Option<ChunkStream>>,
    state: ConsumptionState,
    executor: Executor,
    settings: BridgeSettings,
}

impl StreamingDownload {
    fn take_body(&self) -> Result<ChunkStream, DownloadError> {
        self.state.begin().map_err(|current| match current {
            DownloadState::Closed => DownloadError::Closed,
            _ => DownloadError::AlreadyConsumed,
        })?;
        self.body
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(DownloadError::AlreadyConsumed)
    }

    fn acquire_blocking_input(&self) -> Result<BlockingBodyReader, DownloadError> {
        let body = self.take_body()?;
        bridge::start(body, self.executor.clone(), self.settings, self.state.clone()).inspect_err(
            |e| {
                warn!(error = %e, "failed to start download stream bridge");
                self.state.finish(DownloadState::Failed);
            },
        )
    }

    fn write_to<W: Write + ?Sized>(&self, sink: &mut W) -> Result<u64, DownloadError> {
        let mut body = self.take_body()?;
        let result = self.executor.block_on(async move {
            let mut written: u64 = 0;
            while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(DownloadError::stream)?;
                sink.write_all(&chunk).map_err(DownloadError::sink)?;
                written += chunk.len() as u64;
            }
            Ok(written)
        });

        match &result {
            Ok(written) => {
                self.state.finish(DownloadState::Completed);
                info!(
                    filename = self.metadata.filename().unwrap_or_default(),
                    bytes = written,
                    "download written"
                );
            }
            Err(e) => {
                self.state.finish(DownloadState::Failed);
                warn!(error = %e, "download write failed");
            }
        }
        result
    }

    fn close(&self) {
        if self
            .state
            .transition(DownloadState::Unconsumed, DownloadState::Closed)
            .is_err()
        {
            return;
        }
        let body = self
            .body
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(body) = body {
            self.discard(body);
        }
    }

    fn discard(&self, mut body: ChunkStream) {
        if Executor::in_async_context() {
            debug!("dropping unconsumed download body without draining");
            drop(body);
            return;
        }
        let timeout = self.settings.close_timeout;
        let drained = self.executor.block_on(async move {
            tokio::time::timeout(timeout, async move {
                let mut discarded: u64 = 0;
                while let Some(Ok(chunk)) = body.next().await {
                    discarded += chunk.len() as u64;
                    // Let the deadline fire on bodies that are always ready.
                    tokio::task::yield_now().await;
                }
                discarded
            })
            .await
        });
        match drained {
            Ok(discarded) => debug!(discarded_bytes = discarded, "unconsumed download drained"),
            Err(_) => warn!("draining unconsumed download timed out; dropping body"),
        }
    }
}

impl fmt::Debug for StreamingDownload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingDownload")
            .field("metadata", &self.metadata)
            .field("state", &self.state.get())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
