//! Document downloads.
//!
//! A download request is classified once into a [`DownloadHandle`]: either a
//! refusal carrying the service's error code and message, or a binary payload
//! whose body is still on the wire. The body is consumed exactly once, from
//! blocking code, through a [`BlockingBodyReader`] or
//! [`DownloadHandle::write_to`].
//!
//! # Example
//!
//! ```no_run
//! use std::io::Read;
//! use ragflow_client::blocking::DocumentClient;
//! use ragflow_client::config::ClientProperties;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = DocumentClient::new(ClientProperties::from_path("ragflow.toml".as_ref())?)?;
//! let handle = client.download_document("global", "ds1", "doc1", None)?;
//! let mut reader = handle.acquire_blocking_input()?;
//! let mut head = [0_u8; 4];
//! reader.read_exact(&mut head)?;
//! reader.close();
//! # Ok(())
//! # }
//! ```

mod bridge;
mod classifier;
mod error;
mod executor;
mod handle;
mod metadata;
mod state;

pub use bridge::BlockingBodyReader;
pub use error::DownloadError;
pub use executor::Executor;
pub use handle::{DownloadHandle, FailedDownload, StreamingDownload};
pub use metadata::DownloadMetadata;
pub use state::DownloadState;

pub(crate) use bridge::BridgeSettings;
pub(crate) use classifier::{Classification, ResponseClassifier};

#[cfg(test)]
pub(crate) mod test_support {
    //! Instrumented chunk streams for exercising the download pipeline.

    use std::io;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::{Context, Poll};
    use std::thread;
    use std::time::Duration;

    use bytes::Bytes;
    use futures_util::{Stream, StreamExt, stream};

    use super::Executor;
    use crate::transport::ChunkStream;

    /// Counts chunks pulled from, and live instances of, a test stream.
    #[derive(Debug, Default)]
    pub(crate) struct Probe {
        polled: AtomicUsize,
        created: AtomicUsize,
        dropped: AtomicUsize,
    }

    impl Probe {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub(crate) fn polled(&self) -> usize {
            self.polled.load(Ordering::SeqCst)
        }

        pub(crate) fn dropped(&self) -> bool {
            self.dropped.load(Ordering::SeqCst) > 0
        }

        /// Streams created but not yet dropped.
        pub(crate) fn live(&self) -> usize {
            self.created.load(Ordering::SeqCst) - self.dropped.load(Ordering::SeqCst)
        }
    }

    struct Tracked<S> {
        inner: S,
        probe: Arc<Probe>,
    }

    impl<S> Stream for Tracked<S>
    where
        S: Stream<Item = io::Result<Bytes>> + Unpin,
    {
        type Item = io::Result<Bytes>;

        fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            let polled = self.inner.poll_next_unpin(cx);
            if let Poll::Ready(Some(_)) = &polled {
                self.probe.polled.fetch_add(1, Ordering::SeqCst);
            }
            polled
        }
    }

    impl<S> Drop for Tracked<S> {
        fn drop(&mut self) {
            self.probe.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn track<S>(inner: S, probe: &Arc<Probe>) -> ChunkStream
    where
        S: Stream<Item = io::Result<Bytes>> + Send + Unpin + 'static,
    {
        probe.created.fetch_add(1, Ordering::SeqCst);
        Box::pin(Tracked {
            inner,
            probe: Arc::clone(probe),
        })
    }

    /// Yields `data` split at `sizes`; any remainder becomes a final chunk.
    pub(crate) fn chunked(data: &[u8], sizes: &[usize], probe: &Arc<Probe>) -> ChunkStream {
        let mut rest = Bytes::copy_from_slice(data);
        let mut chunks: Vec<io::Result<Bytes>> = Vec::new();
        for &size in sizes {
            if rest.is_empty() {
                break;
            }
            chunks.push(Ok(rest.split_to(size.min(rest.len()))));
        }
        if !rest.is_empty() {
            chunks.push(Ok(rest));
        }
        track(stream::iter(chunks), probe)
    }

    /// Yields `prefix`, then fails with a connection reset.
    pub(crate) fn failing_after(prefix: &[u8], message: &str, probe: &Arc<Probe>) -> ChunkStream {
        let items = vec![
            Ok(Bytes::copy_from_slice(prefix)),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, message.to_string())),
        ];
        track(stream::iter(items), probe)
    }

    /// Never ends.
    pub(crate) fn infinite(probe: &Arc<Probe>) -> ChunkStream {
        track(
            stream::repeat_with(|| Ok::<_, io::Error>(Bytes::from_static(&[0xAB; 1024]))),
            probe,
        )
    }

    /// Blocks the polling thread for `delay` before every chunk.
    pub(crate) fn stalled(delay: Duration, probe: &Arc<Probe>) -> ChunkStream {
        track(
            stream::poll_fn(move |_| {
                thread::sleep(delay);
                Poll::Ready(Some(Ok::<_, io::Error>(Bytes::from_static(b"late"))))
            }),
            probe,
        )
    }

    pub(crate) fn test_executor() -> Executor {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap_or_else(|e| panic!("test runtime: {e}"));
        Executor::owned(Arc::new(runtime))
    }
}
