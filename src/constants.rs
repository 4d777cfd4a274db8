//! Constants shared by the transport, classifier and download bridge.

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default per-deployment read timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Upper bound accepted for a configured read timeout (1 hour).
pub const MAX_TIMEOUT_MS: u64 = 3_600_000;

/// Default cap on bodies buffered in memory while classifying a response (256 KiB).
pub const DEFAULT_MAX_IN_MEMORY_SIZE: usize = 256 * 1024;

/// Default size of one relay segment between the stream pump and blocking readers.
pub const DEFAULT_RELAY_CAPACITY: usize = 8192;

/// Smallest relay segment accepted by configuration validation.
pub const MIN_RELAY_CAPACITY: usize = 1024;

/// Default bound on how long `close()` waits for the stream pump to acknowledge.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Deployment key used when the caller passes a blank key.
pub const DEFAULT_DEPLOY_KEY: &str = "global";

/// Content type assumed when a response carries no `Content-Type` header.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Worker thread count of the runtime owned by the blocking clients.
pub const BLOCKING_RUNTIME_WORKERS: usize = 2;
