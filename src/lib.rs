//! RAGFlow Client Library
//!
//! Typed client for the dataset and document HTTP API of a RAGFlow
//! deployment, with document downloads streamed to blocking readers.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Per-deployment server settings loaded from TOML
//! - [`transport`] - reqwest client cache and request plumbing
//! - [`client`] - Async dataset and document clients
//! - [`blocking`] - Blocking facade owning a dedicated runtime
//! - [`download`] - Response classification and one-shot download handles
//! - [`model`] - Request payloads and service records
//! - [`query`] - Pagination and filter query strings
//! - [`api`] - Routes, business error codes and chunk methods

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod blocking;
pub mod client;
pub mod config;
pub mod constants;
pub mod download;
pub mod error;
pub mod model;
pub mod query;
pub mod transport;
mod user_agent;

// Re-export commonly used types
pub use api::{ApiRoute, ChunkMethod, ErrorCode, Permission};
pub use client::ClientContext;
pub use config::{ClientProperties, ConfigError, ServerConfig};
pub use download::{
    BlockingBodyReader, DownloadError, DownloadHandle, DownloadMetadata, DownloadState, Executor,
};
pub use error::ClientError;
pub use query::{DocumentQuery, PageQuery};
pub use transport::{ChunkStream, DownloadTransport, TransportResponse};
