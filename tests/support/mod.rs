//! Shared helpers for socket-bound integration tests.

use std::net::TcpListener;
use std::panic::Location;

use ragflow_client::config::{ClientProperties, ServerConfig};
use wiremock::MockServer;

pub const API_KEY: &str = "ragflow-test-key";

/// Whether `RAGFLOW_CLIENT_REQUIRE_SOCKET_TESTS` turns a skip into a failure.
#[must_use]
pub fn socket_tests_required() -> bool {
    std::env::var("RAGFLOW_CLIENT_REQUIRE_SOCKET_TESTS")
        .ok()
        .is_some_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

/// True when no localhost listener can be bound here; panics instead when
/// socket tests are required.
#[track_caller]
#[must_use]
pub fn should_skip_socket_bound_test() -> bool {
    if TcpListener::bind("127.0.0.1:0").is_ok() {
        return false;
    }

    let location = Location::caller();
    let message = format!(
        "[socket-bound-test] cannot bind localhost socket at {}:{}; wiremock-based test cannot run in this environment",
        location.file(),
        location.line()
    );
    if socket_tests_required() {
        panic!(
            "{message}. Set RAGFLOW_CLIENT_REQUIRE_SOCKET_TESTS=0 to allow local skip behavior."
        );
    }

    eprintln!(
        "{message}. Skipping test. Set RAGFLOW_CLIENT_REQUIRE_SOCKET_TESTS=1 to fail-fast instead."
    );
    true
}

/// Starts a wiremock server, or `None` when the caller should return early.
pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if should_skip_socket_bound_test() {
        None
    } else {
        Some(MockServer::start().await)
    }
}

/// Properties with one `global` deployment pointing at `address`.
#[must_use]
pub fn properties_for(address: &str) -> ClientProperties {
    ClientProperties::new().with_server("global", ServerConfig::new(address, API_KEY))
}

/// Installs a test subscriber honoring `RUST_LOG`; later calls are no-ops.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
