//! User-Agent string sent with every request to the service.

/// Default User-Agent for API and download requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    format!(
        "{}/{} (reqwest; rust)",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}
