use std::path::PathBuf;
use std::time::Duration;

/// Immutable configuration handed to [`AuditSource`](crate::AuditSource).
///
/// Passed by value into each producer at open time; nothing here is global
/// or mutable after the fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Upper bound on how long a single `next_record` call waits before
    /// reporting a timeout.
    pub timeout: Duration,
    /// Hard cap on one webhook request body. Oversized bodies are rejected
    /// mid-read and never surface as records.
    pub max_event_bytes: usize,
    /// Combined PEM bundle holding both the certificate and the private
    /// key, used for both roles when an `https://` address is opened.
    pub ssl_cert_bundle: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(30),
            max_event_bytes: 1024 * 1024,
            ssl_cert_bundle: None,
        }
    }
}

impl SourceConfig {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_event_bytes(mut self, max_event_bytes: usize) -> Self {
        self.max_event_bytes = max_event_bytes;
        self
    }

    pub fn ssl_cert_bundle(mut self, bundle: impl Into<PathBuf>) -> Self {
        self.ssl_cert_bundle = Some(bundle.into());
        self
    }
}
