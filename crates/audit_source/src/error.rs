use std::path::PathBuf;

use thiserror::Error;

/// Failure of the `open` call itself. No background task has been started
/// when one of these is returned.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error(
        "invalid open parameters (supported prefixes are 'file://', 'http://', and 'https://'): {params}"
    )]
    UnsupportedScheme { params: String },
    #[error("webserver parameter does not match the pattern '{pattern}': {params}")]
    MalformedWebhookAddress {
        params: String,
        pattern: &'static str,
    },
    #[error("failed to open audit file {path:?}: {source}")]
    File {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Terminal failure of a running producer, delivered through the error
/// queue. At most one of these flows out of an instance; once observed, no
/// further records are guaranteed to arrive.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed reading audit file mid-stream: {0}")]
    Scan(std::io::Error),
    #[error("invalid webhook port specifier {port_spec:?}")]
    InvalidPort { port_spec: String },
    #[error("failed to bind webhook listener on {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },
    #[error("webhook server failed: {0}")]
    Serve(std::io::Error),
    #[error("failed to load TLS certificate bundle {path:?}: {source}")]
    TlsConfig {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("https address requires a TLS certificate bundle, none configured")]
    MissingCertBundle,
}
