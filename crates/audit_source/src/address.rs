use std::sync::OnceLock;

use regex::Regex;

use crate::error::OpenError;

const FILE_PREFIX: &str = "file://";
const HTTP_PREFIX: &str = "http://";
const HTTPS_PREFIX: &str = "https://";

/// Shape of a webhook address remainder: an optional `localhost` literal, a
/// mandatory `:<port>`, and a mandatory single-segment absolute path made of
/// ASCII letters, digits, underscore, dot, and hyphen only.
const WEBHOOK_PATTERN: &str = r"^(localhost)?(:[0-9]+)(/[0-9A-Za-z_.-]+)$";

fn webhook_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(WEBHOOK_PATTERN).expect("webhook pattern is valid"))
}

/// A validated open-parameter string, classified by transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// Tail a newline-delimited JSON file on the local filesystem.
    LocalFile { path: String },
    /// Run an embedded webhook server.
    ///
    /// `port_spec` keeps its leading colon, `path` its leading slash. A
    /// `localhost` literal in the input is discarded: the server binds to
    /// the port on all interfaces, never to a specific host.
    Webhook {
        port_spec: String,
        path: String,
        use_tls: bool,
    },
}

/// Classifies `raw_params` into an [`Address`] without touching the
/// filesystem or the network.
///
/// `file://` strips the prefix and accepts the remainder as-is; a bad path
/// is reported later, when the file producer tries to open it. `http://`
/// and `https://` validate the remainder against the webhook pattern and
/// fail on any mismatch, with no defaulting of missing pieces.
pub fn resolve(raw_params: &str) -> Result<Address, OpenError> {
    if let Some(path) = raw_params.strip_prefix(FILE_PREFIX) {
        return Ok(Address::LocalFile {
            path: path.to_string(),
        });
    }

    let (remainder, use_tls) = if let Some(rest) = raw_params.strip_prefix(HTTP_PREFIX) {
        (rest, false)
    } else if let Some(rest) = raw_params.strip_prefix(HTTPS_PREFIX) {
        (rest, true)
    } else {
        return Err(OpenError::UnsupportedScheme {
            params: raw_params.to_string(),
        });
    };

    let Some(captures) = webhook_regex().captures(remainder) else {
        return Err(OpenError::MalformedWebhookAddress {
            params: remainder.to_string(),
            pattern: WEBHOOK_PATTERN,
        });
    };

    Ok(Address::Webhook {
        port_spec: captures[2].to_string(),
        path: captures[3].to_string(),
        use_tls,
    })
}
