use std::path::PathBuf;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::config::SourceConfig;
use crate::error::{OpenError, SourceError};
use crate::instance::{SourceInstance, QUEUE_CAPACITY};
use crate::record::Record;

/// Starts tailing the newline-delimited JSON file at `path`.
///
/// The open itself is synchronous with respect to the caller: a missing or
/// unreadable file fails here and no background task is started. On
/// success one task scans the file line by line, pushing every non-empty
/// line as a record; reaching end of file is the natural termination path.
pub(crate) async fn start(
    path: &str,
    config: &SourceConfig,
) -> Result<SourceInstance, OpenError> {
    let file = File::open(path).await.map_err(|source| OpenError::File {
        path: PathBuf::from(path),
        source,
    })?;

    let (event_tx, event_rx) = mpsc::channel(QUEUE_CAPACITY);
    let (error_tx, error_rx) = mpsc::channel::<SourceError>(QUEUE_CAPACITY);
    let (_bound_tx, bound_rx) = watch::channel(None);
    let cancel = CancellationToken::new();

    let task = tokio::spawn(scan(file, path.to_string(), event_tx, error_tx, cancel.clone()));

    Ok(SourceInstance::new(
        event_rx,
        error_rx,
        bound_rx,
        cancel,
        config.timeout,
        task,
    ))
}

async fn scan(
    file: File,
    path: String,
    event_tx: mpsc::Sender<Record>,
    error_tx: mpsc::Sender<SourceError>,
    cancel: CancellationToken,
) {
    // Lines are raw bytes, not text: records are opaque here and the file
    // may carry any encoding, exactly like the webhook body path.
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = tokio::select! {
            _ = cancel.cancelled() => break,
            read = reader.read_until(b'\n', &mut buf) => read,
        };

        match read {
            Ok(0) => {
                tracing::debug!(path = %path, "audit file fully scanned");
                break;
            }
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
                if buf.is_empty() {
                    continue;
                }
                // Blocking push: suspends until the consumer takes the
                // record. Cancellation or a dropped consumer unblocks it.
                let record = Record::from(std::mem::take(&mut buf));
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    sent = event_tx.send(record) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
            Err(err) => {
                // Propagate the error observed at scan time, then shut the
                // queues so the consumer sees a terminal failure.
                tracing::warn!(path = %path, error = %err, "audit file scan failed");
                let _ = error_tx.send(SourceError::Scan(err)).await;
                break;
            }
        }
    }
    // Senders drop here, closing both queues and releasing the file.
}
