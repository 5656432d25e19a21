use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::error::SourceError;
use crate::record::Record;

/// Queue capacity for both the record and the error queue. One slot is the
/// closest bounded rendering of an unbuffered channel: a push suspends the
/// producer until the consumer takes the previous item, which is the sole
/// backpressure mechanism.
pub(crate) const QUEUE_CAPACITY: usize = 1;

/// Non-error outcomes of [`SourceInstance::next_record`].
#[derive(Debug)]
pub enum ReadOutcome {
    /// One record, in producer order.
    Record(Record),
    /// No record arrived within the configured timeout; the instance is
    /// still live and may be polled again.
    Timeout,
    /// The instance is exhausted: the producer terminated (end of file,
    /// cancellation, or a terminal error that was already reported).
    Closed,
}

/// The live binding between one resolved address and its running producer.
///
/// Owns the record queue, the error queue, the cancellation token, and the
/// producer's background task. Exactly one producer feeds an instance; the
/// instance is transport-agnostic.
#[derive(Debug)]
pub struct SourceInstance {
    events: mpsc::Receiver<Record>,
    errors: mpsc::Receiver<SourceError>,
    bound: watch::Receiver<Option<SocketAddr>>,
    cancel: CancellationToken,
    timeout: Duration,
    task: Option<JoinHandle<()>>,
    failed: bool,
}

impl SourceInstance {
    pub(crate) fn new(
        events: mpsc::Receiver<Record>,
        errors: mpsc::Receiver<SourceError>,
        bound: watch::Receiver<Option<SocketAddr>>,
        cancel: CancellationToken,
        timeout: Duration,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            events,
            errors,
            bound,
            cancel,
            timeout,
            task: Some(task),
            failed: false,
        }
    }

    /// Waits for the next record.
    ///
    /// Resolves when a record arrives, the producer reports a terminal
    /// error, the configured timeout elapses, or the instance is closed.
    /// Records queued before cancellation are still drained, so closing
    /// never loses data already accepted from the transport. After a
    /// terminal error has been returned once, every subsequent call
    /// reports [`ReadOutcome::Closed`].
    pub async fn next_record(&mut self) -> Result<ReadOutcome, SourceError> {
        if self.failed {
            return Ok(ReadOutcome::Closed);
        }

        // Drain what the producer already handed over, even if the
        // cancellation token has fired in the meantime.
        match self.events.try_recv() {
            Ok(record) => return Ok(ReadOutcome::Record(record)),
            Err(TryRecvError::Disconnected) => return self.terminal_outcome(),
            Err(TryRecvError::Empty) => {}
        }

        tokio::select! {
            biased;
            maybe = self.events.recv() => match maybe {
                Some(record) => Ok(ReadOutcome::Record(record)),
                None => self.terminal_outcome(),
            },
            _ = self.cancel.cancelled() => Ok(ReadOutcome::Closed),
            _ = time::sleep(self.timeout) => Ok(ReadOutcome::Timeout),
        }
    }

    /// Actual bound socket address of a webhook instance, once its
    /// listener is up. Resolves to `None` for file instances and for
    /// webhook instances whose producer failed before binding.
    pub async fn bound_addr(&mut self) -> Option<SocketAddr> {
        let value = self.bound.wait_for(|addr| addr.is_some()).await.ok()?;
        *value
    }

    /// Signals the producer to stop. Idempotent: closing an already-closed
    /// instance is a no-op.
    pub fn close(&mut self) {
        self.cancel.cancel();
    }

    /// Closes the instance and waits for the producer task to finish, so
    /// the file handle or listening socket is released before returning.
    pub async fn shutdown(mut self) {
        self.close();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "producer task did not shut down cleanly");
            }
        }
    }

    fn terminal_outcome(&mut self) -> Result<ReadOutcome, SourceError> {
        // The producer pushes its terminal error, if any, before closing
        // the queues, so by the time the record queue reads as
        // disconnected the error is already waiting.
        match self.errors.try_recv() {
            Ok(err) => {
                self.failed = true;
                Err(err)
            }
            Err(_) => Ok(ReadOutcome::Closed),
        }
    }
}

impl Drop for SourceInstance {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn harness(
        timeout: Duration,
    ) -> (
        mpsc::Sender<Record>,
        mpsc::Sender<SourceError>,
        SourceInstance,
    ) {
        let (event_tx, event_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (error_tx, error_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (_bound_tx, bound_rx) = watch::channel(None);
        let task = tokio::spawn(async {});
        let instance = SourceInstance::new(
            event_rx,
            error_rx,
            bound_rx,
            CancellationToken::new(),
            timeout,
            task,
        );
        (event_tx, error_tx, instance)
    }

    #[tokio::test]
    async fn records_arrive_in_order() {
        let (event_tx, _error_tx, mut instance) = harness(Duration::from_secs(1));
        event_tx.send(Record::from(String::from("one"))).await.unwrap();

        match instance.next_record().await.unwrap() {
            ReadOutcome::Record(record) => assert_eq!(record.render(), "one"),
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn idle_queue_times_out() {
        let (_event_tx, _error_tx, mut instance) = harness(Duration::from_millis(10));
        assert!(matches!(
            instance.next_record().await.unwrap(),
            ReadOutcome::Timeout
        ));
    }

    #[tokio::test]
    async fn no_record_after_terminal_error() {
        let (event_tx, error_tx, mut instance) = harness(Duration::from_secs(1));
        error_tx
            .send(SourceError::Scan(std::io::Error::other("boom")))
            .await
            .unwrap();
        drop(error_tx);
        drop(event_tx);

        assert!(instance.next_record().await.is_err());
        // Even if a record were somehow still pending, the instance stays
        // closed from here on.
        assert!(matches!(
            instance.next_record().await.unwrap(),
            ReadOutcome::Closed
        ));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_drains_queued_records() {
        let (event_tx, _error_tx, mut instance) = harness(Duration::from_secs(1));
        event_tx
            .send(Record::from(String::from("queued")))
            .await
            .unwrap();

        instance.close();
        instance.close();

        match instance.next_record().await.unwrap() {
            ReadOutcome::Record(record) => assert_eq!(record.render(), "queued"),
            other => panic!("expected queued record, got {other:?}"),
        }
        assert!(matches!(
            instance.next_record().await.unwrap(),
            ReadOutcome::Closed
        ));
    }

    #[tokio::test]
    async fn file_instances_report_no_bound_addr() {
        let (_event_tx, _error_tx, mut instance) = harness(Duration::from_secs(1));
        assert!(instance.bound_addr().await.is_none());
    }
}
