use std::io::Write;
use std::time::Duration;

use audit_source::{AuditSource, OpenError, ReadOutcome, SourceConfig, SourceError};
use tempfile::NamedTempFile;

fn source() -> AuditSource {
    AuditSource::new(SourceConfig::default().timeout(Duration::from_secs(1)))
}

fn file_address(file: &NamedTempFile) -> String {
    format!("file://{}", file.path().display())
}

#[tokio::test]
async fn every_non_empty_line_becomes_one_record_in_order() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{{\"a\":1}}\n\n{{\"b\":2}}\n").unwrap();
    file.flush().unwrap();

    let mut instance = source().open(&file_address(&file)).await.unwrap();

    match instance.next_record().await.unwrap() {
        ReadOutcome::Record(record) => assert_eq!(record.render(), r#"{"a":1}"#),
        other => panic!("expected first record, got {other:?}"),
    }
    match instance.next_record().await.unwrap() {
        ReadOutcome::Record(record) => assert_eq!(record.render(), r#"{"b":2}"#),
        other => panic!("expected second record, got {other:?}"),
    }
    // The empty line is skipped, never surfaced; end of file closes the
    // instance.
    assert!(matches!(
        instance.next_record().await.unwrap(),
        ReadOutcome::Closed
    ));
}

#[tokio::test]
async fn missing_file_fails_synchronously() {
    let err = source()
        .open("file:///definitely/not/a/real/file.jsonl")
        .await
        .unwrap_err();
    assert!(matches!(err, OpenError::File { .. }));
}

#[tokio::test]
async fn scan_error_reaches_consumer() {
    // A directory opens fine but fails on the first read, which makes it a
    // genuine mid-stream failure. The error pushed on the error queue must
    // be the one observed at scan time, not a stale value captured when the
    // file was opened.
    let dir = tempfile::tempdir().unwrap();
    let address = format!("file://{}", dir.path().display());

    let mut instance = source().open(&address).await.unwrap();

    match instance.next_record().await {
        Err(SourceError::Scan(err)) => {
            assert!(err.raw_os_error().is_some(), "expected an OS read error");
        }
        other => panic!("expected a scan error, got {other:?}"),
    }

    // Once the terminal error has been observed the instance only reports
    // closure, never another record.
    assert!(matches!(
        instance.next_record().await.unwrap(),
        ReadOutcome::Closed
    ));
}

#[tokio::test]
async fn lines_are_opaque_bytes_not_text() {
    // File content is not required to be UTF-8: a non-UTF-8 line is still
    // one record, byte for byte, just like an arbitrary webhook body.
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"{\"a\":1}\n\xff\xfe\xfd\n{\"b\":2}\n").unwrap();
    file.flush().unwrap();

    let mut instance = source().open(&file_address(&file)).await.unwrap();

    match instance.next_record().await.unwrap() {
        ReadOutcome::Record(record) => assert_eq!(record.render(), r#"{"a":1}"#),
        other => panic!("expected the leading record, got {other:?}"),
    }
    match instance.next_record().await.unwrap() {
        ReadOutcome::Record(record) => assert_eq!(record.as_bytes(), b"\xff\xfe\xfd"),
        other => panic!("expected the raw-bytes record, got {other:?}"),
    }
    match instance.next_record().await.unwrap() {
        ReadOutcome::Record(record) => assert_eq!(record.render(), r#"{"b":2}"#),
        other => panic!("expected the trailing record, got {other:?}"),
    }
    assert!(matches!(
        instance.next_record().await.unwrap(),
        ReadOutcome::Closed
    ));
}

#[tokio::test]
async fn close_stops_the_tail_without_losing_queued_records() {
    let mut file = NamedTempFile::new().unwrap();
    for n in 0..100 {
        writeln!(file, "{{\"n\":{n}}}").unwrap();
    }
    file.flush().unwrap();

    let mut instance = source().open(&file_address(&file)).await.unwrap();

    match instance.next_record().await.unwrap() {
        ReadOutcome::Record(record) => assert_eq!(record.render(), r#"{"n":0}"#),
        other => panic!("expected a record, got {other:?}"),
    }

    instance.close();
    instance.close(); // double close is a no-op

    // Records the producer had already pushed are still drained, in order,
    // before closure is reported.
    let mut next_expected = 1;
    loop {
        match instance.next_record().await.unwrap() {
            ReadOutcome::Record(record) => {
                assert_eq!(record.render(), format!("{{\"n\":{next_expected}}}"));
                next_expected += 1;
            }
            ReadOutcome::Closed => break,
            other => panic!("unexpected outcome after close: {other:?}"),
        }
    }
    assert!(next_expected < 100, "cancellation should stop the tail early");
}

#[tokio::test]
async fn shutdown_joins_the_producer() {
    let mut file = NamedTempFile::new().unwrap();
    for n in 0..1000 {
        writeln!(file, "{{\"n\":{n}}}").unwrap();
    }
    file.flush().unwrap();

    let instance = source().open(&file_address(&file)).await.unwrap();
    instance.shutdown().await;
}
