#![forbid(unsafe_code)]
//! Opens one audit event source address and prints every record it yields.
//!
//! Useful for poking at a webhook endpoint or replaying a JSONL file:
//!
//! ```text
//! audit_tail file:///var/log/k8s-audit.jsonl
//! audit_tail http://:8080/k8s-audit --timeout-ms 1000
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use audit_source::{AuditSource, ReadOutcome, SourceConfig};
use clap::Parser;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "audit_tail")]
#[command(about = "Tail an audit event source (file://, http://, or https://)")]
struct Cli {
    /// Source address: file://<path>, http://[localhost]:<port>/<path>, or
    /// https://[localhost]:<port>/<path>.
    address: String,

    /// How long one poll for the next record waits before retrying.
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Maximum accepted webhook payload size in bytes.
    #[arg(long, default_value_t = 1024 * 1024)]
    max_event_bytes: usize,

    /// Combined PEM certificate+key bundle, required for https:// sources.
    #[arg(long)]
    cert_bundle: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = SourceConfig::default()
        .timeout(Duration::from_millis(cli.timeout_ms))
        .max_event_bytes(cli.max_event_bytes);
    if let Some(bundle) = cli.cert_bundle {
        config = config.ssl_cert_bundle(bundle);
    }

    let mut instance = match AuditSource::new(config).open(&cli.address).await {
        Ok(instance) => instance,
        Err(err) => {
            eprintln!("failed to open {}: {err}", cli.address);
            return ExitCode::FAILURE;
        }
    };

    if let Some(addr) = bound_within(&mut instance, Duration::from_secs(2)).await {
        info!(address = %addr, "webhook listening");
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, closing source");
                instance.shutdown().await;
                return ExitCode::SUCCESS;
            }
            next = instance.next_record() => match next {
                Ok(ReadOutcome::Record(record)) => println!("{}", record.render()),
                Ok(ReadOutcome::Timeout) => continue,
                Ok(ReadOutcome::Closed) => {
                    info!("source closed");
                    return ExitCode::SUCCESS;
                }
                Err(err) => {
                    warn!(error = %err, "source failed");
                    eprintln!("source failed: {err}");
                    return ExitCode::FAILURE;
                }
            }
        }
    }
}

/// Waits briefly for a webhook instance to report its bound address; file
/// sources never do, so give up quickly instead of blocking the tail.
async fn bound_within(
    instance: &mut audit_source::SourceInstance,
    wait: Duration,
) -> Option<std::net::SocketAddr> {
    tokio::time::timeout(wait, instance.bound_addr()).await.ok().flatten()
}
