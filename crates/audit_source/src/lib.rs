#![forbid(unsafe_code)]
//! Event source adapter for audit-style JSON records.
//!
//! One configuration string selects the transport: `file://<path>` tails a
//! newline-delimited JSON file, `http://` / `https://` run an embedded webhook
//! server that accepts one JSON document per POST. Both transports feed the
//! same [`SourceInstance`], so the consumer drains records without knowing
//! where they came from.

mod address;
mod config;
mod error;
mod file;
mod instance;
mod record;
mod source;
mod webhook;

pub use address::{resolve, Address};
pub use config::SourceConfig;
pub use error::{OpenError, SourceError};
pub use instance::{ReadOutcome, SourceInstance};
pub use record::Record;
pub use source::AuditSource;
