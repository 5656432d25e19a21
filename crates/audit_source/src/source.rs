use crate::address::{resolve, Address};
use crate::config::SourceConfig;
use crate::error::OpenError;
use crate::instance::SourceInstance;
use crate::{file, webhook};

/// Entry point of the adapter: holds the consumer-supplied configuration
/// and opens one [`SourceInstance`] per address string.
#[derive(Debug, Clone, Default)]
pub struct AuditSource {
    config: SourceConfig,
}

impl AuditSource {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Resolves `params` and starts exactly one producer for it.
    ///
    /// Parse failures and file-open failures are returned here, before any
    /// background task exists. Webhook bind/TLS failures happen inside the
    /// producer task and surface through the instance's error queue on the
    /// first read instead.
    pub async fn open(&self, params: &str) -> Result<SourceInstance, OpenError> {
        match resolve(params)? {
            Address::LocalFile { path } => file::start(&path, &self.config).await,
            Address::Webhook {
                port_spec,
                path,
                use_tls,
            } => Ok(webhook::start(&port_spec, &path, use_tls, &self.config)),
        }
    }
}
