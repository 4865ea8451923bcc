//! Upstream data source seam
//!
//! The engine reads through [`SalesSource`] so reports can be computed
//! against the live API or an in-memory fixture. A [`SourceFactory`] turns
//! one decrypted tenant credential into one source instance.

use std::sync::Arc;

use async_trait::async_trait;
use shared::{Channel, DateWindow, ReportResult};
use sklad_client::{
    ClientConfig, Expand, RawDocument, RawPosition, UpstreamClient, UpstreamResult,
};

/// Read access to one tenant's sales documents
#[async_trait]
pub trait SalesSource: Send + Sync {
    /// Every document of `channel` inside `window`, all pages drained
    async fn fetch_documents(
        &self,
        channel: Channel,
        window: DateWindow,
        expand: Expand,
    ) -> UpstreamResult<Vec<RawDocument>>;

    /// Line items of one document
    async fn fetch_positions(
        &self,
        channel: Channel,
        document_id: &str,
    ) -> UpstreamResult<Vec<RawPosition>>;

    /// Display name behind a reference handle
    async fn resolve_name(&self, href: &str) -> UpstreamResult<Option<String>>;
}

#[async_trait]
impl SalesSource for UpstreamClient {
    async fn fetch_documents(
        &self,
        channel: Channel,
        window: DateWindow,
        expand: Expand,
    ) -> UpstreamResult<Vec<RawDocument>> {
        self.fetch_all(channel, window, expand).await
    }

    async fn fetch_positions(
        &self,
        channel: Channel,
        document_id: &str,
    ) -> UpstreamResult<Vec<RawPosition>> {
        UpstreamClient::fetch_positions(self, channel, document_id).await
    }

    async fn resolve_name(&self, href: &str) -> UpstreamResult<Option<String>> {
        Ok(self.fetch_named(href).await?.name)
    }
}

/// Builds a per-tenant source from a plaintext credential
pub trait SourceFactory: Send + Sync {
    fn connect(&self, token: &str) -> ReportResult<Arc<dyn SalesSource>>;
}

/// Factory producing live [`UpstreamClient`]s
#[derive(Debug, Clone)]
pub struct UpstreamFactory {
    config: ClientConfig,
}

impl UpstreamFactory {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }
}

impl SourceFactory for UpstreamFactory {
    fn connect(&self, token: &str) -> ReportResult<Arc<dyn SalesSource>> {
        let client = UpstreamClient::new(&self.config, token)?;
        Ok(Arc::new(client))
    }
}
