//! HTTP client for the upstream commerce API

use std::time::Duration;

use futures::{Stream, TryStreamExt, stream};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use shared::{Channel, DateWindow};

use crate::config::{ClientConfig, EXPANDED_PAGE_LIMIT, VALIDATE_TIMEOUT_SECS};
use crate::types::{NamedRef, Page, RawDocument, RawPosition};
use crate::{Expand, UpstreamError, UpstreamResult};

/// Entity path of a channel's documents
pub fn entity_path(channel: Channel) -> &'static str {
    match channel {
        Channel::Order => "entity/customerorder",
        Channel::RetailSale => "entity/retaildemand",
        Channel::RetailReturn => "entity/retailsalesreturn",
    }
}

/// Field the upstream date filter applies to
pub fn date_field(channel: Channel) -> &'static str {
    match channel {
        Channel::Order => "created",
        Channel::RetailSale | Channel::RetailReturn => "moment",
    }
}

/// Upstream filter expression covering the whole window
pub fn date_filter(field: &str, window: &DateWindow) -> String {
    format!(
        "{field}>={} 00:00:00;{field}<={} 23:59:59",
        window.date_from.format("%Y-%m-%d"),
        window.date_to.format("%Y-%m-%d"),
    )
}

/// Per-tenant upstream client
///
/// Carries exactly one credential. Build a new instance per tenant and per
/// request; never share one across tenants.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    base_url: String,
    token: String,
    config: ClientConfig,
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("base_url", &self.base_url)
            .field("page_limit", &self.config.page_limit)
            .finish_non_exhaustive()
    }
}

impl UpstreamClient {
    /// Create a client for one tenant credential
    pub fn new(config: &ClientConfig, token: impl Into<String>) -> UpstreamResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| UpstreamError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            config: config.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Same scheme, host and port as the base URL, path under its prefix
    fn is_upstream_href(&self, href: &str) -> bool {
        let (Ok(base), Ok(target)) = (Url::parse(&self.base_url), Url::parse(href)) else {
            return false;
        };
        if base.scheme() != target.scheme()
            || base.host_str() != target.host_str()
            || base.port_or_known_default() != target.port_or_known_default()
        {
            return false;
        }

        let prefix = base.path().trim_end_matches('/');
        let path = target.path();
        prefix.is_empty()
            || path == prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Authenticated GET, status classified
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> UpstreamResult<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json;charset=utf-8")
            .query(query)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> UpstreamResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_status(status, &text));
        }

        response.json().await.map_err(Into::into)
    }

    /// Offset pagination over any listing
    ///
    /// Each page depends on the previous one's continuation cue, so pages are
    /// requested strictly in sequence.
    fn paginate<'a, T>(
        &'a self,
        url: String,
        base_query: Vec<(&'static str, String)>,
        limit: u32,
    ) -> impl Stream<Item = UpstreamResult<Vec<T>>> + 'a
    where
        T: DeserializeOwned + 'a,
    {
        stream::try_unfold(Some(0u64), move |state| {
            let url = url.clone();
            let mut query = base_query.clone();
            async move {
                let Some(offset) = state else {
                    return Ok(None);
                };

                query.push(("limit", limit.to_string()));
                query.push(("offset", offset.to_string()));

                let page: Page<T> = self.get_json(&url, &query).await?;
                let fetched = page.rows.as_ref().map_or(0, |rows| rows.len() as u64);
                let more = page.has_more(offset, fetched, limit);
                let rows = page.rows.ok_or_else(|| {
                    UpstreamError::InvalidResponse(format!("listing {} has no rows", url))
                })?;

                tracing::debug!(offset, rows = fetched, more, "Fetched page");

                let next = more.then_some(offset + fetched);
                Ok(Some((rows, next)))
            }
        })
    }

    /// Documents of one channel for a window, page by page
    pub fn pages(
        &self,
        channel: Channel,
        window: DateWindow,
        expand: Expand,
    ) -> impl Stream<Item = UpstreamResult<Vec<RawDocument>>> + '_ {
        let field = date_field(channel);
        let mut query = vec![
            ("filter", date_filter(field, &window)),
            ("order", format!("{field},desc")),
        ];
        if let Some(param) = expand.param() {
            query.push(("expand", param.to_string()));
        }
        let limit = expand.page_limit(&self.config);

        tracing::debug!(channel = %channel, window = %window.label(), limit, "Listing documents");
        self.paginate(self.url(entity_path(channel)), query, limit)
    }

    /// All documents of one channel for a window
    pub async fn fetch_all(
        &self,
        channel: Channel,
        window: DateWindow,
        expand: Expand,
    ) -> UpstreamResult<Vec<RawDocument>> {
        let rows: Vec<RawDocument> = self.pages(channel, window, expand).try_concat().await?;
        tracing::debug!(channel = %channel, rows = rows.len(), "Listing complete");
        Ok(rows)
    }

    /// Line items of one document, with assortment expanded
    pub async fn fetch_positions(
        &self,
        channel: Channel,
        document_id: &str,
    ) -> UpstreamResult<Vec<RawPosition>> {
        let url = self.url(&format!("{}/{}/positions", entity_path(channel), document_id));
        let limit = self.config.page_limit.min(EXPANDED_PAGE_LIMIT);
        self.paginate(url, vec![("expand", "assortment".to_string())], limit)
            .try_concat()
            .await
    }

    /// Fetch an entity by its absolute reference handle
    ///
    /// Only handles under this client's base URL are followed, so the
    /// credential never leaves the upstream host.
    pub async fn fetch_named(&self, href: &str) -> UpstreamResult<NamedRef> {
        if !self.is_upstream_href(href) {
            return Err(UpstreamError::BadRequest(format!(
                "reference outside upstream API: {}",
                href
            )));
        }
        self.get_json(href, &[]).await
    }

    /// Minimal authenticated read; true only on 2xx
    pub async fn validate_token(&self) -> bool {
        let result = self
            .client
            .get(self.url("entity/counterparty"))
            .bearer_auth(&self.token)
            .query(&[("limit", "1")])
            .timeout(Duration::from_secs(VALIDATE_TIMEOUT_SECS))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::info!(status = response.status().as_u16(), "Token rejected");
                false
            }
            Err(e) => {
                tracing::warn!(error = %UpstreamError::from(e), "Token validation failed");
                false
            }
        }
    }
}
