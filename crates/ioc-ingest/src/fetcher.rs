//! Paginated retrieval from the indicator feed
//!
//! The feed is a TAXII 2.1 style collection endpoint. A run without a resume
//! token filters by `added_after`; a run with one passes it as `next` and
//! drops the time filter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ioc_common::types::{Cursor, Page};
use ioc_common::{IngestError, Result};
use reqwest::{header, Client};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Media type the feed answers with
pub const TAXII_ACCEPT: &str = "application/taxii+json;version=2.1";

/// Retrieves one page of indicators for a cursor
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, cursor: &Cursor) -> Result<Page>;
}

#[async_trait]
impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    async fn fetch(&self, cursor: &Cursor) -> Result<Page> {
        (**self).fetch(cursor).await
    }
}

/// Fetcher for the HTTP feed
pub struct HttpFetcher {
    client: Client,
    objects_url: Url,
    token: String,
    added_after: String,
}

impl HttpFetcher {
    /// `lookback_start` is fixed for the lifetime of the fetcher; every
    /// cursor-less page uses the same window.
    pub fn new(
        client: Client,
        objects_url: Url,
        token: impl Into<String>,
        lookback_start: DateTime<Utc>,
    ) -> Self {
        Self {
            client,
            objects_url,
            token: token.into(),
            added_after: feed_timestamp(lookback_start),
        }
    }

    /// URL requested for `cursor`
    pub fn request_url(&self, cursor: &Cursor) -> Url {
        let mut url = self.objects_url.clone();
        match cursor.resume_token() {
            Some(token) => {
                url.query_pairs_mut().append_pair("next", token);
            },
            None => {
                url.query_pairs_mut().append_pair("added_after", &self.added_after);
            },
        }
        url
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, cursor: &Cursor) -> Result<Page> {
        let url = self.request_url(cursor);
        debug!(url = %url, cursor = %cursor, "Fetching feed page");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, TAXII_ACCEPT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::FetchFailed {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let page: Page = serde_json::from_slice(&bytes)?;

        info!(
            objects = page.objects.len(),
            more = page.more,
            "Fetched feed page"
        );
        Ok(page)
    }
}

/// Timestamp format accepted by the `added_after` filter
pub fn feed_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
