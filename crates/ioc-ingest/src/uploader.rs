//! Batch upload to the ingestion endpoint

use async_trait::async_trait;
use ioc_common::types::NormalizedEvent;
use ioc_common::{IngestError, Result};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::batcher;

/// Log type the ingestion endpoint files the entities under
pub const LOG_TYPE: &str = "STIX";

/// Path of the batch endpoint relative to the regional host
pub const BATCH_CREATE_PATH: &str = "v2/entities:batchCreate";

/// Acknowledgement of an accepted batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub accepted: usize,
}

/// Sends one batch per call; success means the whole batch was accepted
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, batch: &[NormalizedEvent]) -> Result<Ack>;

    /// Request body bytes around the serialized events of a batch
    ///
    /// The body of an upload is this many bytes plus
    /// [`Batch::byte_size`](crate::batcher::Batch::byte_size).
    fn envelope_bytes(&self) -> Result<usize> {
        Ok(0)
    }
}

#[async_trait]
impl<T: Uploader + ?Sized> Uploader for Arc<T> {
    async fn upload(&self, batch: &[NormalizedEvent]) -> Result<Ack> {
        (**self).upload(batch).await
    }

    fn envelope_bytes(&self) -> Result<usize> {
        (**self).envelope_bytes()
    }
}

#[derive(Serialize)]
struct BatchCreateRequest<'a> {
    customer_id: &'a str,
    log_type: &'a str,
    entities: &'a [NormalizedEvent],
}

/// Uploader for the HTTP ingestion endpoint
pub struct HttpUploader {
    client: Client,
    endpoint: Url,
    customer_id: String,
    token: Option<String>,
}

impl HttpUploader {
    pub fn new(
        client: Client,
        endpoint: Url,
        customer_id: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint,
            customer_id: customer_id.into(),
            token,
        }
    }

    /// `{base}/v2/entities:batchCreate`
    pub fn endpoint_for(base: &Url) -> Result<Url> {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(BATCH_CREATE_PATH)
            .map_err(|e| IngestError::config(format!("invalid ingestion URL '{}': {}", base, e)))
    }

    fn request<'a>(&'a self, batch: &'a [NormalizedEvent]) -> BatchCreateRequest<'a> {
        BatchCreateRequest {
            customer_id: &self.customer_id,
            log_type: LOG_TYPE,
            entities: batch,
        }
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, batch: &[NormalizedEvent]) -> Result<Ack> {
        let body = self.request(batch);
        debug!(endpoint = %self.endpoint, events = batch.len(), "Uploading batch");

        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::UploadFailed {
                status: status.as_u16(),
                body,
            });
        }

        info!(events = batch.len(), "Batch accepted");
        Ok(Ack {
            accepted: batch.len(),
        })
    }

    fn envelope_bytes(&self) -> Result<usize> {
        // the empty request still carries the array brackets
        Ok(batcher::serialized_len(&self.request(&[]))?)
    }
}
