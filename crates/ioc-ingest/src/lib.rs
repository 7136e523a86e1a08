//! IOC Ingest Library
//!
//! Incremental ingestion of threat indicators from a paginated TAXII-style
//! feed into a UDM ingestion endpoint.
//!
//! # Stages
//!
//! - **cursor**: resume state persisted through a [`checkpoint::CheckpointStore`]
//! - **fetcher**: one feed page per call
//! - **transform**: indicator to normalized event
//! - **batcher**: size-bounded upload groups
//! - **uploader**: one POST per batch
//! - **pipeline**: the loop tying them together under a deadline
//!
//! # Example
//!
//! ```no_run
//! use ioc_ingest::config::IngestConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::from_env()?;
//!     let report = ioc_ingest::ingest(&config).await?;
//!     println!("{}", report.outcome);
//!     Ok(())
//! }
//! ```

pub mod batcher;
pub mod checkpoint;
pub mod config;
pub mod cursor;
pub mod fetcher;
pub mod pipeline;
pub mod region;
pub mod transform;
pub mod trigger;
pub mod uploader;

use ioc_common::Result;

use crate::checkpoint::FileCheckpointStore;
use crate::config::IngestConfig;
use crate::cursor::CursorManager;
use crate::fetcher::HttpFetcher;
use crate::pipeline::{Pipeline, RunReport};
use crate::transform::Transformer;
use crate::uploader::HttpUploader;

/// Run one ingestion invocation against the configured feed and sink
pub async fn ingest(config: &IngestConfig) -> Result<RunReport> {
    let client = config.http_client()?;

    let store = FileCheckpointStore::new(&config.checkpoint_dir);
    let fetcher = HttpFetcher::new(
        client.clone(),
        config.feed_url.clone(),
        config.feed_token.clone(),
        config.lookback_start(),
    );
    let uploader = HttpUploader::new(
        client,
        HttpUploader::endpoint_for(&config.ingestion_url)?,
        config.customer_id.clone(),
        config.ingestion_token.clone(),
    );

    Pipeline::new(
        CursorManager::new(store, config.checkpoint_key.clone()),
        fetcher,
        uploader,
        Transformer::new(config.vendor_name.clone()),
        config.pipeline_settings(),
    )
    .run()
    .await
}
