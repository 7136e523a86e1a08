//! Configuration management
//!
//! Everything is resolved once at startup into [`IngestConfig`] and handed
//! to the pipeline explicitly.

use chrono::{DateTime, Utc};
use ioc_common::{IngestError, Result};
use reqwest::Client;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use url::Url;

use crate::pipeline::{MalformedPolicy, PipelineSettings};
use crate::region::Region;
use crate::transform::DEFAULT_VENDOR_NAME;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default ingestion region.
pub const DEFAULT_REGION: Region = Region::Us;

/// Default directory holding checkpoint files.
pub const DEFAULT_CHECKPOINT_DIR: &str = ".ioc-ingest";

/// Default checkpoint key for the resume cursor.
pub const DEFAULT_CHECKPOINT_KEY: &str = "feed_cursor";

/// Default execution budget in seconds (host limit is one hour).
pub const DEFAULT_DEADLINE_SECS: u64 = 3000;

/// Default lookback window in minutes for cursor-less fetches.
pub const DEFAULT_LOOKBACK_MINUTES: u64 = 60;

/// Default upload size limit in bytes.
pub const DEFAULT_MAX_BATCH_BYTES: usize = 1_048_576;

/// Default per-request HTTP timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Runtime configuration of the ingestion pipeline
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub customer_id: String,
    pub region: Region,
    /// Ingestion host; the region's host unless overridden
    pub ingestion_url: Url,
    pub ingestion_token: Option<String>,
    /// Collection objects endpoint of the feed
    pub feed_url: Url,
    pub feed_token: String,
    pub checkpoint_dir: PathBuf,
    pub checkpoint_key: String,
    pub deadline: Duration,
    pub lookback: Duration,
    pub max_batch_bytes: usize,
    pub http_timeout: Duration,
    pub malformed_policy: MalformedPolicy,
    pub vendor_name: String,
    /// Wall clock at startup; anchors the lookback window
    pub started_at: DateTime<Utc>,
    /// Monotonic clock at startup; anchors the deadline
    pub started: Instant,
}

impl IngestConfig {
    /// Load configuration from the environment (and `.env`) over defaults
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &str| {
            var(name).ok_or_else(|| IngestError::config(format!("{} must be set", name)))
        };

        let region = match var("IOC_REGION") {
            Some(raw) => raw.parse()?,
            None => DEFAULT_REGION,
        };
        let ingestion_url = match var("IOC_INGESTION_URL") {
            Some(raw) => parse_url("IOC_INGESTION_URL", &raw)?,
            None => parse_url("IOC_REGION", region.base_url())?,
        };
        let feed_root = parse_url("IOC_FEED_URL", &required("IOC_FEED_URL")?)?;
        let feed_url = collection_objects_url(&feed_root, &required("IOC_COLLECTION_ID")?)?;

        let lookback_minutes: u64 = parse_or(
            "IOC_LOOKBACK_MINUTES",
            var("IOC_LOOKBACK_MINUTES"),
            DEFAULT_LOOKBACK_MINUTES,
        )?;
        let lookback = lookback_minutes
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| {
                IngestError::config(format!(
                    "IOC_LOOKBACK_MINUTES is too large: {}",
                    lookback_minutes
                ))
            })?;

        let config = IngestConfig {
            customer_id: required("IOC_CUSTOMER_ID")?,
            region,
            ingestion_url,
            ingestion_token: var("IOC_INGESTION_TOKEN"),
            feed_url,
            feed_token: required("IOC_FEED_TOKEN")?,
            checkpoint_dir: var("IOC_CHECKPOINT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CHECKPOINT_DIR)),
            checkpoint_key: var("IOC_CHECKPOINT_KEY")
                .unwrap_or_else(|| DEFAULT_CHECKPOINT_KEY.to_string()),
            deadline: Duration::from_secs(parse_or(
                "IOC_DEADLINE_SECS",
                var("IOC_DEADLINE_SECS"),
                DEFAULT_DEADLINE_SECS,
            )?),
            lookback,
            max_batch_bytes: parse_or(
                "IOC_MAX_BATCH_BYTES",
                var("IOC_MAX_BATCH_BYTES"),
                DEFAULT_MAX_BATCH_BYTES,
            )?,
            http_timeout: Duration::from_secs(parse_or(
                "IOC_HTTP_TIMEOUT_SECS",
                var("IOC_HTTP_TIMEOUT_SECS"),
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
            malformed_policy: match var("IOC_MALFORMED_POLICY") {
                Some(raw) => raw.parse()?,
                None => MalformedPolicy::default(),
            },
            vendor_name: var("IOC_VENDOR_NAME").unwrap_or_else(|| DEFAULT_VENDOR_NAME.to_string()),
            started_at: Utc::now(),
            started: Instant::now(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_bytes == 0 {
            return Err(IngestError::config("IOC_MAX_BATCH_BYTES must be greater than 0"));
        }

        if self.http_timeout.is_zero() {
            return Err(IngestError::config("IOC_HTTP_TIMEOUT_SECS must be greater than 0"));
        }

        if self.checked_lookback_start().is_none() {
            return Err(IngestError::config(format!(
                "IOC_LOOKBACK_MINUTES reaches past the earliest supported date: {} minutes",
                self.lookback.as_secs() / 60
            )));
        }

        if self.deadline.is_zero() {
            tracing::warn!("Deadline is zero - every run will checkpoint after one page");
        }

        if self.ingestion_token.is_none() {
            tracing::warn!("No ingestion token configured - uploads are unauthenticated");
        }

        Ok(())
    }

    /// Same configuration with clocks restarted for a fresh invocation
    pub fn for_invocation(&self) -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
            ..self.clone()
        }
    }

    /// Start of the lookback window used by cursor-less fetches
    ///
    /// Clamped to the earliest representable date; [`IngestConfig::validate`]
    /// rejects windows that would need the clamp.
    pub fn lookback_start(&self) -> DateTime<Utc> {
        self.checked_lookback_start().unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    fn checked_lookback_start(&self) -> Option<DateTime<Utc>> {
        let lookback = chrono::Duration::from_std(self.lookback).ok()?;
        self.started_at.checked_sub_signed(lookback)
    }

    /// Pipeline tunables derived from this configuration
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            deadline: self.deadline,
            max_batch_bytes: self.max_batch_bytes,
            malformed_policy: self.malformed_policy,
            started: self.started,
        }
    }

    /// HTTP client shared by the fetcher and the uploader
    pub fn http_client(&self) -> Result<Client> {
        Client::builder()
            .timeout(self.http_timeout)
            .user_agent(concat!("ioc-ingest/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(IngestError::from)
    }
}

/// `{root}/collections/{id}/objects/`
pub fn collection_objects_url(root: &Url, collection_id: &str) -> Result<Url> {
    let mut url = root.clone();
    url.path_segments_mut()
        .map_err(|_| IngestError::config(format!("IOC_FEED_URL '{}' cannot be a base", root)))?
        .pop_if_empty()
        .extend(["collections", collection_id, "objects", ""]);
    Ok(url)
}

fn parse_url(name: &str, raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| IngestError::config(format!("{} is not a valid URL: {}", name, e)))
}

fn parse_or<T: std::str::FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|_| IngestError::config(format!("{} has an invalid value '{}'", name, raw))),
        None => Ok(default),
    }
}
