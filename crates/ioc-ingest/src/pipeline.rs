//! Pipeline driver
//!
//! One invocation loads the cursor, then loops page by page:
//! fetch, transform, batch, upload, and decide. A page counts as done only
//! once every batch built from it is accepted, and the cursor is only
//! written after that. Any fetch or upload failure aborts the run with the
//! persisted cursor untouched, so the next invocation re-fetches the same
//! page (at-least-once delivery).

use ioc_common::types::{Cursor, NormalizedEvent, Page};
use ioc_common::{IngestError, Result};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::batcher::{self, MAX_BATCH_BYTES};
use crate::checkpoint::CheckpointStore;
use crate::cursor::CursorManager;
use crate::fetcher::Fetcher;
use crate::transform::Transformer;
use crate::uploader::Uploader;

/// Default execution budget, leaving headroom under a one hour host limit
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(3000);

/// What to do with a supported indicator that cannot be transformed
///
/// Covers an IPv4 indicator that carries no address and an indicator whose
/// fields do not decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Log and count it, keep going
    #[default]
    Skip,
    /// Fail the run before anything from the page is uploaded
    Abort,
}

impl FromStr for MalformedPolicy {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(MalformedPolicy::Skip),
            "abort" | "fail" => Ok(MalformedPolicy::Abort),
            _ => Err(IngestError::config(format!(
                "Invalid malformed indicator policy: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for MalformedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedPolicy::Skip => write!(f, "skip"),
            MalformedPolicy::Abort => write!(f, "abort"),
        }
    }
}

/// Tunables for one run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub deadline: Duration,
    pub max_batch_bytes: usize,
    pub malformed_policy: MalformedPolicy,
    /// Moment the hosting deadline started counting
    pub started: Instant,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            deadline: DEFAULT_DEADLINE,
            max_batch_bytes: MAX_BATCH_BYTES,
            malformed_policy: MalformedPolicy::default(),
            started: Instant::now(),
        }
    }
}

/// How a successful run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The feed had no more pages; the exhaustion marker is persisted
    Exhausted,
    /// The deadline hit with pages left; `token` is persisted
    Checkpointed { token: String },
}

impl RunOutcome {
    /// Text returned to the invoker
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Exhausted => "ok",
            RunOutcome::Checkpointed { .. } => "TIMEOUT",
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub outcome: RunOutcome,
    pub pages: usize,
    pub objects: usize,
    pub events: usize,
    pub skipped_unsupported: usize,
    pub malformed: usize,
    pub batches: usize,
    pub elapsed: Duration,
}

/// Decision taken after a page is fully uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Fetch the next page in this run
    Continue(String),
    /// Persist the token and stop
    Checkpoint(String),
    /// Persist the exhaustion marker and stop
    Exhaust,
}

/// Pick the transition for a finished page
///
/// A page claiming more data without a usable token cannot be resumed and
/// is treated as the end of the feed.
pub fn next_transition(
    more: bool,
    next: Option<&str>,
    elapsed: Duration,
    deadline: Duration,
) -> Transition {
    if !more {
        return Transition::Exhaust;
    }
    let Some(token) = next else {
        warn!("Feed reported more pages without a continuation token; treating as exhausted");
        return Transition::Exhaust;
    };
    if elapsed >= deadline {
        Transition::Checkpoint(token.to_string())
    } else {
        Transition::Continue(token.to_string())
    }
}

#[derive(Default)]
struct Counters {
    pages: usize,
    objects: usize,
    events: usize,
    skipped_unsupported: usize,
    malformed: usize,
    batches: usize,
}

/// Drives one ingestion invocation
pub struct Pipeline<S, F, U> {
    cursor: CursorManager<S>,
    fetcher: F,
    uploader: U,
    transformer: Transformer,
    settings: PipelineSettings,
}

impl<S, F, U> Pipeline<S, F, U>
where
    S: CheckpointStore,
    F: Fetcher,
    U: Uploader,
{
    pub fn new(
        cursor: CursorManager<S>,
        fetcher: F,
        uploader: U,
        transformer: Transformer,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            cursor,
            fetcher,
            uploader,
            transformer,
            settings,
        }
    }

    /// Run until the feed is drained or the deadline passes
    pub async fn run(self) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "ingest_run",
            run_id = %run_id,
            checkpoint = %self.cursor.key()
        );
        self.execute(run_id).instrument(span).await
    }

    async fn execute(mut self, run_id: Uuid) -> Result<RunReport> {
        let mut counters = Counters::default();
        let mut cursor = self.cursor.load().await?;
        info!(cursor = %cursor, "Starting ingestion run");

        let outcome = loop {
            let page = self.fetcher.fetch(&cursor).await?;
            counters.pages += 1;
            counters.objects += page.objects.len();

            let events = self.transform_page(&page, &mut counters)?;
            self.upload_events(&events, &mut counters).await?;

            let elapsed = self.settings.started.elapsed();
            let transition =
                next_transition(page.more, page.next_token(), elapsed, self.settings.deadline);
            match transition {
                Transition::Continue(token) => {
                    debug!(next = %token, "Continuing to next page");
                    cursor = Cursor::Active(token);
                },
                Transition::Checkpoint(token) => {
                    info!(elapsed_secs = elapsed.as_secs(), "Deadline reached, checkpointing");
                    self.cursor.advance(&token).await?;
                    break RunOutcome::Checkpointed { token };
                },
                Transition::Exhaust => {
                    self.cursor.exhaust().await?;
                    break RunOutcome::Exhausted;
                },
            }
        };

        let report = RunReport {
            run_id,
            outcome,
            pages: counters.pages,
            objects: counters.objects,
            events: counters.events,
            skipped_unsupported: counters.skipped_unsupported,
            malformed: counters.malformed,
            batches: counters.batches,
            elapsed: self.settings.started.elapsed(),
        };
        info!(
            outcome = %report.outcome,
            pages = report.pages,
            objects = report.objects,
            events = report.events,
            skipped_unsupported = report.skipped_unsupported,
            malformed = report.malformed,
            batches = report.batches,
            "Ingestion run finished"
        );
        Ok(report)
    }

    fn transform_page(
        &self,
        page: &Page,
        counters: &mut Counters,
    ) -> Result<Vec<NormalizedEvent>> {
        let mut events = Vec::with_capacity(page.objects.len());
        for object in &page.objects {
            match self.transformer.transform(object) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => counters.skipped_unsupported += 1,
                Err(e) if e.is_per_object() => match self.settings.malformed_policy {
                    MalformedPolicy::Skip => {
                        error!(id = %object.id(), error = %e, "Skipping malformed indicator");
                        counters.malformed += 1;
                    },
                    MalformedPolicy::Abort => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }
        Ok(events)
    }

    async fn upload_events(
        &self,
        events: &[NormalizedEvent],
        counters: &mut Counters,
    ) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        // the limit covers the whole request body, envelope included
        let limit = self
            .settings
            .max_batch_bytes
            .saturating_sub(self.uploader.envelope_bytes()?);
        for batch in batcher::batch(events, limit) {
            let batch = batch?;
            debug!(events = batch.len(), bytes = batch.byte_size(), "Uploading batch");
            let ack = self.uploader.upload(batch.events()).await?;
            counters.events += ack.accepted;
            counters.batches += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::checkpoint::MemoryCheckpointStore;
    use crate::uploader::Ack;
    use async_trait::async_trait;
    use ioc_common::types::{FeedObject, EXHAUSTED_SENTINEL, VENDOR_EXTENSION_KEY};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    const KEY: &str = "feed_cursor";

    /// Serves canned pages keyed by resume token (`None` for the lookback query)
    #[derive(Default)]
    struct ScriptedFetcher {
        pages: HashMap<Option<String>, Page>,
        failure: Option<u16>,
        calls: Mutex<Vec<Cursor>>,
    }

    impl ScriptedFetcher {
        fn page(
            mut self,
            token: Option<&str>,
            objects: Vec<FeedObject>,
            more: bool,
            next: Option<&str>,
        ) -> Self {
            self.pages.insert(
                token.map(str::to_string),
                Page {
                    objects,
                    more,
                    next: next.map(str::to_string),
                },
            );
            self
        }

        fn calls(&self) -> Vec<Cursor> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, cursor: &Cursor) -> Result<Page> {
            self.calls.lock().unwrap().push(cursor.clone());
            if let Some(status) = self.failure {
                return Err(IngestError::FetchFailed {
                    status,
                    body: "feed down".to_string(),
                });
            }
            let key = cursor.resume_token().map(str::to_string);
            Ok(self.pages.get(&key).cloned().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct RecordingUploader {
        failure: Option<(u16, &'static str)>,
        envelope: usize,
        batches: Mutex<Vec<Vec<String>>>,
    }

    impl RecordingUploader {
        fn failing(status: u16, body: &'static str) -> Self {
            Self {
                failure: Some((status, body)),
                ..Self::default()
            }
        }

        fn uploaded_ids(&self) -> Vec<Vec<String>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Uploader for RecordingUploader {
        async fn upload(&self, batch: &[NormalizedEvent]) -> Result<Ack> {
            if let Some((status, body)) = self.failure {
                return Err(IngestError::UploadFailed {
                    status,
                    body: body.to_string(),
                });
            }
            let ids = batch.iter().map(|e| e.metadata.product_entity_id.clone()).collect();
            self.batches.lock().unwrap().push(ids);
            Ok(Ack {
                accepted: batch.len(),
            })
        }

        fn envelope_bytes(&self) -> Result<usize> {
            Ok(self.envelope)
        }
    }

    fn indicator(id: &str, kind: &str, name: &str) -> FeedObject {
        FeedObject::from(raw_indicator(id, kind, name))
    }

    fn raw_indicator(id: &str, kind: &str, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "confidence": 70,
            "pattern": "[x:value = 'y']",
            "pattern_type": "stix",
            "valid_from": "2026-10-01T00:00:00Z",
            "extensions": {
                VENDOR_EXTENSION_KEY: {
                    "main_observable_type": kind,
                    "created_at": "2026-10-01T00:00:00Z",
                    "updated_at": "2026-10-01T00:00:00Z",
                    "score": 40,
                    "detection": 1
                }
            }
        })
    }

    fn settings(deadline: Duration) -> PipelineSettings {
        PipelineSettings {
            deadline,
            ..PipelineSettings::default()
        }
    }

    fn pipeline(
        store: &Arc<MemoryCheckpointStore>,
        fetcher: &Arc<ScriptedFetcher>,
        uploader: &Arc<RecordingUploader>,
        settings: PipelineSettings,
    ) -> Pipeline<Arc<MemoryCheckpointStore>, Arc<ScriptedFetcher>, Arc<RecordingUploader>> {
        Pipeline::new(
            CursorManager::new(store.clone(), KEY),
            fetcher.clone(),
            uploader.clone(),
            Transformer::default(),
            settings,
        )
    }

    #[test]
    fn test_next_transition() {
        let short = Duration::from_secs(1);
        let long = Duration::from_secs(10);

        assert_eq!(next_transition(false, Some("t"), short, long), Transition::Exhaust);
        assert_eq!(next_transition(false, None, long, short), Transition::Exhaust);
        assert_eq!(
            next_transition(true, Some("t"), short, long),
            Transition::Continue("t".to_string())
        );
        assert_eq!(
            next_transition(true, Some("t"), long, short),
            Transition::Checkpoint("t".to_string())
        );
        assert_eq!(
            next_transition(true, Some("t"), long, long),
            Transition::Checkpoint("t".to_string())
        );
        assert_eq!(next_transition(true, None, short, long), Transition::Exhaust);
    }

    #[test]
    fn test_malformed_policy_from_str() {
        assert_eq!("skip".parse::<MalformedPolicy>().unwrap(), MalformedPolicy::Skip);
        assert_eq!(" ABORT ".parse::<MalformedPolicy>().unwrap(), MalformedPolicy::Abort);
        assert!("ignore".parse::<MalformedPolicy>().is_err());
    }

    #[tokio::test]
    async fn test_drained_feed_exhausts_and_returns_ok() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let fetcher = Arc::new(
            ScriptedFetcher::default()
                .page(None, vec![indicator("i-1", "Url", "https://a.example")], true, Some("p2"))
                .page(Some("p2"), vec![indicator("i-2", "Domain-Name", "b.example")], false, None),
        );
        let uploader = Arc::new(RecordingUploader::default());

        let report = pipeline(&store, &fetcher, &uploader, settings(DEFAULT_DEADLINE))
            .run()
            .await
            .unwrap();

        assert_eq!(report.outcome, RunOutcome::Exhausted);
        assert_eq!(report.outcome.as_str(), "ok");
        assert_eq!(report.pages, 2);
        assert_eq!(report.events, 2);
        assert_eq!(uploader.uploaded_ids(), vec![vec!["i-1"], vec!["i-2"]]);
        // the continuation token stays in memory until the run ends
        assert_eq!(store.history(KEY), vec![EXHAUSTED_SENTINEL]);
        assert_eq!(
            fetcher.calls(),
            vec![Cursor::Unset, Cursor::Active("p2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_repeated_timeouts_persist_advancing_tokens() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let fetcher = Arc::new(
            ScriptedFetcher::default()
                .page(None, vec![indicator("i-1", "Url", "https://a.example")], true, Some("p2"))
                .page(
                    Some("p2"),
                    vec![indicator("i-2", "Url", "https://b.example")],
                    true,
                    Some("p3"),
                )
                .page(Some("p3"), vec![], false, None),
        );
        let uploader = Arc::new(RecordingUploader::default());

        let first = pipeline(&store, &fetcher, &uploader, settings(Duration::ZERO))
            .run()
            .await
            .unwrap();
        assert_eq!(first.outcome.as_str(), "TIMEOUT");
        assert_eq!(first.pages, 1);

        let second = pipeline(&store, &fetcher, &uploader, settings(Duration::ZERO))
            .run()
            .await
            .unwrap();
        assert_eq!(
            second.outcome,
            RunOutcome::Checkpointed {
                token: "p3".to_string()
            }
        );

        let third = pipeline(&store, &fetcher, &uploader, settings(Duration::ZERO))
            .run()
            .await
            .unwrap();
        assert_eq!(third.outcome, RunOutcome::Exhausted);
        assert_eq!(third.batches, 0);

        assert_eq!(store.history(KEY), vec!["p2", "p3", EXHAUSTED_SENTINEL]);
        assert_ne!(first.run_id, second.run_id);
    }

    #[tokio::test]
    async fn test_upload_failure_leaves_cursor_unchanged() {
        let store = Arc::new(MemoryCheckpointStore::with_value(KEY, "p1"));
        let fetcher = Arc::new(ScriptedFetcher::default().page(
            Some("p1"),
            vec![indicator("i-1", "Url", "https://a.example")],
            false,
            None,
        ));
        let uploader = Arc::new(RecordingUploader::failing(500, "backend unavailable"));

        let err = pipeline(&store, &fetcher, &uploader, settings(DEFAULT_DEADLINE))
            .run()
            .await
            .unwrap_err();

        assert_eq!(err.remote_response(), Some((500, "backend unavailable")));
        assert!(store.history(KEY).is_empty());
        assert_eq!(store.get(KEY).await.unwrap(), "p1");
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_cursor_unchanged() {
        let store = Arc::new(MemoryCheckpointStore::with_value(KEY, "p1"));
        let fetcher = Arc::new(ScriptedFetcher {
            failure: Some(503),
            ..ScriptedFetcher::default()
        });
        let uploader = Arc::new(RecordingUploader::default());

        let err = pipeline(&store, &fetcher, &uploader, settings(DEFAULT_DEADLINE))
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::FetchFailed { status: 503, .. }));
        assert!(store.history(KEY).is_empty());
        assert!(uploader.uploaded_ids().is_empty());
    }

    #[tokio::test]
    async fn test_checkpoint_outage_aborts_before_fetch() {
        let store = Arc::new(MemoryCheckpointStore::new());
        store.set_outage(Some("permission denied"));
        let fetcher = Arc::new(ScriptedFetcher::default());
        let uploader = Arc::new(RecordingUploader::default());

        let err = pipeline(&store, &fetcher, &uploader, settings(DEFAULT_DEADLINE))
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::CheckpointUnavailable(_)));
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_and_malformed_are_skipped_by_default() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let fetcher = Arc::new(ScriptedFetcher::default().page(
            None,
            vec![
                indicator("i-1", "Mutex", "Global\\evil"),
                indicator("i-2", "IPv4-Addr", "no address"),
                indicator("i-3", "IPv4-Addr", "seen at 10.0.0.5"),
            ],
            false,
            None,
        ));
        let uploader = Arc::new(RecordingUploader::default());

        let report = pipeline(&store, &fetcher, &uploader, settings(DEFAULT_DEADLINE))
            .run()
            .await
            .unwrap();

        assert_eq!(report.objects, 3);
        assert_eq!(report.skipped_unsupported, 1);
        assert_eq!(report.malformed, 1);
        assert_eq!(uploader.uploaded_ids(), vec![vec!["i-3"]]);
    }

    #[tokio::test]
    async fn test_malformed_abort_uploads_nothing_from_the_page() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let fetcher = Arc::new(ScriptedFetcher::default().page(
            None,
            vec![
                indicator("i-1", "Url", "https://a.example"),
                indicator("i-2", "IPv4-Addr", "no address"),
            ],
            false,
            None,
        ));
        let uploader = Arc::new(RecordingUploader::default());
        let settings = PipelineSettings {
            malformed_policy: MalformedPolicy::Abort,
            ..PipelineSettings::default()
        };

        let err = pipeline(&store, &fetcher, &uploader, settings).run().await.unwrap_err();

        assert!(matches!(err, IngestError::MalformedIndicator { ref id, .. } if id == "i-2"));
        assert!(uploader.uploaded_ids().is_empty());
        assert!(store.history(KEY).is_empty());
    }

    #[tokio::test]
    async fn test_more_without_token_is_treated_as_exhausted() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let fetcher = Arc::new(ScriptedFetcher::default().page(None, vec![], true, Some("  ")));
        let uploader = Arc::new(RecordingUploader::default());

        let report = pipeline(&store, &fetcher, &uploader, settings(DEFAULT_DEADLINE))
            .run()
            .await
            .unwrap();

        assert_eq!(report.outcome, RunOutcome::Exhausted);
        assert_eq!(store.history(KEY), vec![EXHAUSTED_SENTINEL]);
    }

    #[tokio::test]
    async fn test_small_batch_limit_splits_page_uploads() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let fetcher = Arc::new(ScriptedFetcher::default().page(
            None,
            vec![
                indicator("i-1", "Url", "https://a.example"),
                indicator("i-2", "Url", "https://b.example"),
                indicator("i-3", "Url", "https://c.example"),
            ],
            false,
            None,
        ));
        let uploader = Arc::new(RecordingUploader::default());
        let settings = PipelineSettings {
            max_batch_bytes: 1,
            ..PipelineSettings::default()
        };

        let report = pipeline(&store, &fetcher, &uploader, settings).run().await.unwrap();

        assert_eq!(report.batches, 3);
        assert_eq!(uploader.uploaded_ids(), vec![vec!["i-1"], vec!["i-2"], vec!["i-3"]]);
    }

    #[tokio::test]
    async fn test_sparse_unsupported_object_does_not_block_the_page() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let sparse = FeedObject::from(json!({
            "id": "i-2",
            "extensions": { VENDOR_EXTENSION_KEY: { "main_observable_type": "Mutex" } }
        }));
        let fetcher = Arc::new(ScriptedFetcher::default().page(
            None,
            vec![indicator("i-1", "Url", "https://a.example"), sparse],
            false,
            None,
        ));
        let uploader = Arc::new(RecordingUploader::default());

        let report = pipeline(&store, &fetcher, &uploader, settings(DEFAULT_DEADLINE))
            .run()
            .await
            .unwrap();

        assert_eq!(report.outcome, RunOutcome::Exhausted);
        assert_eq!(report.skipped_unsupported, 1);
        assert_eq!(report.malformed, 0);
        assert_eq!(uploader.uploaded_ids(), vec![vec!["i-1"]]);
        assert_eq!(store.history(KEY), vec![EXHAUSTED_SENTINEL]);
    }

    #[tokio::test]
    async fn test_supported_object_that_does_not_decode_follows_policy() {
        let mut broken = raw_indicator("i-2", "Domain-Name", "b.example");
        broken.as_object_mut().unwrap().remove("pattern");
        let page = vec![
            indicator("i-1", "Url", "https://a.example"),
            FeedObject::from(broken),
        ];

        let store = Arc::new(MemoryCheckpointStore::new());
        let fetcher = Arc::new(ScriptedFetcher::default().page(None, page.clone(), false, None));
        let uploader = Arc::new(RecordingUploader::default());
        let report = pipeline(&store, &fetcher, &uploader, settings(DEFAULT_DEADLINE))
            .run()
            .await
            .unwrap();
        assert_eq!(report.malformed, 1);
        assert_eq!(uploader.uploaded_ids(), vec![vec!["i-1"]]);

        let store = Arc::new(MemoryCheckpointStore::new());
        let fetcher = Arc::new(ScriptedFetcher::default().page(None, page, false, None));
        let uploader = Arc::new(RecordingUploader::default());
        let settings = PipelineSettings {
            malformed_policy: MalformedPolicy::Abort,
            ..PipelineSettings::default()
        };
        let err = pipeline(&store, &fetcher, &uploader, settings).run().await.unwrap_err();
        assert!(matches!(err, IngestError::InvalidIndicator { ref id, .. } if id == "i-2"));
        assert!(uploader.uploaded_ids().is_empty());
        assert!(store.history(KEY).is_empty());
    }

    #[tokio::test]
    async fn test_batch_limit_reserves_upload_envelope() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let fetcher = Arc::new(ScriptedFetcher::default().page(
            None,
            vec![
                indicator("i-1", "Url", "https://a.example"),
                indicator("i-2", "Url", "https://b.example"),
            ],
            false,
            None,
        ));
        let uploader = Arc::new(RecordingUploader {
            envelope: 10_000,
            ..RecordingUploader::default()
        });
        let settings = PipelineSettings {
            max_batch_bytes: 10_500,
            ..PipelineSettings::default()
        };

        let report = pipeline(&store, &fetcher, &uploader, settings).run().await.unwrap();

        // both events fit in 10_500 bytes but not in what the envelope leaves
        assert_eq!(report.batches, 2);
        assert_eq!(uploader.uploaded_ids(), vec![vec!["i-1"], vec!["i-2"]]);
    }
}
