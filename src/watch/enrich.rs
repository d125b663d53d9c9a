// src/watch/enrich.rs — Follow-up lookups for started and ended sessions
//
// Start side: persist the session, then look up its cut number.
// End side: wait out the grace delay, fetch the summary, then record the
// duration and (when they classify cleanly) the recording URLs.
// Each lookup runs as its own task; a failure stays inside that task.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use crate::infra::errors::LiveTrackError;
use crate::storage::StoreHandle;
use crate::upstream::retry::{run_with_retry, RetryPolicy};
use crate::upstream::{Session, Summary, UpstreamApi};
use crate::watch::cut::resolve_cut_number;
use crate::watch::playback::{classify_recordings, CdnSigns, RecordingLinks};

/// How one enrichment task ended. Returned for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichOutcome {
    CutNumber {
        session_id: String,
        cut_number: i64,
        applied: bool,
    },
    NoCut {
        session_id: String,
    },
    Finalized {
        session_id: String,
        duration_ms: i64,
        recordings: bool,
    },
    SummaryPending {
        session_id: String,
    },
    Abandoned {
        session_id: String,
        reason: String,
    },
}

#[derive(Clone)]
pub struct Enricher {
    upstream: Arc<dyn UpstreamApi>,
    store: StoreHandle,
    retry: RetryPolicy,
    end_grace: Duration,
    signs: Arc<CdnSigns>,
}

impl Enricher {
    pub fn new(
        upstream: Arc<dyn UpstreamApi>,
        store: StoreHandle,
        retry: RetryPolicy,
        end_grace: Duration,
        signs: CdnSigns,
    ) -> Self {
        Self {
            upstream,
            store,
            retry,
            end_grace,
            signs: Arc::new(signs),
        }
    }

    /// Persist a newly seen session, then spawn its cut-number lookup.
    pub async fn dispatch_started(&self, session: &Session, tasks: &mut JoinSet<EnrichOutcome>) {
        match self.store.upsert(session.clone()).await {
            Ok(true) => {}
            Ok(false) => tracing::debug!(session_id = %session.session_id, "Session already stored"),
            Err(e) => tracing::error!(
                session_id = %session.session_id,
                "Failed to store started session: {e:#}"
            ),
        }

        let this = self.clone();
        let owner_id = session.owner_id;
        let session_id = session.session_id.clone();
        tasks.spawn(async move { this.lookup_cut_number(owner_id, &session_id).await });
    }

    /// Spawn the end-of-session summary lookup.
    pub fn dispatch_ended(&self, session: Session, tasks: &mut JoinSet<EnrichOutcome>) {
        let this = self.clone();
        tasks.spawn(async move { this.finalize(session).await });
    }

    pub async fn lookup_cut_number(&self, owner_id: i64, session_id: &str) -> EnrichOutcome {
        let upstream = &self.upstream;
        let result = run_with_retry(&self.retry, "fetch cut info", move || async move {
            let info = upstream.fetch_cut_info(owner_id, session_id).await?;
            resolve_cut_number(info)
        })
        .await;

        let cut_number = match result {
            Ok(0) => {
                tracing::debug!(session_id, owner_id, "No cut for session");
                return EnrichOutcome::NoCut {
                    session_id: session_id.to_string(),
                };
            }
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(session_id, owner_id, "Giving up on cut number: {e}");
                return abandoned(session_id, e);
            }
        };

        match self.store.update_cut_number(session_id, cut_number).await {
            Ok(applied) => {
                tracing::info!(session_id, cut_number, applied, "Cut number recorded");
                EnrichOutcome::CutNumber {
                    session_id: session_id.to_string(),
                    cut_number,
                    applied,
                }
            }
            Err(e) => {
                tracing::error!(session_id, "Failed to store cut number: {e:#}");
                abandoned(session_id, e)
            }
        }
    }

    pub async fn finalize(&self, session: Session) -> EnrichOutcome {
        let session_id = session.session_id.as_str();
        tokio::time::sleep(self.end_grace).await;

        let summary = match self.fetch_summary(session_id).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(
                    session_id,
                    owner = %session.owner_name,
                    owner_id = session.owner_id,
                    "Giving up on session summary: {e}"
                );
                return abandoned(session_id, e);
            }
        };

        if summary.duration_ms == 0 {
            tracing::info!(
                session_id,
                owner = %session.owner_name,
                owner_id = session.owner_id,
                "Summary reports zero duration, leaving session open"
            );
            return EnrichOutcome::SummaryPending {
                session_id: session_id.to_string(),
            };
        }

        // The start-side write may not have happened (or may have failed)
        if let Err(e) = self.store.upsert(session.clone()).await {
            tracing::error!(session_id, "Failed to store ended session: {e:#}");
            return abandoned(session_id, e);
        }
        match self
            .store
            .update_duration(session_id, summary.duration_ms)
            .await
        {
            Ok(applied) => tracing::info!(
                session_id,
                duration_ms = summary.duration_ms,
                applied,
                "Session finalized"
            ),
            Err(e) => {
                tracing::error!(session_id, "Failed to store duration: {e:#}");
                return abandoned(session_id, e);
            }
        }

        let recordings = match self.recording_links(session_id, &summary) {
            Some(links) => self.store_recordings(session_id, &links).await,
            None => false,
        };

        EnrichOutcome::Finalized {
            session_id: session_id.to_string(),
            duration_ms: summary.duration_ms,
            recordings,
        }
    }

    pub async fn fetch_summary(
        &self,
        session_id: &str,
    ) -> Result<Summary, LiveTrackError> {
        let upstream = &self.upstream;
        run_with_retry(&self.retry, "fetch session summary", move || async move {
            upstream.fetch_summary(session_id).await
        })
        .await
    }

    /// Classify the summary's recording URLs. `None` unless there is exactly
    /// one per CDN; an empty list counts as ambiguous too.
    pub fn recording_links(&self, session_id: &str, summary: &Summary) -> Option<RecordingLinks> {
        match classify_recordings(&summary.recording_urls, &self.signs) {
            Ok(links) => Some(links),
            Err(e) => {
                tracing::warn!(session_id, urls = ?summary.recording_urls, "{e}");
                None
            }
        }
    }

    async fn store_recordings(&self, session_id: &str, links: &RecordingLinks) -> bool {
        match self
            .store
            .update_playback(session_id, &links.url, &links.backup_url)
            .await
        {
            Ok(applied) => applied,
            Err(e) => {
                tracing::error!(session_id, "Failed to store recording URLs: {e:#}");
                false
            }
        }
    }
}

fn abandoned(session_id: &str, reason: impl std::fmt::Display) -> EnrichOutcome {
    EnrichOutcome::Abandoned {
        session_id: session_id.to_string(),
        reason: reason.to_string(),
    }
}
